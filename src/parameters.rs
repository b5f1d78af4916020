use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Immutable parameter snapshot taken at model construction.
///
/// Loaded from a JSON file by the binary; tests construct it inline with
/// `..Params::default()`. The policy switches (`app_turned_on`, `lockdown_on`,
/// `test_on_symptoms`) give the runtime policy its initial state and may be
/// flipped later by the scheduled on/off days.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {
    pub n_total: usize,
    pub n_seed_infection: usize,
    pub end_time: u32,
    pub seed: u64,

    pub mean_daily_interactions: u32,
    pub days_of_interactions: usize,
    pub mean_household_size: usize,

    pub infectious_rate: f64,
    pub mean_infectious_period: f64,
    pub sd_infectious_period: f64,
    pub asymptomatic_infectious_factor: f64,
    pub fraction_asymptomatic: f64,

    pub mean_time_to_symptoms: f64,
    pub sd_time_to_symptoms: f64,
    pub mean_time_to_hospital: f64,
    pub mean_time_to_recover: f64,
    pub sd_time_to_recover: f64,
    pub mean_time_to_death: f64,
    pub sd_time_to_death: f64,
    pub mean_asymptomatic_to_recovery: f64,
    pub sd_asymptomatic_to_recovery: f64,
    pub cfr: f64,

    pub quarantine_days: usize,
    pub quarantine_dropout_self: f64,
    pub quarantine_length_self: u32,
    pub quarantine_dropout_traced: f64,
    pub quarantine_length_traced: u32,
    pub quarantine_dropout_positive: f64,
    pub quarantine_length_positive: u32,

    pub test_insensitive_period: u32,
    pub test_order_wait: u32,
    pub test_result_wait: u32,

    pub self_quarantine_fraction: f64,
    pub quarantine_fraction: f64,
    pub traceable_interaction_fraction: f64,
    pub tracing_network_depth: u32,
    pub app_users_fraction: f64,

    pub app_turned_on: bool,
    pub lockdown_on: bool,
    pub lockdown_interaction_multiplier: f64,
    pub quarantine_on_traced: bool,
    pub test_on_traced: bool,
    pub trace_on_symptoms: bool,
    pub trace_on_positive: bool,
    pub quarantine_household_on_symptoms: bool,
    pub quarantine_household_on_positive: bool,
    pub quarantine_household_on_traced: bool,
    pub quarantine_household_contacts_on_positive: bool,
    pub test_on_symptoms: bool,
    pub allow_clinical_diagnosis: bool,

    pub app_turn_on_time: Option<u32>,
    pub lockdown_time_on: Option<u32>,
    pub lockdown_time_off: Option<u32>,
    pub testing_symptoms_time_on: Option<u32>,
    pub testing_symptoms_time_off: Option<u32>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            n_total: 10_000,
            n_seed_infection: 10,
            end_time: 100,
            seed: 1,
            mean_daily_interactions: 10,
            days_of_interactions: 10,
            mean_household_size: 3,
            infectious_rate: 3.0,
            mean_infectious_period: 5.5,
            sd_infectious_period: 2.1,
            asymptomatic_infectious_factor: 0.25,
            fraction_asymptomatic: 0.3,
            mean_time_to_symptoms: 5.4,
            sd_time_to_symptoms: 2.7,
            mean_time_to_hospital: 1.4,
            mean_time_to_recover: 12.0,
            sd_time_to_recover: 5.0,
            mean_time_to_death: 11.7,
            sd_time_to_death: 4.3,
            mean_asymptomatic_to_recovery: 15.0,
            sd_asymptomatic_to_recovery: 5.0,
            cfr: 0.1,
            quarantine_days: 7,
            quarantine_dropout_self: 0.02,
            quarantine_length_self: 7,
            quarantine_dropout_traced: 0.04,
            quarantine_length_traced: 14,
            quarantine_dropout_positive: 0.01,
            quarantine_length_positive: 14,
            test_insensitive_period: 3,
            test_order_wait: 1,
            test_result_wait: 1,
            self_quarantine_fraction: 0.8,
            quarantine_fraction: 0.9,
            traceable_interaction_fraction: 0.8,
            tracing_network_depth: 2,
            app_users_fraction: 0.6,
            app_turned_on: false,
            lockdown_on: false,
            lockdown_interaction_multiplier: 0.3,
            quarantine_on_traced: false,
            test_on_traced: false,
            trace_on_symptoms: false,
            trace_on_positive: false,
            quarantine_household_on_symptoms: false,
            quarantine_household_on_positive: false,
            quarantine_household_on_traced: false,
            quarantine_household_contacts_on_positive: false,
            test_on_symptoms: false,
            allow_clinical_diagnosis: true,
            app_turn_on_time: None,
            lockdown_time_on: None,
            lockdown_time_off: None,
            testing_symptoms_time_on: None,
            testing_symptoms_time_off: None,
        }
    }
}

/// Check parameters before any pool is sized from them. This catches, say, a
/// negative standard deviation at load time instead of as a panic deep inside
/// distribution setup once the population has already been built.
pub fn validate(params: &Params) -> Result<(), Error> {
    if params.n_total == 0 {
        return Err(Error::config("n_total must be positive"));
    }
    if params.end_time == 0 {
        return Err(Error::config("end_time must be positive"));
    }
    if params.n_seed_infection > params.n_total {
        return Err(Error::config(
            "n_seed_infection cannot exceed the population size",
        ));
    }
    if params.days_of_interactions == 0 {
        return Err(Error::config("days_of_interactions must be positive"));
    }
    if params.quarantine_days > params.days_of_interactions {
        return Err(Error::config(
            "quarantine_days cannot exceed days_of_interactions: contacts older than the interaction window are gone",
        ));
    }
    if params.mean_household_size == 0 {
        return Err(Error::config("mean_household_size must be positive"));
    }
    for (name, mean, sd) in [
        (
            "infectious_period",
            params.mean_infectious_period,
            params.sd_infectious_period,
        ),
        (
            "time_to_symptoms",
            params.mean_time_to_symptoms,
            params.sd_time_to_symptoms,
        ),
        (
            "time_to_recover",
            params.mean_time_to_recover,
            params.sd_time_to_recover,
        ),
        (
            "time_to_death",
            params.mean_time_to_death,
            params.sd_time_to_death,
        ),
        (
            "asymptomatic_to_recovery",
            params.mean_asymptomatic_to_recovery,
            params.sd_asymptomatic_to_recovery,
        ),
    ] {
        if mean <= 0.0 {
            return Err(Error::config(format!("mean_{name} must be positive")));
        }
        if sd <= 0.0 {
            return Err(Error::config(format!("sd_{name} must be positive")));
        }
    }
    if params.mean_time_to_hospital < 1.0 {
        return Err(Error::config("mean_time_to_hospital must be at least 1"));
    }
    for (name, p) in [
        ("fraction_asymptomatic", params.fraction_asymptomatic),
        ("cfr", params.cfr),
        ("quarantine_dropout_self", params.quarantine_dropout_self),
        ("quarantine_dropout_traced", params.quarantine_dropout_traced),
        (
            "quarantine_dropout_positive",
            params.quarantine_dropout_positive,
        ),
        ("self_quarantine_fraction", params.self_quarantine_fraction),
        ("quarantine_fraction", params.quarantine_fraction),
        (
            "traceable_interaction_fraction",
            params.traceable_interaction_fraction,
        ),
        ("app_users_fraction", params.app_users_fraction),
        (
            "lockdown_interaction_multiplier",
            params.lockdown_interaction_multiplier,
        ),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::config(format!("{name} must lie in [0, 1]")));
        }
    }
    for (name, len) in [
        ("quarantine_length_self", params.quarantine_length_self),
        ("quarantine_length_traced", params.quarantine_length_traced),
        (
            "quarantine_length_positive",
            params.quarantine_length_positive,
        ),
    ] {
        if len == 0 {
            return Err(Error::config(format!("{name} must be positive")));
        }
    }
    if params.infectious_rate < 0.0 {
        return Err(Error::config("infectious_rate must be non-negative"));
    }
    if params.asymptomatic_infectious_factor < 0.0 {
        return Err(Error::config(
            "asymptomatic_infectious_factor must be non-negative",
        ));
    }
    Ok(())
}
