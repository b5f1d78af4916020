use rand_distr::{Gamma, Geometric};
use statrs::distribution::{ContinuousCDF, Gamma as GammaCdf};

use crate::error::Error;
use crate::parameters::Params;
use crate::rng::ModelRng;

/// Number of precomputed samples held per waiting-time distribution.
pub const N_DRAW_LIST: usize = 200;

/// Length of the per-state infectiousness profile in days. Transmission looks
/// back at most this many days into a state's daily buckets.
pub const MAX_INFECTIOUS_PERIOD: usize = 20;

/// Precomputed integer waiting-time samples, consumed cyclically.
///
/// Drawing a waiting time is a hot operation during an epidemic peak; paying
/// the distribution sampling cost once up front and cycling through the table
/// afterwards is how the engine keeps transitions cheap.
pub struct DrawList {
    values: Vec<u32>,
    cursor: usize,
}

impl DrawList {
    pub fn sample(&mut self) -> u32 {
        let value = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        value
    }

    #[must_use]
    pub fn max_value(&self) -> u32 {
        self.values.iter().copied().max().unwrap_or(0)
    }
}

/// Gamma(mean, sd) rounded to a positive whole number of days.
pub fn gamma_draw_list(
    rng: &mut ModelRng,
    n: usize,
    mean: f64,
    sd: f64,
) -> Result<DrawList, Error> {
    let scale = sd * sd / mean;
    let shape = mean / scale;
    let distr = Gamma::new(shape, scale).map_err(|e| {
        Error::config(format!(
            "invalid gamma parameters (mean {mean}, sd {sd}): {e}"
        ))
    })?;
    let values = (0..n)
        .map(|_| (rng.sample_distr(&distr).round() as u32).max(1))
        .collect();
    Ok(DrawList { values, cursor: 0 })
}

/// Waiting times for a fractional mean m: floor(m) days, plus one more with
/// probability frac(m), so the list's mean converges to m.
pub fn bernoulli_draw_list(rng: &mut ModelRng, n: usize, mean: f64) -> Result<DrawList, Error> {
    if mean < 1.0 {
        return Err(Error::config(format!(
            "a split waiting time needs a mean of at least 1, got {mean}"
        )));
    }
    let whole = mean.floor() as u32;
    let frac = mean - mean.floor();
    let values = (0..n)
        .map(|_| whole + u32::from(rng.bernoulli(frac)))
        .collect();
    Ok(DrawList { values, cursor: 0 })
}

/// Days spent in quarantine under a daily dropout probability, truncated at
/// the configured maximum stay. A dropout of zero always yields the maximum.
pub fn geometric_max_draw_list(
    rng: &mut ModelRng,
    n: usize,
    dropout: f64,
    max_stay: u32,
) -> Result<DrawList, Error> {
    let values = if dropout <= 0.0 {
        vec![max_stay; n]
    } else {
        let distr = Geometric::new(dropout)
            .map_err(|e| Error::config(format!("invalid dropout probability {dropout}: {e}")))?;
        (0..n)
            .map(|_| {
                let draw = rng.sample_distr_u64(&distr) + 1;
                draw.min(u64::from(max_stay)) as u32
            })
            .collect()
    };
    Ok(DrawList { values, cursor: 0 })
}

/// Discretised gamma profile of per-contact transmission, one value per day
/// offset since entering the state, normalised so the whole curve sums to
/// `factor`.
pub fn gamma_rate_curve(n: usize, mean: f64, sd: f64, factor: f64) -> Result<Vec<f64>, Error> {
    let scale = sd * sd / mean;
    let shape = mean / scale;
    let cdf = GammaCdf::new(shape, 1.0 / scale).map_err(|e| {
        Error::config(format!(
            "invalid gamma parameters (mean {mean}, sd {sd}): {e}"
        ))
    })?;
    let mut curve = Vec::with_capacity(n);
    let mut total = 0.0;
    for idx in 0..n {
        let increment = cdf.cdf((idx + 1) as f64) - total;
        total += increment;
        curve.push(increment);
    }
    for value in &mut curve {
        *value *= factor / total;
    }
    Ok(curve)
}

/// The full set of waiting-time tables one model cycles through.
pub struct DrawLists {
    pub symptomatic_time: DrawList,
    pub asymptomatic_time: DrawList,
    pub recovered_time: DrawList,
    pub death_time: DrawList,
    pub hospitalised_time: DrawList,
    pub self_quarantine: DrawList,
    pub traced_quarantine: DrawList,
    pub positive_quarantine: DrawList,
}

impl DrawLists {
    pub fn from_params(rng: &mut ModelRng, params: &Params) -> Result<Self, Error> {
        Ok(Self {
            symptomatic_time: gamma_draw_list(
                rng,
                N_DRAW_LIST,
                params.mean_time_to_symptoms,
                params.sd_time_to_symptoms,
            )?,
            asymptomatic_time: gamma_draw_list(
                rng,
                N_DRAW_LIST,
                params.mean_asymptomatic_to_recovery,
                params.sd_asymptomatic_to_recovery,
            )?,
            recovered_time: gamma_draw_list(
                rng,
                N_DRAW_LIST,
                params.mean_time_to_recover,
                params.sd_time_to_recover,
            )?,
            death_time: gamma_draw_list(
                rng,
                N_DRAW_LIST,
                params.mean_time_to_death,
                params.sd_time_to_death,
            )?,
            hospitalised_time: bernoulli_draw_list(rng, N_DRAW_LIST, params.mean_time_to_hospital)?,
            self_quarantine: geometric_max_draw_list(
                rng,
                N_DRAW_LIST,
                params.quarantine_dropout_self,
                params.quarantine_length_self,
            )?,
            traced_quarantine: geometric_max_draw_list(
                rng,
                N_DRAW_LIST,
                params.quarantine_dropout_traced,
                params.quarantine_length_traced,
            )?,
            positive_quarantine: geometric_max_draw_list(
                rng,
                N_DRAW_LIST,
                params.quarantine_dropout_positive,
                params.quarantine_length_positive,
            )?,
        })
    }
}
