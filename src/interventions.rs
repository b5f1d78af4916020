use log::{debug, trace};

use crate::disease::drain_today;
use crate::events::EventKind;
use crate::individual::{DiseaseStatus, PersonId, TestSlot};
use crate::model::Model;
use crate::network::Traceable;
use crate::parameters::Params;
use crate::trace_tokens::TokenId;

/// Runtime policy switches, seeded from the parameters and flipped by the
/// scheduled on/off days.
pub struct PolicyState {
    pub app_turned_on: bool,
    pub lockdown_on: bool,
    pub test_on_symptoms: bool,
}

impl PolicyState {
    #[must_use]
    pub fn from_params(params: &Params) -> Self {
        Self {
            app_turned_on: params.app_turned_on,
            lockdown_on: params.lockdown_on,
            test_on_symptoms: params.test_on_symptoms,
        }
    }
}

/// Apply the configured policy schedule for the current day. Runs at the top
/// of every tick so a switch takes effect before any of the day's decisions.
pub fn update_intervention_policy(model: &mut Model) {
    let t = model.time;
    if model.params.app_turn_on_time == Some(t) {
        model.policy.app_turned_on = true;
        debug!("day {t}: contact tracing app turned on");
    }
    if model.params.lockdown_time_on == Some(t) {
        model.policy.lockdown_on = true;
        debug!("day {t}: lockdown on");
    }
    if model.params.lockdown_time_off == Some(t) {
        model.policy.lockdown_on = false;
        debug!("day {t}: lockdown off");
    }
    if model.params.testing_symptoms_time_on == Some(t) {
        model.policy.test_on_symptoms = true;
        debug!("day {t}: community testing on symptoms on");
    }
    if model.params.testing_symptoms_time_off == Some(t) {
        model.policy.test_on_symptoms = false;
        debug!("day {t}: community testing on symptoms off");
    }
}

/// Hold `person` in quarantine until `t_release`. Starting a fresh
/// quarantine enqueues the entry event dated today; an existing release is
/// kept when `maxof` and it is already later, otherwise replaced.
pub fn quarantine_until(model: &mut Model, person: PersonId, t_release: u32, maxof: bool) {
    let t = model.time;
    if t_release == t {
        return;
    }

    if model.population[person].quarantine_event.is_none() {
        let event = model.lists[EventKind::Quarantined as usize].add(&mut model.events, person, t);
        model.population[person].quarantine_event = Some(event);
        model.population[person].quarantined = true;
        model.population[person].time_quarantined = Some(t);
        trace!("person {person} enters quarantine on day {t}");
    }

    if let Some(release) = model.population[person].quarantine_release_event {
        let scheduled = model.events.day(release);
        if maxof && scheduled > t_release {
            return;
        }
        model.lists[EventKind::QuarantineRelease as usize].remove(
            &mut model.events,
            release,
            scheduled,
        );
        model.population[person].quarantine_release_event = None;
    }

    let release =
        model.lists[EventKind::QuarantineRelease as usize].add(&mut model.events, person, t_release);
    model.population[person].quarantine_release_event = Some(release);
}

/// Cancel any pending release and quarantine entry and clear the flag.
pub fn quarantine_release(model: &mut Model, person: PersonId) {
    if let Some(release) = model.population[person].quarantine_release_event.take() {
        let scheduled = model.events.day(release);
        model.lists[EventKind::QuarantineRelease as usize].remove(
            &mut model.events,
            release,
            scheduled,
        );
    }
    if let Some(entry) = model.population[person].quarantine_event.take() {
        let entered = model.events.day(entry);
        model.lists[EventKind::Quarantined as usize].remove(&mut model.events, entry, entered);
        model.population[person].quarantined = false;
        trace!("person {person} released from quarantine on day {}", model.time);
    }
}

/// Order a test to be taken on `time`. People with a test already in flight,
/// or who are confirmed cases, are not tested again.
pub fn test_order(model: &mut Model, person: PersonId, time: u32) {
    if model.population[person].test_slot == TestSlot::NoTest && !model.population[person].is_case {
        model.lists[EventKind::TestTake as usize].add(&mut model.events, person, time);
        model.population[person].test_slot = TestSlot::Ordered;
    }
}

/// Drain today's test takes. A test reads positive only once the infection
/// is older than the test's insensitive period.
pub fn quarantined_test_take(model: &mut Model) {
    let result_wait = model.params.test_result_wait;
    let insensitive = model.params.test_insensitive_period;
    drain_today!(model, EventKind::TestTake, |person, event| {
        let t = model.time;
        let result = match model.population[person].status {
            DiseaseStatus::Uninfected | DiseaseStatus::Recovered => TestSlot::Negative,
            _ => {
                let infected_day = model.population[person]
                    .time_infected
                    .expect("infected status without an infection day");
                if t - infected_day >= insensitive {
                    TestSlot::Positive
                } else {
                    TestSlot::Negative
                }
            }
        };
        model.population[person].test_slot = result;
        model.lists[EventKind::TestResult as usize].add(&mut model.events, person, t + result_wait);
        model.lists[EventKind::TestTake as usize].remove(&mut model.events, event, t);
    });
}

/// Drain today's test results. Negatives leave quarantine; positives become
/// cases and fire the positive cascade unless a hospital clinical diagnosis
/// already did.
pub fn quarantined_test_result(model: &mut Model) {
    drain_today!(model, EventKind::TestResult, |person, event| {
        let t = model.time;
        match model.population[person].test_slot {
            TestSlot::Negative => {
                if model.population[person].quarantined {
                    quarantine_release(model, person);
                }
            }
            TestSlot::Positive => {
                if !model.population[person].is_case {
                    model.population[person].is_case = true;
                    model.n_cases += 1;
                    trace!("person {person} confirmed as a case on day {t}");
                }
                if !model.population[person].is_in_hospital()
                    || !model.params.allow_clinical_diagnosis
                {
                    on_positive_result(model, person);
                }
            }
            TestSlot::NoTest | TestSlot::Ordered => {}
        }
        model.population[person].test_slot = TestSlot::NoTest;
        model.lists[EventKind::TestResult as usize].remove(&mut model.events, event, t);
    });
}

/// Drain today's releases for everyone still held.
pub fn release_from_quarantine(model: &mut Model) {
    drain_today!(model, EventKind::QuarantineRelease, |person, _event| {
        if model.population[person].quarantined {
            quarantine_release(model, person);
        }
    });
}

/// Interventions on symptom onset: self-quarantine by compliance draw (or
/// automatically when already held), then optionally quarantine the
/// household, order a community test, and trace contacts.
pub fn on_symptoms(model: &mut Model, person: PersonId) {
    let token = index_trace_token(model, person);
    let compliance = model.params.self_quarantine_fraction;
    let quarantine = model.population[person].quarantined || model.rng.bernoulli(compliance);

    if quarantine {
        let t_release = model.time + model.draws.self_quarantine.sample();
        quarantine_until(model, person, t_release, true);

        if model.params.quarantine_household_on_symptoms {
            quarantine_household(model, person, Some(t_release), false, token);
        }
        if model.policy.test_on_symptoms {
            let order_day = model.time + model.params.test_order_wait;
            test_order(model, person, order_day);
        }
        if model.params.trace_on_symptoms
            && (model.params.quarantine_on_traced || model.params.test_on_traced)
        {
            notify_contacts(model, person, 1, token);
        }
    }
    finish_cascade(model, token);
}

/// Interventions on hospital admission: an immediate test order, and the
/// positive cascade straight away when clinical diagnosis stands in for the
/// result.
pub fn on_hospitalised(model: &mut Model, person: PersonId) {
    test_order(model, person, model.time);
    if model.params.allow_clinical_diagnosis {
        on_positive_result(model, person);
    }
}

/// Interventions on a confirmed positive: quarantine outside hospital,
/// optional household quarantine, optional tracing.
pub fn on_positive_result(model: &mut Model, person: PersonId) {
    let token = index_trace_token(model, person);
    let mut t_release = None;

    if !model.population[person].is_in_hospital() {
        let release = model.time + model.draws.positive_quarantine.sample();
        quarantine_until(model, person, release, true);
        t_release = Some(release);
    }
    if model.params.quarantine_household_on_positive {
        let contact_trace = model.params.quarantine_household_contacts_on_positive;
        quarantine_household(model, person, t_release, contact_trace, token);
    }
    if model.params.trace_on_positive
        && (model.params.quarantine_on_traced || model.params.test_on_traced)
    {
        notify_contacts(model, person, 1, token);
    }
    finish_cascade(model, token);
}

/// Quarantine everyone sharing the index's household until `time` (or a
/// fresh traced-quarantine draw when the index has no release of their own).
/// With `contact_trace`, members' own contacts are notified without further
/// recursion.
fn quarantine_household(
    model: &mut Model,
    person: PersonId,
    time: Option<u32>,
    contact_trace: bool,
    token: TokenId,
) {
    let house = model.population[person].house_no;
    let t_release = match time {
        Some(t) => t,
        None => model.time + model.draws.traced_quarantine.sample(),
    };
    let members = model.households.members(house).to_vec();
    for member in members {
        if member == person {
            continue;
        }
        quarantine_until(model, member, t_release, true);
        if contact_trace && (model.params.quarantine_on_traced || model.params.test_on_traced) {
            let terminal_depth = model.params.tracing_network_depth;
            notify_contacts(model, member, terminal_depth, token);
        }
    }
}

/// Notify the app-recorded contacts of `person` across the quarantine
/// window, oldest day first, so a contact met on several days is handled
/// from the earliest meeting. The traceable decision is drawn once per edge
/// and memoised on it.
fn notify_contacts(model: &mut Model, person: PersonId, depth: u32, token: TokenId) {
    if !model.population[person].app_user || !model.policy.app_turned_on {
        return;
    }
    let window = model.params.quarantine_days;
    let n_days = model.params.days_of_interactions;

    let mut day = model.interaction_day_idx;
    for _ in 0..window.saturating_sub(1) {
        day = if day == 0 { n_days - 1 } else { day - 1 };
    }

    for back in (0..window).rev() {
        let n_contacts = model.population[person].n_interactions[day];
        let mut cursor = model.population[person].interactions[day];
        for _ in 0..n_contacts {
            let Some(id) = cursor else { break };
            let contact = model.interactions.get(id).other;
            cursor = model.interactions.get(id).next;

            if model.population[contact].app_user {
                let traceable = match model.interactions.get(id).traceable {
                    Traceable::Unknown => {
                        let p = model.params.traceable_interaction_fraction;
                        let drawn = if model.rng.bernoulli(p) {
                            Traceable::Yes
                        } else {
                            Traceable::No
                        };
                        model.interactions.get_mut(id).traceable = drawn;
                        drawn
                    }
                    known => known,
                };
                if traceable == Traceable::Yes {
                    let contact_time = model.time.saturating_sub(back as u32);
                    on_traced(model, contact, contact_time, depth, token);
                }
            }
        }
        day = (day + 1) % n_days;
    }
}

/// Handle one traced contact: quarantine them, optionally extend to their
/// household, order a test timed so the infection would be detectable, and
/// recurse while the cascade is within its depth bound.
fn on_traced(model: &mut Model, person: PersonId, contact_time: u32, depth: u32, token: TokenId) {
    if model.population[person].is_in_hospital()
        || model.population[person].is_case
        || model.population[person].traced_on_this_trace
    {
        return;
    }
    model.population[person].traced_on_this_trace = true;
    model.tokens.add_child(token, person);

    if model.params.quarantine_on_traced {
        let t_release = model.time + model.draws.traced_quarantine.sample();
        quarantine_until(model, person, t_release, true);
        if model.params.quarantine_household_on_traced {
            quarantine_household(model, person, Some(t_release), false, token);
        }
    }
    if model.params.test_on_traced {
        let order_day = (model.time + model.params.test_order_wait)
            .max(contact_time + model.params.test_insensitive_period);
        test_order(model, person, order_day);
    }
    if depth < model.params.tracing_network_depth {
        notify_contacts(model, person, depth + 1, token);
    }
}

/// Root token for a cascade starting at `person`, reusing the one from any
/// earlier cascade of theirs. The index is marked traced so the cascade
/// cannot circle back onto them.
fn index_trace_token(model: &mut Model, person: PersonId) -> TokenId {
    let token = match model.population[person].index_trace_token {
        Some(token) => token,
        None => {
            let token = model.tokens.acquire(person);
            model.population[person].index_trace_token = Some(token);
            token
        }
    };
    model.population[person].traced_on_this_trace = true;
    token
}

/// Unwind a finished cascade: clear the traced flag of everyone it reached
/// and recycle their tokens. The index keeps its token for the next cascade.
fn finish_cascade(model: &mut Model, token: TokenId) {
    let mut touched = std::mem::take(&mut model.scratch_traced);
    touched.clear();
    model.tokens.reclaim_children(token, &mut touched);
    for person in touched.drain(..) {
        model.population[person].traced_on_this_trace = false;
    }
    let index_owner = model.tokens.owner(token);
    model.population[index_owner].traced_on_this_trace = false;
    model.scratch_traced = touched;
}

#[cfg(test)]
mod tests {
    use super::{quarantine_release, quarantine_until, test_order};
    use crate::events::EventKind;
    use crate::individual::TestSlot;
    use crate::model::Model;
    use crate::parameters::Params;

    fn isolated_params() -> Params {
        Params {
            n_total: 10,
            n_seed_infection: 0,
            mean_daily_interactions: 0,
            fraction_asymptomatic: 0.0,
            end_time: 60,
            ..Params::default()
        }
    }

    fn release_day(model: &Model, person: usize) -> u32 {
        let release = model.individuals()[person]
            .quarantine_release_event
            .expect("no release scheduled");
        model.events.day(release)
    }

    #[test]
    fn test_quarantine_until_sets_up_both_events() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.time = 1;
        quarantine_until(&mut model, 0, 8, true);
        let indiv = &model.individuals()[0];
        assert!(indiv.quarantined);
        assert_eq!(indiv.time_quarantined, Some(1));
        assert!(indiv.quarantine_event.is_some());
        assert_eq!(release_day(&model, 0), 8);
        assert_eq!(model.lists[EventKind::Quarantined as usize].n_live(), 1);
        assert_eq!(
            model.lists[EventKind::QuarantineRelease as usize].n_live(),
            1
        );
    }

    #[test]
    fn test_quarantine_until_today_is_a_no_op() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.time = 3;
        quarantine_until(&mut model, 0, 3, true);
        assert!(!model.individuals()[0].quarantined);
    }

    #[test]
    fn test_maxof_is_idempotent() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.time = 1;
        quarantine_until(&mut model, 0, 9, true);
        let events_live = model.events.n_free();
        quarantine_until(&mut model, 0, 9, true);
        assert_eq!(release_day(&model, 0), 9);
        assert_eq!(model.events.n_free(), events_live);
    }

    #[test]
    fn test_maxof_never_moves_release_earlier() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.time = 1;
        quarantine_until(&mut model, 0, 9, true);
        quarantine_until(&mut model, 0, 5, true);
        assert_eq!(release_day(&model, 0), 9);
        quarantine_until(&mut model, 0, 12, true);
        assert_eq!(release_day(&model, 0), 12);
    }

    #[test]
    fn test_without_maxof_release_is_replaced() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.time = 1;
        quarantine_until(&mut model, 0, 9, true);
        quarantine_until(&mut model, 0, 5, false);
        assert_eq!(release_day(&model, 0), 5);
    }

    #[test]
    fn test_release_clears_everything() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.time = 1;
        quarantine_until(&mut model, 0, 9, true);
        quarantine_release(&mut model, 0);
        let indiv = &model.individuals()[0];
        assert!(!indiv.quarantined);
        assert!(indiv.quarantine_event.is_none());
        assert!(indiv.quarantine_release_event.is_none());
        assert_eq!(model.events.n_free(), model.events.capacity());
    }

    #[test]
    fn test_scheduled_release_frees_at_its_day() {
        let mut model = Model::new(Params {
            self_quarantine_fraction: 0.0,
            ..isolated_params()
        })
        .unwrap();
        model.one_time_step();
        let until = model.time + 3;
        quarantine_until(&mut model, 2, until, true);
        let release = release_day(&model, 2);
        while model.time < release {
            model.one_time_step();
            let held = model.individuals()[2].quarantined;
            assert_eq!(held, model.time < release);
        }
    }

    #[test]
    fn test_test_order_is_single_shot() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.time = 1;
        test_order(&mut model, 0, 2);
        assert_eq!(model.individuals()[0].test_slot, TestSlot::Ordered);
        let live = model.lists[EventKind::TestTake as usize].n_live();
        test_order(&mut model, 0, 4);
        assert_eq!(model.lists[EventKind::TestTake as usize].n_live(), live);
    }

    #[test]
    fn test_cases_are_not_retested() {
        let mut model = Model::new(isolated_params()).unwrap();
        model.population[0].is_case = true;
        test_order(&mut model, 0, 2);
        assert_eq!(model.individuals()[0].test_slot, TestSlot::NoTest);
        assert_eq!(model.lists[EventKind::TestTake as usize].n_live(), 0);
    }

    #[test]
    fn test_policy_schedule_flips_switches() {
        let mut model = Model::new(Params {
            app_users_fraction: 1.0,
            app_turn_on_time: Some(2),
            lockdown_time_on: Some(3),
            lockdown_time_off: Some(5),
            testing_symptoms_time_on: Some(4),
            ..isolated_params()
        })
        .unwrap();
        assert!(!model.policy.app_turned_on);
        model.one_time_step();
        assert!(!model.policy.app_turned_on);
        model.one_time_step();
        assert!(model.policy.app_turned_on);
        model.one_time_step();
        assert!(model.policy.lockdown_on);
        model.one_time_step();
        assert!(model.policy.test_on_symptoms);
        model.one_time_step();
        assert!(!model.policy.lockdown_on);
        assert!(model.policy.app_turned_on);
    }

    #[test]
    fn test_household_quarantined_on_symptom_onset() {
        // One five-person household; the seed's symptom onset must pull every
        // housemate into quarantine with the same release day.
        let mut model = Model::new(Params {
            n_total: 5,
            n_seed_infection: 1,
            mean_household_size: 5,
            self_quarantine_fraction: 1.0,
            quarantine_household_on_symptoms: true,
            mean_daily_interactions: 0,
            fraction_asymptomatic: 0.0,
            end_time: 60,
            ..Params::default()
        })
        .unwrap();
        let seed = model
            .individuals()
            .iter()
            .position(|i| i.time_infected.is_some())
            .unwrap();
        let t_symptoms = model.individuals()[seed].time_symptomatic.unwrap();
        while model.time < t_symptoms {
            model.one_time_step();
        }
        let seed_release = release_day(&model, seed);
        let max_stay = model.params.quarantine_length_self;
        assert!(seed_release > t_symptoms);
        assert!(seed_release <= t_symptoms + max_stay);
        for person in 0..5 {
            assert!(model.individuals()[person].quarantined, "person {person}");
            assert_eq!(release_day(&model, person), seed_release);
        }
    }

    #[test]
    fn test_positive_result_cascade_timing() {
        // Community testing with a known order and result wait: the case flag
        // must flip exactly when the result lands, not when the test is taken.
        let mut model = Model::new(Params {
            n_total: 10,
            n_seed_infection: 1,
            mean_daily_interactions: 0,
            fraction_asymptomatic: 0.0,
            self_quarantine_fraction: 1.0,
            test_on_symptoms: true,
            test_order_wait: 1,
            test_result_wait: 2,
            test_insensitive_period: 1,
            allow_clinical_diagnosis: false,
            // Keep the hospital admission safely after the result lands so
            // the community pipeline stays in charge of the cascade.
            mean_time_to_hospital: 6.0,
            end_time: 80,
            ..Params::default()
        })
        .unwrap();
        let seed = model
            .individuals()
            .iter()
            .position(|i| i.time_infected.is_some())
            .unwrap();
        let t_symptoms = model.individuals()[seed].time_symptomatic.unwrap();
        let t_result = t_symptoms + 1 + 2;
        while model.time < t_result {
            model.one_time_step();
            if model.time < t_result {
                assert!(!model.individuals()[seed].is_case);
            }
        }
        // The admission draw (mean 6) lands after the result, so the case
        // came from the community pipeline rather than clinical diagnosis.
        assert!(model.individuals()[seed].time_hospitalised.unwrap() > t_result);
        assert!(model.individuals()[seed].is_case);
        assert_eq!(model.n_cases(), 1);
        assert_eq!(model.individuals()[seed].test_slot, TestSlot::NoTest);
        // A positive outside hospital re-quarantines out to the positive draw.
        assert!(model.individuals()[seed].quarantined);
        assert!(release_day(&model, seed) > t_result);
    }

    #[test]
    fn test_tracing_cascade_quarantines_contacts_and_unwinds() {
        let mut model = Model::new(Params {
            n_total: 30,
            n_seed_infection: 1,
            mean_daily_interactions: 6,
            days_of_interactions: 7,
            quarantine_days: 7,
            fraction_asymptomatic: 0.0,
            self_quarantine_fraction: 1.0,
            app_users_fraction: 1.0,
            app_turned_on: true,
            trace_on_symptoms: true,
            quarantine_on_traced: true,
            traceable_interaction_fraction: 1.0,
            tracing_network_depth: 2,
            infectious_rate: 0.0,
            end_time: 60,
            ..Params::default()
        })
        .unwrap();
        let seed = model
            .individuals()
            .iter()
            .position(|i| i.time_infected.is_some())
            .unwrap();
        let t_symptoms = model.individuals()[seed].time_symptomatic.unwrap();
        while model.time < t_symptoms {
            model.one_time_step();
        }
        // The index had contacts on every recent day; with certain tracing
        // and compliance, at least one of them must now be in quarantine.
        let quarantined: Vec<usize> = (0..30)
            .filter(|&p| p != seed && model.individuals()[p].quarantined)
            .collect();
        assert!(!quarantined.is_empty());
        // The cascade unwound: no stale traced flags, and only index tokens
        // remain allocated.
        assert!(model.individuals().iter().all(|i| !i.traced_on_this_trace));
        let index_tokens = model
            .individuals()
            .iter()
            .filter(|i| i.index_trace_token.is_some())
            .count();
        assert_eq!(
            model.tokens.n_free(),
            crate::trace_tokens::TOKENS_PER_PERSON * 30 - index_tokens
        );
    }
}
