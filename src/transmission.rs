use log::trace;

use crate::draw_lists::MAX_INFECTIOUS_PERIOD;
use crate::events::EventKind;
use crate::individual::{DiseaseStatus, PersonId};
use crate::model::Model;

/// One transmission pass over every infectious state.
///
/// Quarantine is not a disease state: quarantined infectors stay in their
/// state's buckets and are suppressed here only because they were given no
/// interactions when today's network was built.
pub fn transmit_virus(model: &mut Model) {
    transmit_virus_by_type(model, EventKind::Presymptomatic);
    transmit_virus_by_type(model, EventKind::Symptomatic);
    transmit_virus_by_type(model, EventKind::Asymptomatic);
    transmit_virus_by_type(model, EventKind::Hospitalised);
}

/// Walk one state's daily buckets over the lookback window. Someone who
/// entered the state on day `d` transmits today at the curve offset
/// `t - 1 - d`; their contacts are today's interaction list.
fn transmit_virus_by_type(model: &mut Model, kind: EventKind) {
    let t = model.time as usize;
    let list_idx = kind as usize;
    let today = model.interaction_day_idx;
    let lookback_start = t.saturating_sub(MAX_INFECTIOUS_PERIOD);

    for day in (lookback_start..t).rev() {
        let hazard_rate = model.lists[list_idx].infectious_curve[t - 1 - day];
        let slot = model.lists[list_idx].slot(day as u32);
        let n_infected = model.lists[list_idx].n_daily_current_at(slot);
        let mut cursor = model.lists[list_idx].head(slot);

        for _ in 0..n_infected {
            let Some(event) = cursor else { break };
            cursor = Some(model.events.next(event));
            let infector = model.events.owner(event);

            let n_interactions = model.population[infector].n_interactions[today];
            let mut interaction = model.population[infector].interactions[today];
            for _ in 0..n_interactions {
                let Some(id) = interaction else { break };
                let record = model.interactions.get(id);
                let contact = record.other;
                interaction = record.next;

                if model.population[contact].status == DiseaseStatus::Uninfected {
                    model.population[contact].hazard -= hazard_rate;
                    if model.population[contact].hazard < 0.0 {
                        new_infection(model, contact, infector);
                    }
                }
            }
        }
    }
}

/// Infect `infected`, classify the case, and schedule its forward trajectory.
/// Seeding passes the person as their own infector.
pub fn new_infection(model: &mut Model, infected: PersonId, infector: PersonId) {
    let t = model.time;
    model.population[infected].infector = Some(infector);
    model.population[infected].time_infected = Some(t);

    let p_asymptomatic = model.params.fraction_asymptomatic;
    if model.rng.bernoulli(p_asymptomatic) {
        model.population[infected].status = DiseaseStatus::Asymptomatic;
        model.population[infected].time_asymptomatic = Some(t);
        let event =
            model.lists[EventKind::Asymptomatic as usize].add(&mut model.events, infected, t);
        model.population[infected].current_event = Some(event);

        let time_recovery = t + model.draws.asymptomatic_time.sample();
        model.population[infected].time_recovered = Some(time_recovery);
        model.population[infected].next_event_type = Some(EventKind::Recovered);
        model.lists[EventKind::Recovered as usize].add(&mut model.events, infected, time_recovery);
        trace!("person {infected} infected by {infector} on day {t} (asymptomatic)");
    } else {
        model.population[infected].status = DiseaseStatus::Presymptomatic;
        let event =
            model.lists[EventKind::Presymptomatic as usize].add(&mut model.events, infected, t);
        model.population[infected].current_event = Some(event);

        let time_symptoms = t + model.draws.symptomatic_time.sample();
        model.population[infected].time_symptomatic = Some(time_symptoms);
        model.population[infected].next_event_type = Some(EventKind::Symptomatic);
        model.lists[EventKind::Symptomatic as usize].add(&mut model.events, infected, time_symptoms);
        trace!("person {infected} infected by {infector} on day {t}");
    }
}
