use log::trace;

use crate::events::EventKind;
use crate::individual::DiseaseStatus;
use crate::interventions;
use crate::model::Model;

/// Walks today's bucket of `kind`, binding each event's owner and handle,
/// prefetching the successor before the caller's side effects run. The walk
/// is bounded by the bucket count taken at entry, so events scheduled into
/// the same bucket mid-drain wait for their own pass, and removals mid-drain
/// cannot derail it.
macro_rules! drain_today {
    ($model:expr, $kind:expr, |$person:ident, $event:ident| $body:block) => {{
        let t = $model.time;
        let slot = $model.lists[$kind as usize].slot(t);
        let n_due = $model.lists[$kind as usize].n_daily_current_at(slot);
        let mut cursor = $model.lists[$kind as usize].head(slot);
        for _ in 0..n_due {
            let Some($event) = cursor else { break };
            cursor = Some($model.events.next($event));
            let $person = $model.events.owner($event);
            $body
        }
    }};
}
pub(crate) use drain_today;

/// Presymptomatic people whose symptom onset falls today become symptomatic,
/// get a hospitalisation date, and trigger the symptom interventions.
pub fn transition_to_symptomatic(model: &mut Model) {
    drain_today!(model, EventKind::Symptomatic, |person, event| {
        let t = model.time;
        model.population[person].status = DiseaseStatus::Symptomatic;
        let infected_day = model.population[person]
            .time_infected
            .expect("symptom onset for an uninfected individual");
        if let Some(current) = model.population[person].current_event.take() {
            model.lists[EventKind::Presymptomatic as usize].remove(
                &mut model.events,
                current,
                infected_day,
            );
        }

        let time_hospital = t + model.draws.hospitalised_time.sample();
        model.population[person].time_hospitalised = Some(time_hospital);
        model.population[person].next_event_type = Some(EventKind::Hospitalised);
        model.population[person].current_event = Some(event);
        model.lists[EventKind::Hospitalised as usize].add(&mut model.events, person, time_hospital);
        trace!("person {person} symptomatic on day {t}, hospital due {time_hospital}");

        interventions::on_symptoms(model, person);
    });
}

/// Symptomatic people due in hospital move there, leave quarantine if they
/// were held, get a death-or-recovery schedule, and trigger the hospital
/// interventions.
pub fn transition_to_hospitalised(model: &mut Model) {
    drain_today!(model, EventKind::Hospitalised, |person, event| {
        let t = model.time;
        if model.population[person].quarantined {
            interventions::quarantine_release(model, person);
        }
        model.population[person].status = DiseaseStatus::Hospitalised;
        let symptomatic_day = model.population[person]
            .time_symptomatic
            .expect("hospitalisation for an individual who never had symptom onset");
        if let Some(current) = model.population[person].current_event.take() {
            model.lists[EventKind::Symptomatic as usize].remove(
                &mut model.events,
                current,
                symptomatic_day,
            );
        }
        model.population[person].current_event = Some(event);

        let cfr = model.params.cfr;
        if model.rng.bernoulli(cfr) {
            let time_death = t + model.draws.death_time.sample();
            model.population[person].time_death = Some(time_death);
            model.population[person].next_event_type = Some(EventKind::Death);
            model.lists[EventKind::Death as usize].add(&mut model.events, person, time_death);
            trace!("person {person} hospitalised on day {t}, death due {time_death}");
        } else {
            let time_recovery = t + model.draws.recovered_time.sample();
            model.population[person].time_recovered = Some(time_recovery);
            model.population[person].next_event_type = Some(EventKind::Recovered);
            model.lists[EventKind::Recovered as usize].add(&mut model.events, person, time_recovery);
            trace!("person {person} hospitalised on day {t}, recovery due {time_recovery}");
        }

        interventions::on_hospitalised(model, person);
    });
}

/// Hospitalised and asymptomatic people due to recover today do so; their
/// current-state event is unlinked and their schedule cleared.
pub fn transition_to_recovered(model: &mut Model) {
    drain_today!(model, EventKind::Recovered, |person, _event| {
        match model.population[person].status {
            DiseaseStatus::Hospitalised => {
                let day = model.population[person]
                    .time_hospitalised
                    .expect("hospitalised individual with no admission day");
                if let Some(current) = model.population[person].current_event.take() {
                    model.lists[EventKind::Hospitalised as usize].remove(
                        &mut model.events,
                        current,
                        day,
                    );
                }
            }
            DiseaseStatus::Asymptomatic => {
                let day = model.population[person]
                    .time_asymptomatic
                    .expect("asymptomatic individual with no onset day");
                if let Some(current) = model.population[person].current_event.take() {
                    model.lists[EventKind::Asymptomatic as usize].remove(
                        &mut model.events,
                        current,
                        day,
                    );
                }
            }
            // A recovery event can linger for someone who already left the
            // infected axis; nothing to do.
            _ => {}
        }
        model.population[person].status = DiseaseStatus::Recovered;
        model.population[person].current_event = None;
        model.population[person].next_event_type = None;
        trace!("person {person} recovered on day {}", model.time);
    });
}

/// Hospitalised people due to die today do so.
pub fn transition_to_death(model: &mut Model) {
    drain_today!(model, EventKind::Death, |person, _event| {
        let day = model.population[person]
            .time_hospitalised
            .expect("death scheduled for an individual never hospitalised");
        if let Some(current) = model.population[person].current_event.take() {
            model.lists[EventKind::Hospitalised as usize].remove(&mut model.events, current, day);
        }
        model.population[person].status = DiseaseStatus::Death;
        model.population[person].current_event = None;
        model.population[person].next_event_type = None;
        trace!("person {person} died on day {}", model.time);
    });
}
