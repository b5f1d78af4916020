use crate::individual::{DiseaseStatus, PersonId};
use crate::model::Model;

/// Handle of one interaction slot in the pool.
pub type InteractionId = usize;

/// Whether a tracing app can recover this interaction. Decided lazily with
/// one Bernoulli draw the first time a cascade touches the edge, then
/// memoised so revisits within the quarantine window agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traceable {
    Unknown,
    Yes,
    No,
}

pub struct Interaction {
    pub other: PersonId,
    pub next: Option<InteractionId>,
    pub traceable: Traceable,
}

/// Circular pool of interaction records sized `N * mean_interactions * D`.
/// Allocation overwrites the oldest day's records as the cursor wraps; the
/// per-day reset in the network builder evicts the stale lists first.
pub struct InteractionPool {
    slots: Vec<Interaction>,
    cursor: usize,
}

impl InteractionPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Interaction {
                other: 0,
                next: None,
                traceable: Traceable::Unknown,
            })
            .collect();
        Self { slots, cursor: 0 }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn get(&self, id: InteractionId) -> &Interaction {
        &self.slots[id]
    }

    #[must_use]
    pub fn get_mut(&mut self, id: InteractionId) -> &mut Interaction {
        &mut self.slots[id]
    }

    fn allocate(&mut self) -> InteractionId {
        let id = self.cursor;
        self.cursor = (self.cursor + 1) % self.slots.len();
        let slot = &mut self.slots[id];
        slot.next = None;
        slot.traceable = Traceable::Unknown;
        id
    }
}

/// Rebuild today's random interaction graph.
///
/// Each person contributes their interaction count to a stub array; a uniform
/// shuffle followed by a pairwise scan yields a random near-regular pairing.
/// Self-pairs are skipped by advancing one position, so the realised mean
/// degree sits slightly below the configured one. Quarantined and dead people
/// contribute nothing, and lockdown scales everyone's contribution down.
pub fn build_daily_network(model: &mut Model) {
    let day = model.interaction_day_idx;

    for indiv in &mut model.population {
        indiv.n_interactions[day] = 0;
        indiv.interactions[day] = None;
    }

    let lockdown = model.policy.lockdown_on;
    let multiplier = model.params.lockdown_interaction_multiplier;
    model.stubs.clear();
    for (idx, indiv) in model.population.iter().enumerate() {
        if indiv.quarantined || indiv.status == DiseaseStatus::Death {
            continue;
        }
        let mut n = indiv.mean_interactions;
        if lockdown {
            n = (f64::from(n) * multiplier).round() as u32;
        }
        for _ in 0..n {
            model.stubs.push(idx);
        }
    }

    model.rng.shuffle(&mut model.stubs);

    if model.interactions.capacity() == 0 {
        return;
    }
    let n_stubs = model.stubs.len();
    let mut idx = 0;
    while idx + 1 < n_stubs {
        if model.stubs[idx] == model.stubs[idx + 1] {
            idx += 1;
            continue;
        }
        let a = model.stubs[idx];
        let b = model.stubs[idx + 1];
        idx += 2;

        let inter_a = model.interactions.allocate();
        let inter_b = model.interactions.allocate();

        let record_a = model.interactions.get_mut(inter_a);
        record_a.other = b;
        record_a.next = model.population[a].interactions[day];
        model.population[a].interactions[day] = Some(inter_a);
        model.population[a].n_interactions[day] += 1;

        let record_b = model.interactions.get_mut(inter_b);
        record_b.other = a;
        record_b.next = model.population[b].interactions[day];
        model.population[b].interactions[day] = Some(inter_b);
        model.population[b].n_interactions[day] += 1;

        model.n_total_interactions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::build_daily_network;
    use crate::model::Model;
    use crate::parameters::Params;

    fn quiet_params(n_total: usize) -> Params {
        Params {
            n_total,
            n_seed_infection: 0,
            end_time: 40,
            mean_daily_interactions: 4,
            days_of_interactions: 3,
            quarantine_days: 3,
            ..Params::default()
        }
    }

    /// Every edge must appear in both endpoints' lists for the same day.
    fn assert_symmetric(model: &Model, day: usize) {
        let mut degree_sum = 0u64;
        for indiv in model.individuals() {
            let mut cursor = indiv.interactions[day];
            let mut walked = 0;
            while let Some(id) = cursor {
                let record = model.interactions.get(id);
                assert_ne!(record.other, indiv.idx, "self-loop survived the skip");
                let mut reverse = model.individuals()[record.other].interactions[day];
                let mut found = false;
                while let Some(rid) = reverse {
                    let back = model.interactions.get(rid);
                    if back.other == indiv.idx {
                        found = true;
                        break;
                    }
                    reverse = back.next;
                }
                assert!(found, "edge {} -> {} has no mirror", indiv.idx, record.other);
                cursor = record.next;
                walked += 1;
            }
            assert_eq!(walked, indiv.n_interactions[day]);
            degree_sum += u64::from(indiv.n_interactions[day]);
        }
        assert_eq!(degree_sum % 2, 0, "odd total degree");
    }

    #[test]
    fn test_network_is_symmetric() {
        let mut model = Model::new(quiet_params(60)).unwrap();
        build_daily_network(&mut model);
        assert_symmetric(&model, model.interaction_day_idx);
    }

    #[test]
    fn test_degree_stays_at_or_below_target() {
        let mut model = Model::new(quiet_params(60)).unwrap();
        build_daily_network(&mut model);
        let day = model.interaction_day_idx;
        let total: u64 = model
            .individuals()
            .iter()
            .map(|i| u64::from(i.n_interactions[day]))
            .sum();
        assert!(total <= 60 * 4);
        assert!(total > 0);
    }

    #[test]
    fn test_rebuild_evicts_previous_day_slot() {
        let mut model = Model::new(quiet_params(30)).unwrap();
        // Run past the window length so the ring has wrapped at least twice.
        for _ in 0..8 {
            model.one_time_step();
            assert_symmetric(&model, (model.interaction_day_idx + 2) % 3);
        }
    }

    #[test]
    fn test_quarantined_contribute_no_stubs() {
        let mut model = Model::new(quiet_params(20)).unwrap();
        for indiv in &mut model.population {
            indiv.quarantined = true;
        }
        build_daily_network(&mut model);
        let day = model.interaction_day_idx;
        assert!(model
            .individuals()
            .iter()
            .all(|i| i.n_interactions[day] == 0));
    }

    #[test]
    fn test_lockdown_thins_the_network() {
        let mut busy = Model::new(quiet_params(100)).unwrap();
        build_daily_network(&mut busy);
        let baseline = busy.n_total_interactions;

        let mut locked = Model::new(Params {
            lockdown_on: true,
            lockdown_interaction_multiplier: 0.25,
            ..quiet_params(100)
        })
        .unwrap();
        build_daily_network(&mut locked);
        assert!(locked.n_total_interactions < baseline);
    }

    #[test]
    fn test_zero_interactions_builds_nothing() {
        let mut model = Model::new(Params {
            mean_daily_interactions: 0,
            ..quiet_params(20)
        })
        .unwrap();
        build_daily_network(&mut model);
        assert_eq!(model.n_total_interactions, 0);
    }
}
