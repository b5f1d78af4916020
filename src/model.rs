use log::{debug, trace};

use crate::disease;
use crate::draw_lists::{gamma_rate_curve, DrawLists, MAX_INFECTIOUS_PERIOD};
use crate::error::Error;
use crate::events::{EventKind, EventList, EventPool};
use crate::households::HouseholdDirectory;
use crate::individual::{Individual, PersonId};
use crate::interventions::{self, PolicyState};
use crate::network::{self, InteractionPool};
use crate::parameters::{validate, Params};
use crate::rng::ModelRng;
use crate::trace_tokens::TraceTokenPool;
use crate::transmission;

/// One simulation instance: the population, every pre-allocated pool, the
/// per-kind event schedules, and the seeded random stream. All state is
/// owned; independent instances can run side by side.
pub struct Model {
    pub(crate) params: Params,
    pub(crate) policy: PolicyState,
    pub(crate) rng: ModelRng,
    pub(crate) time: u32,
    pub(crate) population: Vec<Individual>,
    pub(crate) households: HouseholdDirectory,
    pub(crate) events: EventPool,
    pub(crate) lists: Vec<EventList>,
    pub(crate) interactions: InteractionPool,
    pub(crate) stubs: Vec<PersonId>,
    pub(crate) draws: DrawLists,
    pub(crate) tokens: TraceTokenPool,
    pub(crate) interaction_day_idx: usize,
    pub(crate) n_quarantine_days: u64,
    pub(crate) n_cases: u64,
    pub(crate) n_total_interactions: u64,
    pub(crate) scratch_traced: Vec<PersonId>,
}

impl Model {
    /// Build a model from a validated parameter snapshot: size every pool,
    /// precompute the draw lists and infectiousness curves, partition the
    /// population into households, mark the app users, and seed the first
    /// infections on day 0.
    pub fn new(params: Params) -> Result<Self, Error> {
        validate(&params)?;
        let mut rng = ModelRng::seed_from(params.seed);
        let draws = DrawLists::from_params(&mut rng, &params)?;

        let per_contact_rate = if params.mean_daily_interactions == 0 {
            0.0
        } else {
            params.infectious_rate / f64::from(params.mean_daily_interactions)
        };
        let n_day_slots = params.end_time as usize + 2;
        let mut lists = Vec::with_capacity(EventKind::COUNT);
        for kind in EventKind::ALL {
            let mut list = EventList::new(kind, n_day_slots);
            let factor = match kind {
                EventKind::Presymptomatic | EventKind::Symptomatic | EventKind::Hospitalised => {
                    per_contact_rate
                }
                EventKind::Asymptomatic => {
                    per_contact_rate * params.asymptomatic_infectious_factor
                }
                _ => 0.0,
            };
            if matches!(
                kind,
                EventKind::Presymptomatic
                    | EventKind::Symptomatic
                    | EventKind::Hospitalised
                    | EventKind::Asymptomatic
            ) {
                list.infectious_curve = if factor > 0.0 {
                    gamma_rate_curve(
                        MAX_INFECTIOUS_PERIOD,
                        params.mean_infectious_period,
                        params.sd_infectious_period,
                        factor,
                    )?
                } else {
                    vec![0.0; MAX_INFECTIOUS_PERIOD]
                };
            }
            lists.push(list);
        }

        let (house_of, households) =
            HouseholdDirectory::assign(params.n_total, params.mean_household_size);
        let mut population: Vec<Individual> = (0..params.n_total)
            .map(|idx| {
                Individual::new(
                    idx,
                    house_of[idx],
                    params.mean_daily_interactions,
                    rng.exp1(),
                    params.days_of_interactions,
                )
            })
            .collect();
        set_up_app_users(&mut population, &mut rng, params.app_users_fraction)?;

        let n_interaction_slots = params.n_total
            * params.mean_daily_interactions as usize
            * params.days_of_interactions;
        let mut model = Self {
            policy: PolicyState::from_params(&params),
            rng,
            time: 0,
            population,
            households,
            events: EventPool::new(params.n_total),
            lists,
            interactions: InteractionPool::new(n_interaction_slots),
            stubs: Vec::with_capacity(
                params.n_total * params.mean_daily_interactions as usize,
            ),
            draws,
            tokens: TraceTokenPool::new(params.n_total),
            interaction_day_idx: 0,
            n_quarantine_days: 0,
            n_cases: 0,
            n_total_interactions: 0,
            scratch_traced: Vec::with_capacity(64),
            params,
        };

        model.seed_infections();
        model.lists[EventKind::Presymptomatic as usize].update_counters(0);
        model.lists[EventKind::Asymptomatic as usize].update_counters(0);
        debug!(
            "model ready: {} people, {} households, {} seeded",
            model.params.n_total,
            model.households.n_households(),
            model.params.n_seed_infection
        );
        Ok(model)
    }

    fn seed_infections(&mut self) {
        trace!("seeding {} initial infections", self.params.n_seed_infection);
        for _ in 0..self.params.n_seed_infection {
            let person = loop {
                let candidate = self.rng.uniform_int(self.params.n_total);
                if self.population[candidate].time_infected.is_none() {
                    break candidate;
                }
            };
            // A seed is its own infector.
            transmission::new_infection(self, person, person);
        }
    }

    /// Advance the simulation by one day and return the new day index.
    ///
    /// The order is load-bearing: counters for states whose arrivals become
    /// current are promoted first, the network is rebuilt before transmission
    /// reads it, test results land before releases are drained, and
    /// hospitalisation clears quarantine before recovery or death schedules
    /// are added.
    pub fn one_time_step(&mut self) -> u32 {
        assert!(
            self.time < self.params.end_time,
            "stepping past the configured end day"
        );
        self.time += 1;

        interventions::update_intervention_policy(self);

        for kind in [
            EventKind::Symptomatic,
            EventKind::Hospitalised,
            EventKind::Recovered,
            EventKind::Death,
            EventKind::TestTake,
            EventKind::TestResult,
        ] {
            self.lists[kind as usize].update_counters(self.time);
        }

        network::build_daily_network(self);
        transmission::transmit_virus(self);

        disease::transition_to_symptomatic(self);
        disease::transition_to_hospitalised(self);
        disease::transition_to_recovered(self);
        disease::transition_to_death(self);
        interventions::quarantined_test_take(self);
        interventions::quarantined_test_result(self);
        interventions::release_from_quarantine(self);

        for kind in [
            EventKind::Presymptomatic,
            EventKind::Asymptomatic,
            EventKind::Quarantined,
        ] {
            self.lists[kind as usize].update_counters(self.time);
        }
        self.n_quarantine_days += self.lists[EventKind::Quarantined as usize]
            .n_current
            .max(0) as u64;

        self.interaction_day_idx =
            (self.interaction_day_idx + 1) % self.params.days_of_interactions;
        self.time
    }

    #[must_use]
    pub fn time(&self) -> u32 {
        self.time
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.population
    }

    /// People currently in `kind`'s state (for terminal states, ever in it).
    #[must_use]
    pub fn n_current(&self, kind: EventKind) -> i64 {
        self.lists[kind as usize].n_current
    }

    /// Everyone ever promoted into `kind`'s state.
    #[must_use]
    pub fn n_total(&self, kind: EventKind) -> u64 {
        self.lists[kind as usize].n_total
    }

    /// Cumulative infections, counted on entry to either infected branch.
    #[must_use]
    pub fn total_infected(&self) -> u64 {
        self.lists[EventKind::Presymptomatic as usize].n_total
            + self.lists[EventKind::Asymptomatic as usize].n_total
    }

    /// Cumulative confirmed cases.
    #[must_use]
    pub fn n_cases(&self) -> u64 {
        self.n_cases
    }

    /// Cumulative person-days spent in quarantine.
    #[must_use]
    pub fn n_quarantine_days(&self) -> u64 {
        self.n_quarantine_days
    }
}

/// Mark a random share of the population as app users by shuffling the
/// not-yet-users, leaving existing users in place.
fn set_up_app_users(
    population: &mut [Individual],
    rng: &mut ModelRng,
    target: f64,
) -> Result<(), Error> {
    let n_total = population.len();
    let current = population.iter().filter(|i| i.app_user).count();
    let not_users = n_total - current;
    let wanted = (n_total as f64 * target).ceil() as i64 - current as i64;
    if wanted < 0 || wanted as usize > not_users {
        return Err(Error::config(format!(
            "app user target {target} is unreachable: {current} of {n_total} already enrolled"
        )));
    }
    let mut enrolled = vec![false; not_users];
    for slot in enrolled.iter_mut().take(wanted as usize) {
        *slot = true;
    }
    rng.shuffle(&mut enrolled);
    let mut next = 0;
    for indiv in population.iter_mut() {
        if !indiv.app_user {
            indiv.app_user = enrolled[next];
            next += 1;
        }
    }
    Ok(())
}
