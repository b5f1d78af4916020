use serde::Serialize;

use crate::events::{EventId, EventKind};
use crate::network::InteractionId;
use crate::trace_tokens::TokenId;

/// Stable identity of one person: a dense index into the population array.
pub type PersonId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiseaseStatus {
    Uninfected,
    Presymptomatic,
    Asymptomatic,
    Symptomatic,
    Hospitalised,
    Recovered,
    Death,
}

/// State of the one test slot each person has: nothing in flight, a test
/// ordered but not yet taken, or a taken test awaiting its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestSlot {
    NoTest,
    Ordered,
    Positive,
    Negative,
}

/// Per-person record. Interaction list heads and counts are indexed by the
/// day slot of the rolling interaction window, not by absolute day.
pub struct Individual {
    pub idx: PersonId,
    pub house_no: usize,
    pub status: DiseaseStatus,
    pub mean_interactions: u32,

    /// Remaining random exposure threshold; infection fires when repeated
    /// per-contact deductions push it below zero. Never re-seeded.
    pub hazard: f64,

    pub quarantined: bool,
    pub is_case: bool,
    pub app_user: bool,
    pub traced_on_this_trace: bool,

    pub time_infected: Option<u32>,
    pub time_symptomatic: Option<u32>,
    pub time_asymptomatic: Option<u32>,
    pub time_hospitalised: Option<u32>,
    pub time_recovered: Option<u32>,
    pub time_death: Option<u32>,
    pub time_quarantined: Option<u32>,

    pub infector: Option<PersonId>,

    /// The event marking this person's place in the list of their current
    /// disease state, if they are on the infected axis at all.
    pub current_event: Option<EventId>,
    /// Kind of the already-scheduled next transition, when one is pending.
    pub next_event_type: Option<EventKind>,
    pub quarantine_event: Option<EventId>,
    pub quarantine_release_event: Option<EventId>,
    pub test_slot: TestSlot,
    pub index_trace_token: Option<TokenId>,

    pub interactions: Vec<Option<InteractionId>>,
    pub n_interactions: Vec<u32>,
}

impl Individual {
    #[must_use]
    pub fn new(
        idx: PersonId,
        house_no: usize,
        mean_interactions: u32,
        hazard: f64,
        days_of_interactions: usize,
    ) -> Self {
        Self {
            idx,
            house_no,
            status: DiseaseStatus::Uninfected,
            mean_interactions,
            hazard,
            quarantined: false,
            is_case: false,
            app_user: false,
            traced_on_this_trace: false,
            time_infected: None,
            time_symptomatic: None,
            time_asymptomatic: None,
            time_hospitalised: None,
            time_recovered: None,
            time_death: None,
            time_quarantined: None,
            infector: None,
            current_event: None,
            next_event_type: None,
            quarantine_event: None,
            quarantine_release_event: None,
            test_slot: TestSlot::NoTest,
            index_trace_token: None,
            interactions: vec![None; days_of_interactions],
            n_interactions: vec![0; days_of_interactions],
        }
    }

    #[must_use]
    pub fn is_in_hospital(&self) -> bool {
        self.status == DiseaseStatus::Hospitalised
    }
}
