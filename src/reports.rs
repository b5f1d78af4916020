use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::error::Error;
use crate::events::EventKind;
use crate::individual::{DiseaseStatus, TestSlot};
use crate::model::Model;

/// One row of the per-day time series.
#[derive(Debug, Serialize)]
struct TimeSeriesRow {
    time: u32,
    total_infected: u64,
    n_presymptomatic: i64,
    n_asymptomatic: i64,
    n_symptomatic: i64,
    n_hospitalised: i64,
    n_recovered: i64,
    n_death: i64,
    n_quarantined: i64,
    n_tests: u64,
    n_cases: u64,
    n_quarantine_days: u64,
}

/// CSV time series of the engine's per-tick observables. The report only
/// reads counters; it never mutates engine state.
pub struct TimeSeriesReport {
    writer: csv::Writer<File>,
}

impl TimeSeriesReport {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }

    pub fn record(&mut self, model: &Model) -> Result<(), Error> {
        self.writer.serialize(TimeSeriesRow {
            time: model.time(),
            total_infected: model.total_infected(),
            n_presymptomatic: model.n_current(EventKind::Presymptomatic),
            n_asymptomatic: model.n_current(EventKind::Asymptomatic),
            n_symptomatic: model.n_current(EventKind::Symptomatic),
            n_hospitalised: model.n_current(EventKind::Hospitalised),
            n_recovered: model.n_current(EventKind::Recovered),
            n_death: model.n_current(EventKind::Death),
            n_quarantined: model.n_current(EventKind::Quarantined),
            n_tests: model.n_total(EventKind::TestTake),
            n_cases: model.n_cases(),
            n_quarantine_days: model.n_quarantine_days(),
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct LineListRow {
    id: usize,
    household: usize,
    app_user: bool,
    status: DiseaseStatus,
    is_case: bool,
    test_slot: TestSlot,
    time_infected: Option<u32>,
    time_symptomatic: Option<u32>,
    time_asymptomatic: Option<u32>,
    time_hospitalised: Option<u32>,
    time_recovered: Option<u32>,
    time_death: Option<u32>,
    infector: Option<usize>,
}

/// End-of-run line list: one row per person with their final status and
/// event timestamps.
pub fn write_line_list(model: &Model, path: impl AsRef<Path>) -> Result<(), Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for indiv in model.individuals() {
        writer.serialize(LineListRow {
            id: indiv.idx,
            household: indiv.house_no,
            app_user: indiv.app_user,
            status: indiv.status,
            is_case: indiv.is_case,
            test_slot: indiv.test_slot,
            time_infected: indiv.time_infected,
            time_symptomatic: indiv.time_symptomatic,
            time_asymptomatic: indiv.time_asymptomatic,
            time_hospitalised: indiv.time_hospitalised,
            time_recovered: indiv.time_recovered,
            time_death: indiv.time_death,
            infector: indiv.infector,
        })?;
    }
    writer.flush()?;
    Ok(())
}
