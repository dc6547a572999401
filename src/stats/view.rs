use log::{debug, info, warn};
use serde_json::Value;

use crate::error::Result;
use crate::parser::normalize;
use crate::source::AllocationSource;
use super::teams::{build_team_universe, find_duplicate_slots};
use super::types::{AllocationRecord, Filter, PivotSet, StatisticsState};

/// Sequence number of one record load; only the newest started load may land
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Statistics view controller
///
/// Owns the active filter and the last normalized record set. Every filter
/// change rebuilds the tables from scratch. Loads are tagged with a
/// `LoadTicket` so a slow load that finishes after a newer one started is
/// thrown away instead of replacing fresher data.
#[derive(Debug, Default)]
pub struct StatisticsView {
    state: StatisticsState,
    teams: Vec<String>,
    last_started: u64,
}

impl StatisticsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> &Filter {
        &self.state.filter
    }

    pub fn records(&self) -> &[AllocationRecord] {
        &self.state.records
    }

    /// Team universe of the cached records (unaffected by the filter)
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn pivot(&self) -> PivotSet {
        self.state.pivot()
    }

    /// Changes the filter and rebuilds every table
    pub fn set_filter(&mut self, filter: Filter) -> PivotSet {
        debug!("Statistics filter set to {}", filter.as_str());
        self.state = self.state.with_filter(filter);
        self.pivot()
    }

    /// Marks the start of a load; any older load still in flight becomes stale
    pub fn begin_load(&mut self) -> LoadTicket {
        self.last_started += 1;
        LoadTicket(self.last_started)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.last_started
    }

    /// Applies the outcome of a load started with `ticket`
    ///
    /// Returns the rebuilt tables, or `None` when the load was stale or failed.
    /// A failed load leaves the previous records in place.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Vec<Value>>) -> Option<PivotSet> {
        if !self.is_current(ticket) {
            debug!(
                "Discarding statistics load #{} (newest is #{})",
                ticket.0, self.last_started
            );
            return None;
        }

        match result {
            Ok(raw) => {
                self.replace_records(normalize(&raw));
                Some(self.pivot())
            }
            Err(e) => {
                warn!("Failed to fetch statistics data: {}", e);
                None
            }
        }
    }

    /// Performs a full load from `source` and rebuilds the tables
    pub async fn load_from(&mut self, source: &dyn AllocationSource) -> Option<PivotSet> {
        let ticket = self.begin_load();
        info!("Loading statistics from {}", source.describe());
        let result = source.fetch().await;
        self.finish_load(ticket, result)
    }

    fn replace_records(&mut self, records: Vec<AllocationRecord>) {
        for duplicate in find_duplicate_slots(&records) {
            warn!(
                "{} has {} allocations on {}; only the last one is shown",
                duplicate.team_name, duplicate.count, duplicate.date
            );
        }

        self.teams = build_team_universe(&records);
        info!(
            "Statistics loaded: {} allocations across {} teams",
            records.len(),
            self.teams.len()
        );
        self.state = StatisticsState {
            records: records.into(),
            filter: self.state.filter.clone(),
        };
    }
}
