use std::sync::Arc;
use serde::{Serialize, Deserialize};

/// Cell text used when a team has no allocation for a column
pub const ABSENT_MARKER: &str = "-";

/// Filter value selecting every team
pub const ALL_TEAMS: &str = "All";

/// A single historical allocation after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub team_name: String,
    pub date: String,       // YYYY-MM-DD
    pub pitch_name: String,
    pub start_time: String, // HH:MM
    pub preferred: bool,
}

/// Team filter applied to the pivot rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Filter {
    #[default]
    All,
    Team(String),
}

impl Filter {
    pub fn as_str(&self) -> &str {
        match self {
            Filter::All => ALL_TEAMS,
            Filter::Team(name) => name,
        }
    }

    pub fn matches(&self, team_name: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Team(name) => name == team_name,
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        if value == ALL_TEAMS {
            Filter::All
        } else {
            Filter::Team(value.to_string())
        }
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        if value == ALL_TEAMS {
            Filter::All
        } else {
            Filter::Team(value)
        }
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::All => ALL_TEAMS.to_string(),
            Filter::Team(name) => name,
        }
    }
}

/// Cell of the match-times and pitches tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCell {
    pub value: String,
    pub preferred: bool,
}

impl SlotCell {
    pub fn absent() -> Self {
        SlotCell {
            value: ABSENT_MARKER.to_string(),
            preferred: false,
        }
    }

    #[cfg(test)]
    pub fn is_absent(&self) -> bool {
        self.value == ABSENT_MARKER
    }
}

/// Row (team) by column matrix; `cells[i][j]` belongs to `row_labels[i]` x `column_labels[j]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotTable<C> {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub cells: Vec<Vec<C>>,
}

#[cfg(test)]
impl<C> PivotTable<C> {
    pub fn row(&self, row_label: &str) -> Option<&[C]> {
        let index = self.row_labels.iter().position(|r| r == row_label)?;
        self.cells.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row_label: &str, column_label: &str) -> Option<&C> {
        let column = self.column_labels.iter().position(|c| c == column_label)?;
        self.row(row_label)?.get(column)
    }
}

/// The four statistics views derived from one record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotSet {
    pub times: PivotTable<SlotCell>,
    pub pitches: PivotTable<SlotCell>,
    pub start_frequency: PivotTable<u32>,
    pub pitch_usage: PivotTable<u32>,
}

/// Immutable input of a pivot build. Cloning shares the record set.
#[derive(Debug, Clone)]
pub struct StatisticsState {
    pub records: Arc<[AllocationRecord]>,
    pub filter: Filter,
}

impl Default for StatisticsState {
    fn default() -> Self {
        StatisticsState::new(Vec::new())
    }
}

impl StatisticsState {
    pub fn new(records: Vec<AllocationRecord>) -> Self {
        StatisticsState {
            records: records.into(),
            filter: Filter::All,
        }
    }

    pub fn with_filter(&self, filter: Filter) -> Self {
        StatisticsState {
            records: Arc::clone(&self.records),
            filter,
        }
    }
}

/// A (team, date) pair allocated more than once in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSlot {
    pub team_name: String,
    pub date: String,
    pub count: usize,
}

/// Team entry of a roster as delivered by the team management side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterTeam {
    pub display_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
