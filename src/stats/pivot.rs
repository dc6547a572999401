use std::collections::{BTreeSet, HashMap};
use super::teams::build_team_universe;
use super::types::{AllocationRecord, Filter, PivotSet, PivotTable, SlotCell, StatisticsState};

/// Cuts a start time down to "HH:MM" ("10:00:00" -> "10:00")
pub fn format_start_time(time: &str) -> &str {
    match time.char_indices().nth(5) {
        Some((end, _)) => &time[..end],
        None => time,
    }
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn fill_table<C>(
    rows: &[String],
    columns: &[String],
    mut cell: impl FnMut(&str, &str) -> C,
) -> PivotTable<C> {
    let cells = rows
        .iter()
        .map(|row| columns.iter().map(|column| cell(row, column)).collect())
        .collect();

    PivotTable {
        row_labels: rows.to_vec(),
        column_labels: columns.to_vec(),
        cells,
    }
}

/// Counts records per (team, key) and spreads the counts over the row x column grid
fn frequency_table<'a>(
    rows: &[String],
    columns: &[String],
    working_set: &[&'a AllocationRecord],
    key: impl Fn(&'a AllocationRecord) -> &'a str,
) -> PivotTable<u32> {
    let mut counts: HashMap<(&str, &str), u32> = HashMap::new();
    for &record in working_set {
        *counts.entry((record.team_name.as_str(), key(record))).or_insert(0) += 1;
    }

    fill_table(rows, columns, |team, column| {
        counts.get(&(team, column)).copied().unwrap_or(0)
    })
}

/// Builds the four statistics tables
///
/// Column headers always come from every record so they stay put when the
/// filter changes; rows and cell values only reflect records of the filter.
/// When a team has several records on one date the last one is shown.
pub fn build(records: &[AllocationRecord], filter: &Filter) -> PivotSet {
    let team_universe = build_team_universe(records);

    let dates = sorted_distinct(records.iter().map(|r| r.date.as_str()));
    let start_times = sorted_distinct(records.iter().map(|r| format_start_time(&r.start_time)));
    let pitch_names = sorted_distinct(records.iter().map(|r| r.pitch_name.as_str()));

    let working_set: Vec<&AllocationRecord> = records
        .iter()
        .filter(|r| filter.matches(&r.team_name))
        .collect();

    let rows = match filter {
        Filter::All => team_universe,
        Filter::Team(name) => vec![name.clone()],
    };

    // team -> date -> last record seen
    let mut by_team_date: HashMap<&str, HashMap<&str, &AllocationRecord>> = HashMap::new();
    for &record in &working_set {
        by_team_date
            .entry(record.team_name.as_str())
            .or_default()
            .insert(record.date.as_str(), record);
    }
    let lookup = |team: &str, date: &str| {
        by_team_date
            .get(team)
            .and_then(|dates| dates.get(date))
            .copied()
    };

    let times = fill_table(&rows, &dates, |team, date| match lookup(team, date) {
        Some(record) => SlotCell {
            value: format_start_time(&record.start_time).to_string(),
            preferred: record.preferred,
        },
        None => SlotCell::absent(),
    });

    let pitches = fill_table(&rows, &dates, |team, date| match lookup(team, date) {
        Some(record) => SlotCell {
            value: record.pitch_name.clone(),
            preferred: false,
        },
        None => SlotCell::absent(),
    });

    let start_frequency = frequency_table(&rows, &start_times, &working_set, |r| {
        format_start_time(&r.start_time)
    });
    let pitch_usage = frequency_table(&rows, &pitch_names, &working_set, |r| r.pitch_name.as_str());

    PivotSet {
        times,
        pitches,
        start_frequency,
        pitch_usage,
    }
}

impl StatisticsState {
    pub fn pivot(&self) -> PivotSet {
        build(&self.records, &self.filter)
    }
}
