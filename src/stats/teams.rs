use std::collections::{BTreeSet, HashMap, HashSet};
use super::age_group::extract_age_group;
use super::types::{AllocationRecord, DuplicateSlot};

/// Sorts team names by age ordinal, then by the full name
pub fn sort_team_names(names: &mut [String]) {
    names.sort_by(|a, b| {
        extract_age_group(a)
            .cmp(&extract_age_group(b))
            .then_with(|| a.cmp(b))
    });
}

/// Distinct team names of all records, in display order
pub fn build_team_universe(records: &[AllocationRecord]) -> Vec<String> {
    let distinct: HashSet<&str> = records.iter().map(|r| r.team_name.as_str()).collect();
    let mut names: Vec<String> = distinct.into_iter().map(str::to_string).collect();
    sort_team_names(&mut names);
    names
}

/// Lists (team, date) pairs that occur more than once
/// The pivot keeps only the last of these; this only reports them
pub fn find_duplicate_slots(records: &[AllocationRecord]) -> Vec<DuplicateSlot> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for record in records {
        *counts
            .entry((record.team_name.as_str(), record.date.as_str()))
            .or_insert(0) += 1;
    }

    let teams = build_team_universe(records);
    let team_rank: HashMap<&str, usize> = teams
        .iter()
        .enumerate()
        .map(|(rank, name)| (name.as_str(), rank))
        .collect();

    let duplicated: BTreeSet<(usize, &str, &str, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((team, date), count)| (team_rank[team], team, date, count))
        .collect();

    duplicated
        .into_iter()
        .map(|(_, team, date, count)| DuplicateSlot {
            team_name: team.to_string(),
            date: date.to_string(),
            count,
        })
        .collect()
}
