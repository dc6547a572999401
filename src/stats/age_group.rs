use std::sync::OnceLock;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use super::types::RosterTeam;

/// Ordinal given to labels without a "U<N>" token, so they sort last
pub const UNKNOWN_AGE_GROUP: u32 = 999;

fn age_group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"U([0-9]+)").expect("age group pattern is valid"))
}

/// Extracts the age ordinal from a team label, e.g. "U10 Bears" -> 10
/// Returns `UNKNOWN_AGE_GROUP` when the label has no usable "U<N>" token
pub fn extract_age_group(label: &str) -> u32 {
    age_group_pattern()
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .unwrap_or(UNKNOWN_AGE_GROUP)
}

/// Roster teams grouped under their age-group label, in ascending age order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgeGroups {
    groups: Vec<(String, Vec<RosterTeam>)>,
}

#[cfg(test)]
impl AgeGroups {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(label, _)| label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<&[RosterTeam]> {
        self.groups
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, teams)| teams.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// Serialized as a JSON object whose key order is the age order
impl Serialize for AgeGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (label, teams) in &self.groups {
            map.serialize_entry(label, teams)?;
        }
        map.end()
    }
}

/// Groups a roster by the first word of each team's display name ("U7 Lions" -> "U7")
/// Group keys are always ordered by their age ordinal; teams keep roster order
pub fn group_roster_by_age_group(roster: &[RosterTeam]) -> AgeGroups {
    let mut groups: Vec<(String, Vec<RosterTeam>)> = Vec::new();

    for team in roster {
        let label = team.display_name.split_whitespace().next().unwrap_or("");
        match groups.iter_mut().find(|(l, _)| l == label) {
            Some((_, teams)) => teams.push(team.clone()),
            None => groups.push((label.to_string(), vec![team.clone()])),
        }
    }

    groups.sort_by(|(a, _), (b, _)| {
        extract_age_group(a)
            .cmp(&extract_age_group(b))
            .then_with(|| a.cmp(b))
    });

    AgeGroups { groups }
}
