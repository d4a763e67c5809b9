//! In-memory MP roster keyed by normalised name.

use std::collections::HashMap;

use crate::catalog::Mp;
use crate::segment::normalize_name;

/// Result of looking a normalised name up in the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MpLookup<'a> {
    /// Exactly one MP carries this name.
    Unique(&'a Mp),
    /// Zero or several MPs carry this name.
    Candidates(Vec<&'a Mp>),
}

/// An MP with its pre-normalised name.
#[derive(Debug, Clone)]
pub(crate) struct RosterEntry {
    pub(crate) mp: Mp,
    pub(crate) normalized: String,
    pub(crate) tokens: Vec<String>,
}

/// The MP reference table, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct MpRoster {
    entries: Vec<RosterEntry>,
    by_name: HashMap<String, Vec<usize>>,
    by_surname: HashMap<String, Vec<usize>>,
}

impl MpRoster {
    /// Builds a roster, normalising every MP name.
    #[must_use]
    pub fn new(mps: Vec<Mp>) -> Self {
        let mut roster = Self::default();
        for mp in mps {
            let normalized = normalize_name(&mp.name);
            if normalized.is_empty() {
                continue;
            }
            let tokens: Vec<String> = normalized.split_whitespace().map(str::to_string).collect();
            let index = roster.entries.len();
            roster
                .by_name
                .entry(normalized.clone())
                .or_default()
                .push(index);
            if let Some(surname) = tokens.last() {
                roster.by_surname.entry(surname.clone()).or_default().push(index);
            }
            roster.entries.push(RosterEntry {
                mp,
                normalized,
                tokens,
            });
        }
        roster
    }

    /// Number of MPs with a usable name.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no MP can ever be matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an already-normalised name.
    #[must_use]
    pub fn lookup(&self, normalized: &str) -> MpLookup<'_> {
        let hits: Vec<&Mp> = self
            .by_name
            .get(normalized)
            .into_iter()
            .flatten()
            .map(|&i| &self.entries[i].mp)
            .collect();
        match hits.as_slice() {
            [only] => MpLookup::Unique(only),
            _ => MpLookup::Candidates(hits),
        }
    }

    /// The single MP whose last name token is `surname`, if unique.
    pub(crate) fn unique_surname(&self, surname: &str) -> Option<&RosterEntry> {
        match self.by_surname.get(surname).map(Vec::as_slice) {
            Some([only]) => Some(&self.entries[*only]),
            _ => None,
        }
    }

    pub(crate) fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp(id: i64, name: &str) -> Mp {
        Mp {
            id,
            name: name.to_string(),
            constituency: None,
            party: None,
            term_id: None,
        }
    }

    #[test]
    fn test_lookup_normalises_roster_names() {
        let roster = MpRoster::new(vec![mp(1, "Hon. Moses Wetang'ula"), mp(2, "Hon. Jane Doe")]);
        assert_eq!(roster.len(), 2);
        match roster.lookup("moses wetangula") {
            MpLookup::Unique(found) => assert_eq!(found.id, 1),
            MpLookup::Candidates(other) => panic!("expected unique match, got {other:?}"),
        }
        assert_eq!(roster.lookup("nobody"), MpLookup::Candidates(vec![]));
    }

    #[test]
    fn test_duplicate_names_are_candidates() {
        let roster = MpRoster::new(vec![mp(1, "John Kamau"), mp(2, "Dr. John Kamau"), mp(3, "Mr.")]);
        assert_eq!(roster.len(), 2);
        match roster.lookup("john kamau") {
            MpLookup::Candidates(found) => assert_eq!(found.len(), 2),
            MpLookup::Unique(_) => panic!("duplicate names must not resolve uniquely"),
        }
        assert!(roster.unique_surname("kamau").is_none());
    }
}
