//! Speaker attribution against the MP roster.
//!
//! A speaker name is matched exactly (after normalisation) first. Failing
//! that, every MP is scored and the best match is accepted only when it
//! clears the threshold and beats the runner-up by a clear margin. Anything
//! else is unattributed: a statement is never dropped and never guessed onto
//! the wrong MP.

mod roster;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub use roster::{MpLookup, MpRoster};

use crate::catalog::NewStatement;
use crate::segment::{Segment, SpeakerName, extract_bill_references, speaker_name};

/// Default minimum similarity for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Minimum lead of the best fuzzy score over the runner-up.
pub const DEFAULT_FUZZY_MARGIN: f64 = 0.05;

/// Score for a multi-token name fully contained in another.
const CONTAINMENT_SCORE: f64 = 0.95;

/// Score for a bare surname carried by exactly one MP.
const SURNAME_SCORE: f64 = 0.9;

/// How a statement's speaker was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionConfidence {
    /// Normalised names are identical.
    Exact,
    /// Similar enough, and clearly better than any other MP.
    Fuzzy,
    /// No marker, a collective or role marker, or no confident match.
    Unattributed,
}

impl AttributionConfidence {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Unattributed => "unattributed",
        }
    }
}

impl fmt::Display for AttributionConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of matching one speaker marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    /// Matched MP, `None` when unattributed.
    pub mp_id: Option<i64>,
    /// How the match was made.
    pub confidence: AttributionConfidence,
}

impl Attribution {
    const UNATTRIBUTED: Self = Self {
        mp_id: None,
        confidence: AttributionConfidence::Unattributed,
    };
}

/// Matches speaker markers to MPs.
#[derive(Debug, Clone)]
pub struct Attributor {
    roster: MpRoster,
    threshold: f64,
    margin: f64,
}

impl Attributor {
    /// Creates an attributor with the default margin.
    #[must_use]
    pub fn new(roster: MpRoster, threshold: f64) -> Self {
        Self {
            roster,
            threshold,
            margin: DEFAULT_FUZZY_MARGIN,
        }
    }

    /// Overrides the required lead over the runner-up.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// The roster being matched against.
    #[must_use]
    pub fn roster(&self) -> &MpRoster {
        &self.roster
    }

    /// Matches one raw speaker marker.
    #[must_use]
    pub fn match_speaker(&self, speaker_raw: &str) -> Attribution {
        let SpeakerName::Person(name) = speaker_name(speaker_raw) else {
            return Attribution::UNATTRIBUTED;
        };

        match self.roster.lookup(&name) {
            MpLookup::Unique(mp) => Attribution {
                mp_id: Some(mp.id),
                confidence: AttributionConfidence::Exact,
            },
            MpLookup::Candidates(same_name) if !same_name.is_empty() => {
                trace!(name = %name, candidates = same_name.len(), "ambiguous exact name");
                Attribution::UNATTRIBUTED
            }
            MpLookup::Candidates(_) => self.fuzzy_match(&name),
        }
    }

    fn fuzzy_match(&self, name: &str) -> Attribution {
        let query: Vec<&str> = name.split_whitespace().collect();
        let surname_hit = match query.as_slice() {
            [single] => self.roster.unique_surname(single).map(|e| e.mp.id),
            _ => None,
        };

        let mut best: Option<(i64, f64)> = None;
        let mut runner_up = 0.0_f64;
        for entry in self.roster.entries() {
            let mut score = strsim::normalized_levenshtein(name, &entry.normalized);
            if query.len() >= 2 && contains_all(&entry.tokens, &query) {
                score = score.max(CONTAINMENT_SCORE);
            }
            if entry.tokens.len() >= 2
                && query.len() > entry.tokens.len()
                && contains_all_owned(&query, &entry.tokens)
            {
                score = score.max(CONTAINMENT_SCORE);
            }
            if surname_hit == Some(entry.mp.id) {
                score = score.max(SURNAME_SCORE);
            }

            match best {
                Some((_, top)) if score <= top => runner_up = runner_up.max(score),
                _ => {
                    if let Some((_, top)) = best {
                        runner_up = runner_up.max(top);
                    }
                    best = Some((entry.mp.id, score));
                }
            }
        }

        match best {
            Some((mp_id, score)) if score >= self.threshold && score - runner_up >= self.margin => {
                trace!(name = %name, mp_id, score, runner_up, "fuzzy match");
                Attribution {
                    mp_id: Some(mp_id),
                    confidence: AttributionConfidence::Fuzzy,
                }
            }
            _ => Attribution::UNATTRIBUTED,
        }
    }

    /// Turns segments into statements ready to persist, in order.
    #[must_use]
    pub fn attribute(&self, segments: &[Segment]) -> Vec<NewStatement> {
        let mut cache: HashMap<&str, Attribution> = HashMap::new();
        segments
            .iter()
            .map(|segment| {
                let attribution = segment.speaker_raw.as_deref().map_or(
                    Attribution::UNATTRIBUTED,
                    |raw| *cache.entry(raw).or_insert_with(|| self.match_speaker(raw)),
                );
                NewStatement {
                    speaker_raw: segment.speaker_raw.clone(),
                    mp_id: attribution.mp_id,
                    attribution: attribution.confidence,
                    raw_text: segment.text.clone(),
                    page_number: segment.page_number,
                    bill_references: extract_bill_references(&segment.text),
                }
            })
            .collect()
    }
}

fn contains_all(haystack: &[String], needles: &[&str]) -> bool {
    needles.iter().all(|n| haystack.iter().any(|h| h == n))
}

fn contains_all_owned(haystack: &[&str], needles: &[String]) -> bool {
    needles.iter().all(|n| haystack.contains(&n.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Mp;

    fn mp(id: i64, name: &str) -> Mp {
        Mp {
            id,
            name: name.to_string(),
            constituency: None,
            party: None,
            term_id: None,
        }
    }

    fn attributor() -> Attributor {
        Attributor::new(
            MpRoster::new(vec![
                mp(1, "Moses Wetang'ula"),
                mp(2, "Jane Wanjiru Doe"),
                mp(3, "John Mbadi Ng'ongo"),
                mp(4, "Gladys Boss Shollei"),
                mp(5, "Gladys Wanga"),
            ]),
            DEFAULT_FUZZY_THRESHOLD,
        )
    }

    #[test]
    fn test_exact_match_after_normalisation() {
        let a = attributor();
        let hit = a.match_speaker("Hon. (Dr.) Moses Wetang'ula (Bungoma, FORD-K)");
        assert_eq!(hit.mp_id, Some(1));
        assert_eq!(hit.confidence, AttributionConfidence::Exact);
    }

    #[test]
    fn test_presiding_officer_matches_holder() {
        let hit = attributor().match_speaker("The Speaker (Hon. Moses Wetangula)");
        assert_eq!(hit.mp_id, Some(1));
        assert_eq!(hit.confidence, AttributionConfidence::Exact);
    }

    #[test]
    fn test_fuzzy_match_by_containment_and_typo() {
        let a = attributor();
        let hit = a.match_speaker("Hon. John Mbadi");
        assert_eq!(hit.mp_id, Some(3));
        assert_eq!(hit.confidence, AttributionConfidence::Fuzzy);

        let hit = a.match_speaker("Hon. Moses Wetangla");
        assert_eq!(hit.mp_id, Some(1));
        assert_eq!(hit.confidence, AttributionConfidence::Fuzzy);

        let hit = a.match_speaker("Hon. Shollei");
        assert_eq!(hit.mp_id, Some(4));
        assert_eq!(hit.confidence, AttributionConfidence::Fuzzy);
    }

    #[test]
    fn test_ambiguous_and_unknown_names_are_unattributed() {
        let a = attributor();
        assert_eq!(a.match_speaker("Hon. Gladys"), Attribution::UNATTRIBUTED);
        assert_eq!(a.match_speaker("Hon. Peter Kaluma"), Attribution::UNATTRIBUTED);
        assert_eq!(a.match_speaker("Hon. Members"), Attribution::UNATTRIBUTED);
        assert_eq!(a.match_speaker("The Speaker"), Attribution::UNATTRIBUTED);
    }

    #[test]
    fn test_wider_margin_rejects_close_fuzzy_matches() {
        let strict = attributor().with_margin(1.0);
        assert_eq!(strict.match_speaker("Hon. John Mbadi"), Attribution::UNATTRIBUTED);
        let exact = strict.match_speaker("Hon. Gladys Wanga");
        assert_eq!(exact.mp_id, Some(5));
        assert_eq!(exact.confidence, AttributionConfidence::Exact);
    }

    #[test]
    fn test_empty_roster_attributes_nothing() {
        let a = Attributor::new(MpRoster::default(), DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(a.match_speaker("Hon. Jane Doe"), Attribution::UNATTRIBUTED);
    }

    #[test]
    fn test_attribute_keeps_every_segment_in_order() {
        let segments = vec![
            Segment {
                speaker_raw: None,
                text: "PRAYERS".to_string(),
                page_number: 1,
            },
            Segment {
                speaker_raw: Some("Hon. Jane Wanjiru Doe".to_string()),
                text: "I beg to move the Finance Bill, 2025.".to_string(),
                page_number: 1,
            },
            Segment {
                speaker_raw: Some("Hon. Nobody Known".to_string()),
                text: "Point of order!".to_string(),
                page_number: 2,
            },
        ];

        let statements = attributor().attribute(&segments);
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].attribution, AttributionConfidence::Unattributed);
        assert_eq!(statements[1].mp_id, Some(2));
        assert_eq!(statements[1].attribution, AttributionConfidence::Exact);
        assert_eq!(statements[1].bill_references, vec!["The Finance Bill, 2025"]);
        assert_eq!(statements[2].mp_id, None);
        assert_eq!(statements[2].page_number, 2);
    }

    #[test]
    fn test_confidence_serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&AttributionConfidence::Unattributed).unwrap_or_default(),
            "\"unattributed\""
        );
        assert_eq!(AttributionConfidence::Fuzzy.to_string(), "fuzzy");
    }
}
