//! Domain types shared by the listing, reconciliation and persistence layers.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sitting of the day a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPeriod {
    /// Morning sitting.
    Morning,
    /// Afternoon sitting (the regular sitting of the House).
    Afternoon,
    /// Evening sitting.
    Evening,
    /// Title carried no period keyword.
    #[default]
    Unknown,
}

impl SessionPeriod {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Unknown => "unknown",
        }
    }

    /// Single-letter code used in stored file names.
    ///
    /// Unknown periods share the afternoon slot; collisions are resolved by
    /// numeric suffixes.
    #[must_use]
    pub fn file_code(&self) -> char {
        match self {
            Self::Afternoon | Self::Unknown => 'A',
            Self::Morning => 'P',
            Self::Evening => 'E',
        }
    }
}

impl fmt::Display for SessionPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("invalid session period: {s}")),
        }
    }
}

/// A document reference as discovered on a listing page.
///
/// Ephemeral: consumed by the reconciler, never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocumentRef {
    /// Absolute URL of the binary document.
    pub source_url: String,
    /// Row title as published.
    pub title: String,
    /// Sitting date, when it could be parsed from the title or file name.
    pub published_date: Option<NaiveDate>,
    /// Sitting period parsed from the title.
    pub session_period: SessionPeriod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_file_codes() {
        assert_eq!(SessionPeriod::Afternoon.file_code(), 'A');
        assert_eq!(SessionPeriod::Morning.file_code(), 'P');
        assert_eq!(SessionPeriod::Evening.file_code(), 'E');
        assert_eq!(SessionPeriod::Unknown.file_code(), 'A');
    }

    #[test]
    fn test_period_round_trips_through_db_string() {
        for period in [
            SessionPeriod::Morning,
            SessionPeriod::Afternoon,
            SessionPeriod::Evening,
            SessionPeriod::Unknown,
        ] {
            assert_eq!(period.as_str().parse::<SessionPeriod>().unwrap(), period);
        }
        assert!("midnight".parse::<SessionPeriod>().is_err());
    }
}
