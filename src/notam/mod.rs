pub mod category;
pub mod parser;
pub mod segmenter;

use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use geo::Point;
use serde::{Serialize, Serializer};
use uom::si::f64::Length;

pub use category::Category;
pub use parser::ValidityError;
pub use segmenter::{BulletinKind, NotamSegmenter};

pub const UNKNOWN_AIRPORT: &str = "UNKNOWN";

/// End of a NOTAM's validity. `UFN` and `PERM` are kept apart from dated expiries and are never
/// converted into timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    At(DateTime<Utc>),
    /// until further notice
    Ufn,
    Perm,
}

impl Expiry {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::At(timestamp) => Some(*timestamp),
            Expiry::Ufn | Expiry::Perm => None,
        }
    }

    pub fn is_open_ended(&self) -> bool {
        !matches!(self, Expiry::At(_))
    }
}

impl Display for Expiry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expiry::At(timestamp) => {
                write!(f, "{}", timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Expiry::Ufn => write!(f, "UFN"),
            Expiry::Perm => write!(f, "PERM"),
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Effective and expiry time always come as a pair.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Validity {
    pub effective_time: DateTime<Utc>,
    pub expiry_time: Expiry,
}

impl Validity {
    /// Overlap with `[from, to]`, open-ended expiries reach to the end of time.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.effective_time <= to
            && self
                .expiry_time
                .timestamp()
                .is_none_or(|expiry| expiry >= from)
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const LEVELS: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// ICAO `Q)` qualifier line, e.g. `Q) RJJJ/QMRLC/IV/NBO/A/000/999/3733N12647E005`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct QLine {
    pub fir: String,
    pub code: String,
    pub traffic: String,
    pub purpose: String,
    pub scope: String,
    /// flight levels
    pub lower: u16,
    pub upper: u16,
    pub centre: Option<Point>,
    pub radius: Option<Length>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NotamRecord {
    pub notam_number: String,
    /// ICAO code of the aerodrome the notice was filed for, [`UNKNOWN_AIRPORT`] if none was found
    pub airport_code: String,
    /// `airport_code` followed by further locations from the `A)` field
    pub airports: Vec<String>,
    pub validity: Option<Validity>,
    pub category: Category,
    pub priority: Priority,
    pub q_line: Option<QLine>,
    /// recurring schedule from the `D)` field
    pub time_band: Option<String>,
    pub body_text: String,
    pub raw_text: String,
    pub local_time_display: Option<String>,
}

impl NotamRecord {
    pub fn effective_time(&self) -> Option<DateTime<Utc>> {
        self.validity.map(|validity| validity.effective_time)
    }

    pub fn expiry_time(&self) -> Option<Expiry> {
        self.validity.map(|validity| validity.expiry_time)
    }

    pub fn has_known_airport(&self) -> bool {
        self.airport_code != UNKNOWN_AIRPORT
    }
}
