use chrono::{DateTime, NaiveDate, Utc};
use geo::point;
use itertools::Itertools;
use once_cell::sync::Lazy;
use phf::phf_set;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use uom::si::{f64::Length, length::nautical_mile};

use crate::is_icao_code;

use super::{category, Expiry, NotamRecord, Priority, QLine, Validity, UNKNOWN_AIRPORT};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidityError {
    #[error("effective time without expiry")]
    MissingExpiry,
    #[error("expiry without effective time")]
    MissingEffective,
    #[error("invalid date {0:?}")]
    InvalidDate(String),
}

/// Four letter words in NOTAM text that look like ICAO location indicators.
pub static NON_AIRPORT_WORDS: phf::Set<&'static str> = phf_set! {
    "ACFT", "ALSO", "APCH", "AREA", "ASDA", "ATIS", "AVBL", "COAD", "CLSD", "DAYS", "DVOR",
    "EACH", "EXCL", "FREQ", "FROM", "GNSS", "HOUR", "INOP", "INTL", "LGTD", "NONE", "OBST",
    "ONLY", "OPEN", "PAPI", "PERM", "RAIM", "RCLL", "REDL", "RWYS", "SBAS", "SKED", "TEMP",
    "THEN", "TKOF", "TODA", "TORA", "TWRS", "TWYS", "WAAS", "WILL", "WITH", "DAILY",
};

pub fn is_plausible_airport(code: &str) -> bool {
    is_icao_code(code) && !NON_AIRPORT_WORDS.contains(code)
}

/// Checked in order, the first hit wins.
const AIRPORT_NAMES: [(&str, &str); 14] = [
    ("HONG KONG", "VHHH"),
    ("INCHEON", "RKSI"),
    ("GIMPO", "RKSS"),
    ("GIMHAE", "RKPK"),
    ("JEJU", "RKPC"),
    ("NARITA", "RJAA"),
    ("HANEDA", "RJTT"),
    ("KANSAI", "RJBB"),
    ("TAOYUAN", "RCTP"),
    ("MANILA", "RPLL"),
    ("SEATTLE", "KSEA"),
    ("PORTLAND", "KPDX"),
    ("ANCHORAGE", "PANC"),
    ("HONOLULU", "PHNL"),
];

/// Identifier patterns, most specific first, so `RKSI AIRAC AIP SUP 12/25` is not cut down to
/// `12/25`. Group 1 is the identifier.
static NOTAM_NUMBER_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("location COAD", r"\b[A-Z]{4}\s+(COAD\d{2}/\d{2})\b"),
        (
            "location AIRAC AIP SUP",
            r"\b[A-Z]{4}\s+(AIRAC\s+AIP\s+SUP\s+\d{1,3}/\d{2})\b",
        ),
        ("location AIP SUP", r"\b[A-Z]{4}\s+(AIP\s+SUP\s+\d{1,3}/\d{2})\b"),
        ("location series", r"\b[A-Z]{4}\s+([A-Z]\d{3,4}/\d{2})\b"),
        ("location number", r"\b[A-Z]{4}\s+(\d{1,4}/\d{2})\b"),
        ("COAD", r"\b(COAD\d{2}/\d{2})\b"),
        ("AIRAC AIP SUP", r"\b(AIRAC\s+AIP\s+SUP\s+\d{1,3}/\d{2})\b"),
        ("AIP SUP", r"\b(AIP\s+SUP\s+\d{1,3}/\d{2})\b"),
        ("series", r"\b([A-Z]\d{4}/\d{2})\b"),
        ("short series", r"\b([A-Z]\d{3}/\d{2})\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const DATE: &str = r"(\d{2})([A-Z]{3})(\d{2})\s+(\d{2}):(\d{2})";

static DATE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"{DATE}\s*-\s*(?:(\d{{2}})([A-Z]{{3}})(\d{{2}})\s+(\d{{2}}):(\d{{2}})|(UFN|PERM))"
    ))
    .unwrap()
});
static DATE_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"{DATE}\s*-")).unwrap());
static B_FIELD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bB\)\s*(\d{10})").unwrap());
static C_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bC\)\s*(?:(\d{10})(?:\s*EST)?|(PERM|UFN))").unwrap());

static HEADER_AIRPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\d{2}[A-Z]{3}\d{2}\s+\d{2}:\d{2}\s*-\s*(?:\d{2}[A-Z]{3}\d{2}\s+\d{2}:\d{2}|UFN|PERM)\s+([A-Z]{4})\b",
    )
    .unwrap()
});
static NUMBER_AIRPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-Z]{4})\s+(?:AIRAC\s+)?(?:AIP\s+SUP\s+)?(?:COAD\d{2}|[A-Z]?\d{1,4})/\d{2}\b",
    )
    .unwrap()
});
static A_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bA\)\s*((?:[A-Z]{4}\b\s*)+)").unwrap());

static E_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bE\)\s*(.*?)(?:\s[A-Z]\)|CREATED:|$)").unwrap());
static D_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bD\)\s*(.*?)(?:\s[A-Z]\)|CREATED:|$)").unwrap());
static METADATA_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\s*(?:\bCREATED:|\bRMK:|\bSOURCE:|\bCOMMENT\)).*$").unwrap());
static HEADER_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z]{4}\s+(?:AIRAC\s+)?(?:AIP\s+SUP\s+)?[A-Z0-9]+/\d{2}\b").unwrap()
});
static NUMBERING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\.\s+").unwrap());

static Q_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Q\)\s*([A-Z]{4})/(Q[A-Z]{2,4})/([A-Z]{1,3})/([A-Z]{1,3})/([A-Z]{1,3})/(\d{3})/(\d{3})(?:/(\d{2})(\d{2})([NS])(\d{3})(\d{2})([EW])(\d{3}))?",
    )
    .unwrap()
});

const CRITICAL_KEYWORDS: [&str; 6] = [
    "CLOSED",
    "CLSD",
    "PROHIBITED",
    "NOT AVAILABLE",
    "EMERGENCY",
    "U/S",
];
const HIGH_KEYWORDS: [&str; 5] = ["RESTRICTED", "LIMITED", "CONSTRUCTION", "MAINTENANCE", "OBST"];
const MEDIUM_KEYWORDS: [&str; 3] = ["CAUTION", "ADVISORY", "TEMPORARY"];

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").to_string()
}

/// `24:00` is the end of the day.
fn utc_timestamp(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    if hour == 24 && minute == 0 {
        return Some(date.succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc());
    }
    Some(date.and_hms_opt(hour, minute, 0)?.and_utc())
}

/// `09JUL25 16:00` split into its captures.
fn header_timestamp(
    day: &str,
    month: &str,
    year: &str,
    hour: &str,
    minute: &str,
) -> Option<DateTime<Utc>> {
    let month = MONTHS.iter().position(|m| *m == month)? as u32 + 1;
    utc_timestamp(
        2000 + year.parse::<i32>().ok()?,
        month,
        day.parse().ok()?,
        hour.parse().ok()?,
        minute.parse().ok()?,
    )
}

/// `YYMMDDHHMM`
fn coded_timestamp(coded: &str) -> Option<DateTime<Utc>> {
    let field = |range: std::ops::Range<usize>| coded.get(range)?.parse::<u32>().ok();
    utc_timestamp(
        2000 + field(0..2)? as i32,
        field(2..4)?,
        field(4..6)?,
        field(6..8)?,
        field(8..10)?,
    )
}

pub fn extract_notam_number(block: &str) -> Option<String> {
    NOTAM_NUMBER_PATTERNS.iter().find_map(|(name, regex)| {
        regex.captures(block).map(|captures| {
            let number = collapse_whitespace(&captures[1]);
            debug!("NOTAM number {number} from {name} pattern");
            number
        })
    })
}

/// Location indicator of the aerodrome a block was filed for: the code after the validity
/// header, the code in front of the NOTAM number, the first `A)` location, then an aerodrome
/// named in the text.
pub fn extract_airport_code(block: &str) -> Option<String> {
    let from_header = HEADER_AIRPORT_RE
        .captures(block)
        .map(|captures| captures[1].to_string())
        .filter(|code| is_plausible_airport(code));

    from_header
        .or_else(|| {
            NUMBER_AIRPORT_RE
                .captures_iter(block)
                .map(|captures| captures[1].to_string())
                .find(|code| is_plausible_airport(code))
        })
        .or_else(|| a_field_locations(block).into_iter().next())
        .or_else(|| {
            let upper = block.to_uppercase();
            AIRPORT_NAMES
                .iter()
                .find(|(name, _)| upper.contains(name))
                .map(|(_, code)| (*code).to_string())
        })
}

fn a_field_locations(block: &str) -> Vec<String> {
    A_FIELD_RE
        .captures(block)
        .map(|captures| {
            captures[1]
                .split_whitespace()
                .filter(|code| is_plausible_airport(code))
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Validity from the `DDMMMYY HH:MM - DDMMMYY HH:MM|UFN|PERM` header, or else from the coded
/// `B)`/`C)` fields. Only one half present is an error, no validity at all is not.
pub fn parse_validity(block: &str) -> Result<Option<Validity>, ValidityError> {
    let invalid = |literal: &str| ValidityError::InvalidDate(literal.to_string());

    if let Some(captures) = DATE_RANGE_RE.captures(block) {
        let effective_time = header_timestamp(
            &captures[1],
            &captures[2],
            &captures[3],
            &captures[4],
            &captures[5],
        )
        .ok_or_else(|| invalid(&captures[0]))?;
        let expiry_time = match captures.get(11).map(|m| m.as_str()) {
            Some("UFN") => Expiry::Ufn,
            Some(_) => Expiry::Perm,
            None => Expiry::At(
                header_timestamp(
                    &captures[6],
                    &captures[7],
                    &captures[8],
                    &captures[9],
                    &captures[10],
                )
                .ok_or_else(|| invalid(&captures[0]))?,
            ),
        };

        return Ok(Some(Validity {
            effective_time,
            expiry_time,
        }));
    }

    let effective_time = if let Some(captures) = B_FIELD_RE.captures(block) {
        Some(coded_timestamp(&captures[1]).ok_or_else(|| invalid(&captures[1]))?)
    } else if let Some(captures) = DATE_START_RE.captures(block) {
        Some(
            header_timestamp(
                &captures[1],
                &captures[2],
                &captures[3],
                &captures[4],
                &captures[5],
            )
            .ok_or_else(|| invalid(&captures[0]))?,
        )
    } else {
        None
    };

    let expiry_time = match C_FIELD_RE.captures(block) {
        Some(captures) => Some(match (captures.get(1), captures.get(2)) {
            (Some(coded), _) => Expiry::At(
                coded_timestamp(coded.as_str()).ok_or_else(|| invalid(coded.as_str()))?,
            ),
            (None, Some(sentinel)) if sentinel.as_str() == "UFN" => Expiry::Ufn,
            _ => Expiry::Perm,
        }),
        None => None,
    };

    match (effective_time, expiry_time) {
        (Some(effective_time), Some(expiry_time)) => Ok(Some(Validity {
            effective_time,
            expiry_time,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ValidityError::MissingExpiry),
        (None, Some(_)) => Err(ValidityError::MissingEffective),
    }
}

/// The `E)` field up to the next lettered field or creation stamp, without remarks. Blocks
/// without `E)` fall back to everything but the header.
pub fn extract_body(block: &str) -> String {
    if let Some(captures) = E_FIELD_RE.captures(block) {
        return METADATA_TAIL_RE
            .replace(&captures[1], "")
            .trim()
            .to_string();
    }

    let without_header = DATE_RANGE_RE.replace(block, "");
    let without_id = HEADER_ID_RE.replace(&without_header, "");
    let without_numbering = NUMBERING_RE.replace(&without_id, "");
    collapse_whitespace(&METADATA_TAIL_RE.replace(&without_numbering, ""))
}

pub fn extract_time_band(block: &str) -> Option<String> {
    D_FIELD_RE
        .captures(block)
        .map(|captures| collapse_whitespace(&captures[1]))
        .filter(|band| !band.is_empty())
}

pub fn parse_q_line(block: &str) -> Option<QLine> {
    let captures = Q_LINE_RE.captures(block)?;
    let number = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<f64>().ok());

    let centre = match (number(8), number(9), number(11), number(12)) {
        (Some(lat_deg), Some(lat_min), Some(lng_deg), Some(lng_min)) => {
            let lat = lat_deg + lat_min / 60.0;
            let lng = lng_deg + lng_min / 60.0;
            let lng = if &captures[13] == "W" { -lng } else { lng };
            let lat = if &captures[10] == "S" { -lat } else { lat };
            Some(point! { x: lng, y: lat })
        }
        _ => None,
    };

    Some(QLine {
        fir: captures[1].to_string(),
        code: captures[2].to_string(),
        traffic: captures[3].to_string(),
        purpose: captures[4].to_string(),
        scope: captures[5].to_string(),
        lower: captures[6].parse().ok()?,
        upper: captures[7].parse().ok()?,
        centre,
        radius: number(14).map(Length::new::<nautical_mile>),
    })
}

impl Priority {
    pub fn from_text(text: &str) -> Self {
        let text = text.to_uppercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        if contains_any(&CRITICAL_KEYWORDS) {
            Priority::Critical
        } else if contains_any(&HIGH_KEYWORDS) {
            Priority::High
        } else if contains_any(&MEDIUM_KEYWORDS) {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl NotamRecord {
    /// Parses one segmented block. Blocks without a NOTAM number or with only half a validity
    /// window are logged and dropped.
    pub fn parse(block: &str) -> Option<Self> {
        let Some(notam_number) = extract_notam_number(block) else {
            warn!(
                "dropping block without NOTAM number: {:?}",
                block.lines().next().unwrap_or_default()
            );
            return None;
        };
        let validity = match parse_validity(block) {
            Ok(validity) => validity,
            Err(e) => {
                warn!("dropping NOTAM {notam_number}: {e}");
                return None;
            }
        };

        let airport_code =
            extract_airport_code(block).unwrap_or_else(|| UNKNOWN_AIRPORT.to_string());
        let airports = std::iter::once(airport_code.clone())
            .filter(|code| code != UNKNOWN_AIRPORT)
            .chain(a_field_locations(block))
            .unique()
            .collect();

        let q_line = parse_q_line(block);
        let body_text = extract_body(block);
        let category = category::classify(
            &body_text,
            q_line.as_ref().map(|q_line| q_line.code.as_str()),
            notam_number.contains("AIP SUP"),
        );

        Some(Self {
            priority: Priority::from_text(&body_text),
            time_band: extract_time_band(block),
            notam_number,
            airport_code,
            airports,
            validity,
            category,
            q_line,
            body_text,
            raw_text: block.to_string(),
            local_time_display: None,
        })
    }

    pub fn parse_all<'a>(blocks: impl IntoIterator<Item = &'a str>) -> Vec<Self> {
        blocks.into_iter().filter_map(Self::parse).collect()
    }
}
