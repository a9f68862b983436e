use std::{
    collections::HashMap,
    io,
    path::Path,
    sync::RwLock,
};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc, Weekday};
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Error, Debug)]
pub enum TimeZoneError {
    #[error("failed to read time zone csv: {0}")]
    FileRead(#[from] io::Error),
    #[error("failed to parse time zone csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("live time zone lookup failed for {airport_code}: {reason}")]
    Lookup {
        airport_code: String,
        reason: String,
    },
}

pub type TimeZoneResult<T> = Result<T, TimeZoneError>;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DstRegion {
    /// second Sunday of March to first Sunday of November
    NorthAmerica,
    /// last Sunday of March to last Sunday of October
    Europe,
    /// first Sunday of October to first Sunday of April
    SouthernAustralia,
}

fn nth_sunday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n)
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    nth_sunday(year, month, 5).or_else(|| nth_sunday(year, month, 4))
}

impl DstRegion {
    /// Whether summer time is in effect on the UTC date of `at`.
    pub fn is_dst(&self, at: DateTime<Utc>) -> bool {
        let date = at.date_naive();
        let year = date.year();
        match self {
            DstRegion::NorthAmerica => nth_sunday(year, 3, 2)
                .zip(nth_sunday(year, 11, 1))
                .is_some_and(|(start, end)| date >= start && date < end),
            DstRegion::Europe => last_sunday(year, 3)
                .zip(last_sunday(year, 10))
                .is_some_and(|(start, end)| date >= start && date < end),
            DstRegion::SouthernAustralia => nth_sunday(year, 10, 1)
                .zip(nth_sunday(year, 4, 1))
                .is_some_and(|(start, end)| date >= start || date < end),
        }
    }
}

/// UTC offset of an airport, in minutes east of UTC.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum ZoneRule {
    Fixed(i32),
    Seasonal {
        standard: i32,
        daylight: i32,
        region: DstRegion,
    },
}

impl ZoneRule {
    /// `(offset, dst_applied)` at the given instant.
    pub fn offset_at(&self, at: DateTime<Utc>) -> (i32, bool) {
        match self {
            ZoneRule::Fixed(offset) => (*offset, false),
            ZoneRule::Seasonal {
                standard,
                daylight,
                region,
            } => {
                if region.is_dst(at) {
                    (*daylight, true)
                } else {
                    (*standard, false)
                }
            }
        }
    }
}

const fn hours(h: i32) -> i32 {
    h * 60
}

const fn seasonal(daylight: i32, standard: i32, region: DstRegion) -> ZoneRule {
    ZoneRule::Seasonal {
        standard,
        daylight,
        region,
    }
}

/// Regions by the first two letters of the ICAO code.
static REGION_RULES: phf::Map<&'static str, ZoneRule> = phf_map! {
    "RK" => ZoneRule::Fixed(hours(9)),
    "RJ" => ZoneRule::Fixed(hours(9)),
    "RO" => ZoneRule::Fixed(hours(9)),
    "RC" => ZoneRule::Fixed(hours(8)),
    "RP" => ZoneRule::Fixed(hours(8)),
    "ZB" => ZoneRule::Fixed(hours(8)),
    "ZS" => ZoneRule::Fixed(hours(8)),
    "ZG" => ZoneRule::Fixed(hours(8)),
    "ZU" => ZoneRule::Fixed(hours(8)),
    "ZY" => ZoneRule::Fixed(hours(8)),
    "ZW" => ZoneRule::Fixed(hours(8)),
    "ZL" => ZoneRule::Fixed(hours(8)),
    "VH" => ZoneRule::Fixed(hours(8)),
    "VT" => ZoneRule::Fixed(hours(7)),
    "VV" => ZoneRule::Fixed(hours(7)),
    "VM" => ZoneRule::Fixed(hours(8)),
    "WI" => ZoneRule::Fixed(hours(7)),
    "WA" => ZoneRule::Fixed(hours(8)),
    "WB" => ZoneRule::Fixed(hours(9)),
    "WS" => ZoneRule::Fixed(hours(8)),
    "PH" => ZoneRule::Fixed(hours(-10)),
    "YP" => ZoneRule::Fixed(hours(8)),
    "OM" => ZoneRule::Fixed(hours(4)),
    "OE" => ZoneRule::Fixed(hours(3)),
    "LT" => ZoneRule::Fixed(hours(3)),
    "UR" => ZoneRule::Fixed(hours(3)),
    "UH" => ZoneRule::Fixed(hours(8)),
    "KS" => seasonal(hours(-7), hours(-8), DstRegion::NorthAmerica),
    "KL" => seasonal(hours(-7), hours(-8), DstRegion::NorthAmerica),
    "KD" => seasonal(hours(-6), hours(-7), DstRegion::NorthAmerica),
    "KC" => seasonal(hours(-5), hours(-6), DstRegion::NorthAmerica),
    "KN" => seasonal(hours(-4), hours(-5), DstRegion::NorthAmerica),
    "KJ" => seasonal(hours(-4), hours(-5), DstRegion::NorthAmerica),
    "KE" => seasonal(hours(-4), hours(-5), DstRegion::NorthAmerica),
    "KM" => seasonal(hours(-8), hours(-9), DstRegion::NorthAmerica),
    "CY" => seasonal(hours(-4), hours(-5), DstRegion::NorthAmerica),
    "CZ" => seasonal(hours(-7), hours(-8), DstRegion::NorthAmerica),
    "EG" => seasonal(hours(1), hours(0), DstRegion::Europe),
    "ED" => seasonal(hours(2), hours(1), DstRegion::Europe),
    "EF" => seasonal(hours(2), hours(1), DstRegion::Europe),
    "LF" => seasonal(hours(2), hours(1), DstRegion::Europe),
    "LE" => seasonal(hours(2), hours(1), DstRegion::Europe),
    "LI" => seasonal(hours(2), hours(1), DstRegion::Europe),
    "YS" => seasonal(hours(11), hours(10), DstRegion::SouthernAustralia),
    "YC" => seasonal(hours(10) + 30, hours(9) + 30, DstRegion::SouthernAustralia),
};

/// Last resort by ICAO region letter, never seasonal.
static LETTER_OFFSETS: phf::Map<char, i32> = phf_map! {
    'A' => hours(2),
    'B' => hours(3),
    'C' => hours(4),
    'D' => hours(5),
    'E' => hours(6),
    'F' => hours(7),
    'G' => hours(8),
    'H' => hours(9),
    'I' => hours(10),
    'J' => hours(11),
    'K' => hours(-5),
    'L' => hours(1),
    'M' => hours(12),
    'N' => hours(12),
    'O' => hours(3),
    'P' => hours(-9),
    'R' => hours(9),
    'S' => hours(-3),
    'T' => hours(-4),
    'U' => hours(3),
    'V' => hours(5),
    'W' => hours(7),
    'Y' => hours(10),
    'Z' => hours(8),
};

static CSV_OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:UTC|GMT)?\s*(?:([+-])(\d{1,2})(?:([.:])(\d+))?)?$").unwrap());

/// `UTC+9`, `UTC+10.5`, `UTC-3:30`, `+05:45` or `UTC` as minutes east of UTC.
pub fn parse_utc_offset(value: &str) -> Option<i32> {
    let captures = CSV_OFFSET_RE.captures(value.trim())?;
    let Some(sign) = captures.get(1) else {
        return Some(0);
    };
    let hours: i32 = captures[2].parse().ok()?;
    let minutes = match (captures.get(3).map(|m| m.as_str()), captures.get(4)) {
        (Some("."), Some(fraction)) => {
            (format!("0.{}", fraction.as_str()).parse::<f64>().ok()? * 60.0).round() as i32
        }
        (Some(":"), Some(minutes)) => minutes.as_str().parse().ok()?,
        _ => 0,
    };
    if hours > 14 || minutes >= 60 {
        return None;
    }

    let total = hours * 60 + minutes;
    Some(if sign.as_str() == "-" { -total } else { total })
}

/// `+09:00`, `-03:30`
pub fn format_utc_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSource {
    Live,
    Region,
    Csv,
    RegionLetter,
    Default,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AirportTimeZone {
    pub airport_code: String,
    /// `+09:00` form
    pub utc_offset: String,
    pub offset_minutes: i32,
    pub dst_applied: bool,
    pub source: ZoneSource,
}

impl AirportTimeZone {
    pub fn fixed_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.offset_minutes * 60).unwrap_or(Utc.fix())
    }
}

/// Optional online source of airport offsets. Failures are logged and the offline tables are
/// used instead.
pub trait LiveTimeZoneLookup: Send + Sync {
    /// Minutes east of UTC.
    fn lookup(&self, airport_code: &str) -> TimeZoneResult<i32>;
}

#[derive(Debug, Deserialize)]
struct AirportRow {
    ident: String,
    time_zone: String,
}

/// Resolves airport codes to UTC offsets and remembers the rule per airport.
#[derive(Default)]
pub struct TimeZoneResolver {
    live: Option<Box<dyn LiveTimeZoneLookup>>,
    csv_offsets: HashMap<String, i32>,
    cache: RwLock<HashMap<String, (ZoneRule, ZoneSource)>>,
}

impl TimeZoneResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_live_lookup(mut self, live: Box<dyn LiveTimeZoneLookup>) -> Self {
        self.live = Some(live);
        self
    }

    /// Loads an airport table with `ident` and `time_zone` columns. Rows with an unreadable
    /// offset are skipped.
    pub fn with_csv(mut self, content: &[u8]) -> TimeZoneResult<Self> {
        let mut reader = csv::Reader::from_reader(content);
        for row in reader.deserialize::<AirportRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("skipping time zone csv row: {e}");
                    continue;
                }
            };
            match parse_utc_offset(&row.time_zone) {
                Some(offset) => {
                    self.csv_offsets.insert(row.ident.trim().to_uppercase(), offset);
                }
                None => trace!("{}: unreadable time zone {:?}", row.ident, row.time_zone),
            }
        }
        debug!("loaded {} airport time zones", self.csv_offsets.len());

        Ok(self)
    }

    pub fn with_csv_file(self, path: &Path) -> TimeZoneResult<Self> {
        let content = fs_err::read(path)?;
        self.with_csv(&content)
    }

    pub fn csv_len(&self) -> usize {
        self.csv_offsets.len()
    }

    fn rule_for(&self, airport_code: &str) -> (ZoneRule, ZoneSource) {
        if let Some(live) = &self.live {
            match live.lookup(airport_code) {
                Ok(offset) => return (ZoneRule::Fixed(offset), ZoneSource::Live),
                Err(e) => debug!("ignoring live lookup failure: {e}"),
            }
        }

        if let Some(rule) = airport_code.get(..2).and_then(|prefix| REGION_RULES.get(prefix)) {
            return (*rule, ZoneSource::Region);
        }
        if let Some(offset) = self.csv_offsets.get(airport_code) {
            return (ZoneRule::Fixed(*offset), ZoneSource::Csv);
        }
        if let Some(offset) = airport_code
            .chars()
            .next()
            .and_then(|letter| LETTER_OFFSETS.get(&letter))
        {
            return (ZoneRule::Fixed(*offset), ZoneSource::RegionLetter);
        }

        (ZoneRule::Fixed(0), ZoneSource::Default)
    }

    fn cached_rule(&self, airport_code: &str) -> (ZoneRule, ZoneSource) {
        if let Some(cached) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(airport_code).copied())
        {
            return cached;
        }

        let resolved = self.rule_for(airport_code);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(airport_code.to_string(), resolved);
        }
        resolved
    }

    /// Offset of `airport_code` at the instant `at`. Seasonal regions are evaluated on the UTC
    /// date of `at`.
    pub fn resolve(&self, airport_code: &str, at: DateTime<Utc>) -> AirportTimeZone {
        let airport_code = airport_code.trim().to_uppercase();
        let (rule, source) = self.cached_rule(&airport_code);
        let (offset_minutes, dst_applied) = rule.offset_at(at);

        AirportTimeZone {
            utc_offset: format_utc_offset(offset_minutes),
            airport_code,
            offset_minutes,
            dst_applied,
            source,
        }
    }

    pub fn cached_airports(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or_default()
    }
}
