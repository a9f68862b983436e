use std::sync::OnceLock;

use from_pest::FromPest;
use geo::{point, Coord, Point};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::{DegMinSec, DegMinSecExt as _};

mod fixed_width {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "pest/coordinate.pest"]
    pub struct Parser;
}

pub use fixed_width::Rule;

pub mod ast {
    use pest::Span;
    use pest_ast::FromPest;

    use super::fixed_width::Rule;

    fn span_into_str(span: Span) -> &str {
        span.as_str()
    }

    fn span_into_string(span: Span) -> String {
        span.as_str().to_string()
    }

    #[derive(Debug, FromPest, Clone, PartialEq)]
    #[pest_ast(rule(Rule::coordinates))]
    pub struct Coordinates {
        pub coordinates: Vec<Coordinate>,
        _eoi: Eoi,
    }

    #[derive(Debug, FromPest, Clone, PartialEq)]
    #[pest_ast(rule(Rule::EOI))]
    struct Eoi;

    #[derive(Debug, FromPest, Clone, PartialEq)]
    #[pest_ast(rule(Rule::coordinate))]
    pub struct Coordinate {
        pub latitude: Latitude,
        pub longitude: Longitude,
    }

    #[derive(Debug, FromPest, Clone, PartialEq)]
    #[pest_ast(rule(Rule::latitude))]
    pub struct Latitude {
        #[pest_ast(inner(rule(Rule::lat_deg), with(span_into_str), with(str::parse), with(Result::unwrap)))]
        pub degrees: u16,
        #[pest_ast(inner(rule(Rule::minutes), with(span_into_str), with(str::parse), with(Result::unwrap)))]
        pub minutes: u8,
        #[pest_ast(inner(rule(Rule::seconds), with(span_into_str), with(str::parse), with(Result::unwrap)))]
        pub seconds: f64,
        #[pest_ast(inner(rule(Rule::lat_hemi), with(span_into_string)))]
        pub hemisphere: String,
    }

    #[derive(Debug, FromPest, Clone, PartialEq)]
    #[pest_ast(rule(Rule::longitude))]
    pub struct Longitude {
        #[pest_ast(inner(rule(Rule::lng_deg), with(span_into_str), with(str::parse), with(Result::unwrap)))]
        pub degrees: u16,
        #[pest_ast(inner(rule(Rule::minutes), with(span_into_str), with(str::parse), with(Result::unwrap)))]
        pub minutes: u8,
        #[pest_ast(inner(rule(Rule::seconds), with(span_into_str), with(str::parse), with(Result::unwrap)))]
        pub seconds: f64,
        #[pest_ast(inner(rule(Rule::lng_hemi), with(span_into_string)))]
        pub hemisphere: String,
    }
}

#[derive(Error, Debug)]
pub enum CoordinateError {
    #[error("failed to parse coordinate: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    #[error("coordinate out of range: {0}")]
    OutOfRange(String),
    #[error("expected a single coordinate in {literal:?}, found {found}")]
    Count { literal: String, found: usize },
}

pub type CoordinateResult<T> = Result<T, CoordinateError>;

fn checked_dms(
    degrees: u16,
    minutes: u8,
    seconds: f64,
    max_degrees: u16,
    negative: bool,
) -> Option<DegMinSec> {
    let in_range = minutes < 60
        && (0.0..60.0).contains(&seconds)
        && (degrees < max_degrees
            || (degrees == max_degrees && minutes == 0 && seconds == 0.0));
    in_range.then(|| {
        let degrees = f64::from(degrees);
        (if negative { -degrees } else { degrees }, minutes, seconds)
    })
}

impl ast::Coordinate {
    fn to_coord(&self, literal: &str) -> CoordinateResult<Coord> {
        let lat = &self.latitude;
        let lng = &self.longitude;
        // "N/S" and "W/E" resolve to the first hemisphere, they only occur on 0 and 180 degrees
        let lat_dms = checked_dms(lat.degrees, lat.minutes, lat.seconds, 90, lat.hemisphere == "S");
        let lng_dms = checked_dms(lng.degrees, lng.minutes, lng.seconds, 180, lng.hemisphere == "W");

        lat_dms
            .zip(lng_dms)
            .map(|(lat, lng)| Coord::from_deg_min_sec(lat, lng))
            .ok_or_else(|| CoordinateError::OutOfRange(literal.to_string()))
    }
}

/// Parses one or more fixed-width `DDMMSS[N|S] DDDMMSS[E|W]` pairs from a single line, as found in
/// FIR boundary descriptions. Seconds may carry a decimal fraction.
pub fn parse_coordinates(line: &str) -> CoordinateResult<Vec<Coord>> {
    use pest::Parser as _;

    let mut parse_tree =
        fixed_width::Parser::parse(Rule::coordinates, line.trim()).map_err(Box::new)?;
    let syntax_tree = ast::Coordinates::from_pest(&mut parse_tree).expect("infallible");

    syntax_tree
        .coordinates
        .iter()
        .map(|coordinate| coordinate.to_coord(line))
        .collect()
}

/// `"544009N 1700000E"` -> `Coord { x: 170.0, y: 54.669_166 }`
pub fn parse_coordinate(literal: &str) -> CoordinateResult<Coord> {
    let mut coords = parse_coordinates(literal)?;
    if coords.len() == 1 {
        Ok(coords.remove(0))
    } else {
        Err(CoordinateError::Count {
            literal: literal.to_string(),
            found: coords.len(),
        })
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub enum RouteToken {
    Coordinate { literal: String, point: Point },
    Airway(String),
    /// Named fix, four-letter airport codes included
    Waypoint(String),
    /// SID/STAR names, speed/level groups, DCT and everything else we do not interpret
    Other(String),
}

impl RouteToken {
    pub fn as_str(&self) -> &str {
        match self {
            RouteToken::Coordinate { literal, .. } => literal,
            RouteToken::Airway(token)
            | RouteToken::Waypoint(token)
            | RouteToken::Other(token) => token,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct ParsedRoute {
    pub full_route: String,
    pub tokens: Vec<RouteToken>,
}

impl ParsedRoute {
    pub fn coordinates(&self) -> Vec<Point> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                RouteToken::Coordinate { point, .. } => Some(*point),
                _ => None,
            })
            .collect()
    }

    pub fn waypoints(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                RouteToken::Waypoint(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn airways(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                RouteToken::Airway(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn others(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                RouteToken::Other(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn route_separator_regex() -> &'static Regex {
    static ROUTE_SEPARATOR_RE: OnceLock<Regex> = OnceLock::new();
    ROUTE_SEPARATOR_RE.get_or_init(|| Regex::new(r"\.\.+|\s+").unwrap())
}

// N44E160, S05.5W170.25
fn hemi_first_regex() -> &'static Regex {
    static HEMI_FIRST_RE: OnceLock<Regex> = OnceLock::new();
    HEMI_FIRST_RE.get_or_init(|| {
        Regex::new(r"^([NS])(\d{2}(?:\.\d+)?)([EW])(\d{3}(?:\.\d+)?)$").unwrap()
    })
}

// 44N160E
fn hemi_last_regex() -> &'static Regex {
    static HEMI_LAST_RE: OnceLock<Regex> = OnceLock::new();
    HEMI_LAST_RE.get_or_init(|| {
        Regex::new(r"^(\d{2}(?:\.\d+)?)([NS])(\d{3}(?:\.\d+)?)([EW])$").unwrap()
    })
}

// 4430N16015E, degrees and minutes as filed in ICAO flight plans
fn deg_min_regex() -> &'static Regex {
    static DEG_MIN_RE: OnceLock<Regex> = OnceLock::new();
    DEG_MIN_RE
        .get_or_init(|| Regex::new(r"^(\d{2})(\d{2})([NS])(\d{3})(\d{2})([EW])$").unwrap())
}

fn airway_regex() -> &'static Regex {
    static AIRWAY_RE: OnceLock<Regex> = OnceLock::new();
    AIRWAY_RE.get_or_init(|| Regex::new(r"^[A-Z]\d{3}$").unwrap())
}

fn waypoint_regex() -> &'static Regex {
    static WAYPOINT_RE: OnceLock<Regex> = OnceLock::new();
    WAYPOINT_RE.get_or_init(|| Regex::new(r"^[A-Z]{3,5}$").unwrap())
}

fn signed(value: f64, hemisphere: &str) -> f64 {
    match hemisphere {
        "S" | "W" => -value,
        _ => value,
    }
}

/// Parses a route coordinate token in one of the forms `N44E160`, `44N160E` or `4430N16015E`.
pub fn parse_route_coordinate(token: &str) -> Option<Point> {
    let in_range = |lat: f64, lng: f64| lat.abs() <= 90.0 && lng.abs() <= 180.0;

    if let Some(captures) = hemi_first_regex().captures(token) {
        let lat = signed(captures[2].parse().ok()?, &captures[1]);
        let lng = signed(captures[4].parse().ok()?, &captures[3]);
        return in_range(lat, lng).then(|| point! { x: lng, y: lat });
    }
    if let Some(captures) = hemi_last_regex().captures(token) {
        let lat = signed(captures[1].parse().ok()?, &captures[2]);
        let lng = signed(captures[3].parse().ok()?, &captures[4]);
        return in_range(lat, lng).then(|| point! { x: lng, y: lat });
    }
    if let Some(captures) = deg_min_regex().captures(token) {
        let lat_min: f64 = captures[2].parse().ok()?;
        let lng_min: f64 = captures[5].parse().ok()?;
        if lat_min >= 60.0 || lng_min >= 60.0 {
            return None;
        }
        let lat = signed(captures[1].parse::<f64>().ok()? + lat_min / 60.0, &captures[3]);
        let lng = signed(captures[4].parse::<f64>().ok()? + lng_min / 60.0, &captures[6]);
        return in_range(lat, lng).then(|| point! { x: lng, y: lat });
    }

    None
}

fn classify_token(token: &str) -> RouteToken {
    if let Some(point) = parse_route_coordinate(token) {
        RouteToken::Coordinate {
            literal: token.to_string(),
            point,
        }
    } else if airway_regex().is_match(token) {
        RouteToken::Airway(token.to_string())
    } else if waypoint_regex().is_match(token) {
        RouteToken::Waypoint(token.to_string())
    } else {
        RouteToken::Other(token.to_string())
    }
}

/// Splits a route on `..` and whitespace and classifies every token. Tokens are never dropped,
/// anything unrecognised ends up as [`RouteToken::Other`].
pub fn parse_route(route: &str) -> ParsedRoute {
    let full_route = route.trim().to_uppercase();
    let tokens = route_separator_regex()
        .split(&full_route)
        .filter(|token| !token.is_empty())
        .map(classify_token)
        .collect();

    ParsedRoute { full_route, tokens }
}
