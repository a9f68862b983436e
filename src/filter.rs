use std::{collections::HashMap, fmt::Display};

use itertools::Itertools as _;
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::{
    fir::route::{FirSource, RouteAnalysis},
    notam::{parser::is_plausible_airport, NotamRecord},
};

/// Airports whose FIR differs from what their ICAO prefix suggests.
static AIRPORT_FIR_OVERRIDES: phf::Map<&'static str, &'static str> = phf_map! {
    "RKSI" => "RJJJ",
    "KSEA" => "PAZA",
    "KPDX" => "PAZA",
};

/// Checked in order, the first FIR listing a prefix wins.
const FIR_AIRPORT_PREFIXES: [(&str, &[&str]); 5] = [
    ("PAZA", &["PA", "KZ"]),
    ("KZAK", &["KZ"]),
    ("NZZO", &["NZ"]),
    ("AYPM", &["AY"]),
    ("RJJJ", &["RJ", "RK"]),
];

const REPORT_LIMIT: usize = 5;

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{4}\b").unwrap());
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9]+").unwrap());

fn dedup_key(record: &NotamRecord) -> (String, Vec<String>) {
    (record.notam_number.clone(), record.airports.clone())
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FirNotams {
    pub fir_code: String,
    pub notams: Vec<NotamRecord>,
}

/// NOTAMs relevant to a route, grouped by traversed FIR and by waypoint mention.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FirNotamAnalysis {
    pub route: RouteAnalysis,
    /// one entry per traversed FIR, in traversal order
    pub fir_notams: Vec<FirNotams>,
    pub waypoint_notams: Vec<NotamRecord>,
    pub total_relevant_notams: usize,
}

impl FirNotamAnalysis {
    pub fn notams_for(&self, fir_code: &str) -> &[NotamRecord] {
        self.fir_notams
            .iter()
            .find(|entry| entry.fir_code == fir_code)
            .map(|entry| entry.notams.as_slice())
            .unwrap_or_default()
    }

    /// Every relevant record once, FIR matches first.
    pub fn relevant_notams(&self) -> Vec<&NotamRecord> {
        self.fir_notams
            .iter()
            .flat_map(|entry| entry.notams.iter())
            .chain(self.waypoint_notams.iter())
            .unique_by(|record| dedup_key(record))
            .collect()
    }
}

fn write_notam_list(
    f: &mut std::fmt::Formatter<'_>,
    notams: &[NotamRecord],
) -> std::fmt::Result {
    for record in notams.iter().take(REPORT_LIMIT) {
        writeln!(f, "- {} {}", record.airport_code, record.notam_number)?;
    }
    if notams.len() > REPORT_LIMIT {
        writeln!(f, "- ... and {} more", notams.len() - REPORT_LIMIT)?;
    }
    Ok(())
}

impl Display for FirNotamAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let waypoints = &self.route.waypoints;
        writeln!(f, "FIR NOTAM analysis")?;
        writeln!(
            f,
            "Route: {} coordinates, {} waypoints",
            self.route.route.coordinates().len(),
            self.route.route.waypoints().len()
        )?;

        if !self.route.traversed_firs.is_empty() {
            writeln!(f, "\nTraversed FIRs")?;
            for fir_code in &self.route.traversed_firs {
                let segments = self
                    .route
                    .segments
                    .iter()
                    .filter(|segment| segment.fir_code.as_ref() == Some(fir_code))
                    .count();
                writeln!(f, "- {fir_code}: {segments} segment(s)")?;
            }
        }

        for entry in &self.fir_notams {
            writeln!(f, "\n{} FIR ({} NOTAMs)", entry.fir_code, entry.notams.len())?;
            write_notam_list(f, &entry.notams)?;
        }

        if !self.waypoint_notams.is_empty() {
            writeln!(f, "\nWaypoint NOTAMs ({})", self.waypoint_notams.len())?;
            write_notam_list(f, &self.waypoint_notams)?;
        }

        if !waypoints.waypoint_firs.is_empty() {
            writeln!(f, "\nWaypoint FIRs")?;
            for entry in &waypoints.waypoint_firs {
                match entry.source {
                    FirSource::Boundary => writeln!(f, "- {}: {}", entry.waypoint, entry.fir_code)?,
                    FirSource::Estimate => {
                        writeln!(f, "- {}: {} (estimated)", entry.waypoint, entry.fir_code)?;
                    }
                }
            }
        }
        if !waypoints.unknown_waypoints.is_empty() {
            writeln!(
                f,
                "Unknown waypoints: {}",
                waypoints.unknown_waypoints.join(", ")
            )?;
        }

        writeln!(f, "\nSummary")?;
        writeln!(f, "- relevant NOTAMs: {}", self.total_relevant_notams)?;
        writeln!(f, "- traversed FIRs: {}", self.route.traversed_firs.len())?;
        write!(
            f,
            "- coordinates: {}",
            self.route.route.coordinates().len()
        )
    }
}

/// Matches NOTAMs to the FIRs and waypoints of an analysed route.
#[derive(Clone, Debug)]
pub struct FirNotamFilter {
    overrides: HashMap<String, String>,
}

impl Default for FirNotamFilter {
    fn default() -> Self {
        Self {
            overrides: AIRPORT_FIR_OVERRIDES
                .entries()
                .map(|(airport, fir)| ((*airport).to_string(), (*fir).to_string()))
                .collect(),
        }
    }
}

impl FirNotamFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, airport_code: &str, fir_code: &str) -> Self {
        self.overrides
            .insert(airport_code.to_string(), fir_code.to_string());
        self
    }

    /// Override table first, then the ICAO prefix table.
    pub fn airport_fir<'s>(&'s self, airport_code: &str) -> Option<&'s str> {
        if let Some(fir_code) = self.overrides.get(airport_code) {
            return Some(fir_code.as_str());
        }
        let prefix = airport_code.get(..2)?;
        FIR_AIRPORT_PREFIXES
            .iter()
            .find(|(_, prefixes)| prefixes.contains(&prefix))
            .map(|(fir_code, _)| *fir_code)
    }

    /// Record airports plus codes mentioned in the body that map to a known FIR.
    pub fn record_airports<'r>(&self, record: &'r NotamRecord) -> Vec<&'r str> {
        record
            .airports
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(record.airport_code.as_str()))
            .filter(|code| self.airport_fir(code).is_some())
            .chain(
                CODE_RE
                    .find_iter(&record.body_text)
                    .map(|code| code.as_str())
                    .filter(|code| is_plausible_airport(code) && self.airport_fir(code).is_some()),
            )
            .unique()
            .collect()
    }

    fn record_firs<'s>(&'s self, record: &NotamRecord) -> Vec<&'s str> {
        self.record_airports(record)
            .into_iter()
            .filter_map(|code| self.airport_fir(code))
            .unique()
            .collect()
    }

    pub fn is_relevant_to_firs(&self, record: &NotamRecord, fir_codes: &[&str]) -> bool {
        record
            .q_line
            .as_ref()
            .is_some_and(|q_line| fir_codes.contains(&q_line.fir.as_str()))
            || self
                .record_firs(record)
                .iter()
                .any(|fir_code| fir_codes.contains(fir_code))
    }

    /// Records relevant to any of `fir_codes`, each `(notam_number, airports)` once.
    pub fn filter_by_fir(&self, records: &[NotamRecord], fir_codes: &[&str]) -> Vec<NotamRecord> {
        records
            .iter()
            .filter(|record| self.is_relevant_to_firs(record, fir_codes))
            .unique_by(|record| dedup_key(record))
            .cloned()
            .collect()
    }

    /// Literal whole-word mention of a waypoint in the body, or, failing that, an airport in a FIR
    /// that was only estimated for one of the waypoints.
    pub fn filter_by_waypoints(
        &self,
        records: &[NotamRecord],
        waypoints: &[&str],
        estimated_firs: &[&str],
    ) -> Vec<NotamRecord> {
        let waypoints = waypoints
            .iter()
            .map(|waypoint| waypoint.to_uppercase())
            .collect::<Vec<_>>();

        records
            .iter()
            .filter(|record| {
                let body = record.body_text.to_uppercase();
                let mentioned = TOKEN_RE
                    .find_iter(&body)
                    .any(|token| waypoints.iter().any(|waypoint| waypoint == token.as_str()));
                mentioned
                    || self
                        .record_firs(record)
                        .iter()
                        .any(|fir_code| estimated_firs.contains(fir_code))
            })
            .unique_by(|record| dedup_key(record))
            .cloned()
            .collect()
    }

    pub fn analyze(&self, route: RouteAnalysis, records: &[NotamRecord]) -> FirNotamAnalysis {
        let fir_notams = route
            .traversed_firs
            .iter()
            .map(|fir_code| FirNotams {
                fir_code: fir_code.clone(),
                notams: self.filter_by_fir(records, &[fir_code.as_str()]),
            })
            .collect::<Vec<_>>();

        let waypoint_notams = self.filter_by_waypoints(
            records,
            &route.route.waypoints(),
            &route.waypoints.estimated_firs(),
        );

        let total_relevant_notams = fir_notams
            .iter()
            .flat_map(|entry| entry.notams.iter())
            .chain(waypoint_notams.iter())
            .unique_by(|record| dedup_key(record))
            .count();
        debug!(
            "{total_relevant_notams} of {} NOTAMs relevant to {:?}",
            records.len(),
            route.traversed_firs
        );

        FirNotamAnalysis {
            route,
            fir_notams,
            waypoint_notams,
            total_relevant_notams,
        }
    }
}
