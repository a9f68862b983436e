use itertools::Itertools as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::{is_icao_code, notam::parser::is_plausible_airport};

static DEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"DEP:\s*([A-Z]{4})\s+DEST:").unwrap());
static DEST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"DEST:\s*([A-Z]{4})\s+ALTN:").unwrap());
static ALTN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"ALTN:\s*([A-Z]{4})\b").unwrap());
static REFILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"REFILE:\s*((?:[A-Z]{4}(?:[ \t]+|$))+)").unwrap());
static EDTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"EDTO:\s*((?:[A-Z]{4}(?:[ \t]+|$))+)").unwrap());
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{4}\b").unwrap());

const HEADER_LABELS: [&str; 4] = ["DEST", "ALTN", "EDTO", "SECY"];

/// Flight plan airports from a package header such as `DEP: RKSI DEST: KSEA ALTN: KPDX SECY`.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct FlightInfo {
    pub dep: Option<String>,
    pub dest: Option<String>,
    pub altn: Option<String>,
    pub refile: Vec<String>,
    pub edto: Vec<String>,
    /// every airport-looking code of the bulletin, in order of first appearance
    pub all_airports: Vec<String>,
}

fn capture_code(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .map(|captures| captures[1].to_string())
        .filter(|code| is_icao_code(code))
}

fn capture_list(re: &Regex, lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .find_map(|line| re.captures(line))
        .map(|captures| {
            captures[1]
                .split_whitespace()
                .filter(|code| is_icao_code(code))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl FlightInfo {
    pub fn parse(bulletin: &str) -> Self {
        let lines = bulletin
            .lines()
            .map(|line| line.trim().to_uppercase())
            .collect::<Vec<_>>();
        let mut info = FlightInfo::default();

        // the third line of a package carries the header
        if let Some(line) = lines.get(2) {
            info.fill_route_airports(line);
        }
        if info.dep.is_none() || info.dest.is_none() {
            if let Some(line) = lines
                .iter()
                .find(|line| line.contains("DEP:") && line.contains("DEST:") && line.contains("ALTN:"))
            {
                info.fill_route_airports(line);
            }
        }

        info.refile = capture_list(&REFILE_RE, &lines);
        info.edto = capture_list(&EDTO_RE, &lines);
        info.all_airports = CODE_RE
            .find_iter(&bulletin.to_uppercase())
            .map(|code| code.as_str().to_string())
            .filter(|code| is_plausible_airport(code) && !HEADER_LABELS.contains(&code.as_str()))
            .unique()
            .collect();

        debug!(
            "flight info: DEP {:?} DEST {:?} ALTN {:?}",
            info.dep, info.dest, info.altn
        );
        info
    }

    fn fill_route_airports(&mut self, line: &str) {
        if self.dep.is_none() {
            self.dep = capture_code(&DEP_RE, line);
        }
        if self.dest.is_none() {
            self.dest = capture_code(&DEST_RE, line);
        }
        if self.altn.is_none() {
            self.altn = capture_code(&ALTN_RE, line);
        }
    }

    /// DEP, DEST, ALTN, REFILE and EDTO airports without repetitions.
    pub fn flight_airports(&self) -> Vec<&str> {
        [&self.dep, &self.dest, &self.altn]
            .into_iter()
            .flatten()
            .chain(self.refile.iter())
            .chain(self.edto.iter())
            .map(String::as_str)
            .unique()
            .collect()
    }
}
