use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    flight_info::FlightInfo,
    notam::{Category, NotamRecord, Priority},
};

/// Records whose validity overlaps `[from, to]`. `UFN` and `PERM` expiries are open-ended,
/// records without validity never match.
pub fn filter_by_date_range(
    records: &[NotamRecord],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<&NotamRecord> {
    records
        .iter()
        .filter(|record| {
            record
                .validity
                .is_some_and(|validity| validity.overlaps(from, to))
        })
        .collect()
}

fn concerns_airport(record: &NotamRecord, airport_code: &str) -> bool {
    record.airport_code == airport_code || record.airports.iter().any(|code| code == airport_code)
}

pub fn filter_by_airports<'r>(
    records: &'r [NotamRecord],
    airport_codes: &[&str],
) -> Vec<&'r NotamRecord> {
    records
        .iter()
        .filter(|record| {
            airport_codes
                .iter()
                .any(|airport_code| concerns_airport(record, airport_code))
        })
        .collect()
}

pub fn filter_by_categories<'r>(
    records: &'r [NotamRecord],
    categories: &[Category],
) -> Vec<&'r NotamRecord> {
    records
        .iter()
        .filter(|record| categories.contains(&record.category))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BriefingStatus {
    Critical,
    #[default]
    Normal,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AirportSummary {
    pub airport_code: String,
    pub total_notams: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub critical_notams: Vec<String>,
    pub status: BriefingStatus,
}

impl AirportSummary {
    pub fn summarize(airport_code: &str, records: &[NotamRecord]) -> Self {
        let airport_notams = filter_by_airports(records, &[airport_code]);

        let mut by_category = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for record in &airport_notams {
            *by_category.entry(record.category).or_default() += 1;
            *by_priority.entry(record.priority).or_default() += 1;
        }

        let critical_notams = airport_notams
            .iter()
            .filter(|record| record.priority == Priority::Critical)
            .map(|record| record.notam_number.clone())
            .collect::<Vec<_>>();
        let status = if critical_notams.is_empty() {
            BriefingStatus::Normal
        } else {
            BriefingStatus::Critical
        };

        Self {
            airport_code: airport_code.to_string(),
            total_notams: airport_notams.len(),
            by_category,
            by_priority,
            critical_notams,
            status,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RoleSummary {
    /// `DEP`, `DEST`, `ALTN`, `REFILE` or `EDTO`
    pub role: &'static str,
    #[serde(flatten)]
    pub summary: AirportSummary,
}

/// Airport summaries for every airport of a flight plan.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FlightBriefing {
    pub airports: Vec<RoleSummary>,
    pub total_notams: usize,
    /// roles with at least one critical NOTAM
    pub critical_airports: Vec<&'static str>,
    pub status: BriefingStatus,
}

impl FlightBriefing {
    pub fn build(flight: &FlightInfo, records: &[NotamRecord]) -> Self {
        let roles = [("DEP", &flight.dep), ("DEST", &flight.dest), ("ALTN", &flight.altn)]
            .into_iter()
            .filter_map(|(role, code)| code.as_deref().map(|code| (role, code)))
            .chain(flight.refile.iter().map(|code| ("REFILE", code.as_str())))
            .chain(flight.edto.iter().map(|code| ("EDTO", code.as_str())));

        let airports = roles
            .map(|(role, code)| RoleSummary {
                role,
                summary: AirportSummary::summarize(code, records),
            })
            .collect::<Vec<_>>();
        let critical_airports = airports
            .iter()
            .filter(|entry| entry.summary.status == BriefingStatus::Critical)
            .map(|entry| entry.role)
            .collect::<Vec<_>>();

        Self {
            total_notams: airports.iter().map(|entry| entry.summary.total_notams).sum(),
            status: if critical_airports.is_empty() {
                BriefingStatus::Normal
            } else {
                BriefingStatus::Critical
            },
            airports,
            critical_airports,
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use pretty_assertions_sorted::assert_eq_sorted;

    use crate::{
        flight_info::FlightInfo,
        notam::{Category, NotamRecord, Priority},
    };

    use super::{
        filter_by_airports, filter_by_categories, filter_by_date_range, AirportSummary,
        BriefingStatus, FlightBriefing,
    };

    fn records() -> Vec<NotamRecord> {
        NotamRecord::parse_all([
            "RKSI Z0582/25\nB) 2507091600 C) 2509250900\nE) RWY 15L/33R CLOSED DUE TO CONSTRUCTION",
            "RKSI A0100/25\nB) 2507010000 C) PERM\nE) TWY B WIP, CAUTION ADVISED",
            "KSEA A0200/25\nB) 2508010000 C) 2508020000\nE) APRON 5 STANDS 1-4 LIMITED",
            "KPDX A0300/25\nA) KPDX RKSI\nB) 2506010000 C) UFN\nE) DVOR PDX FREQ CHANGE",
        ])
    }

    fn numbers(records: &[&NotamRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| record.notam_number.clone())
            .collect()
    }

    #[test]
    fn test_filters() {
        let records = records();
        let day = |m, d| Utc.with_ymd_and_hms(2025, m, d, 0, 0, 0).unwrap();

        assert_eq!(
            numbers(&filter_by_date_range(&records, day(8, 3), day(8, 10))),
            vec!["Z0582/25", "A0100/25", "A0300/25"]
        );
        assert_eq!(
            numbers(&filter_by_date_range(&records, day(5, 1), day(5, 31))),
            Vec::<String>::new()
        );
        assert_eq!(
            numbers(&filter_by_airports(&records, &["RKSI"])),
            vec!["Z0582/25", "A0100/25", "A0300/25"]
        );
        assert_eq!(
            numbers(&filter_by_categories(&records, &[Category::Runway])),
            vec!["Z0582/25"]
        );
    }

    #[test]
    fn test_airport_summary() {
        let records = records();
        let summary = AirportSummary::summarize("RKSI", &records);

        assert_eq!(summary.total_notams, 3);
        assert_eq_sorted!(
            summary.by_priority,
            BTreeMap::from([
                (Priority::Low, 1),
                (Priority::Medium, 1),
                (Priority::Critical, 1),
            ])
        );
        assert_eq!(summary.critical_notams, vec!["Z0582/25"]);
        assert_eq!(summary.status, BriefingStatus::Critical);

        let quiet = AirportSummary::summarize("RJAA", &records);
        assert_eq!(quiet.total_notams, 0);
        assert_eq!(quiet.status, BriefingStatus::Normal);
        assert_eq!(
            serde_json::to_value(&quiet).unwrap()["status"],
            serde_json::json!("NORMAL")
        );
    }

    #[test]
    fn test_flight_briefing() {
        let records = records();
        let flight = FlightInfo::parse("PACKAGE 1\nKE0041\nDEP: RKSI DEST: KSEA ALTN: KPDX\n");
        let briefing = FlightBriefing::build(&flight, &records);

        assert_eq!(
            briefing
                .airports
                .iter()
                .map(|entry| (entry.role, entry.summary.total_notams))
                .collect::<Vec<_>>(),
            vec![("DEP", 3), ("DEST", 1), ("ALTN", 1)]
        );
        assert_eq!(briefing.total_notams, 5);
        assert_eq!(briefing.critical_airports, vec!["DEP"]);
        assert_eq!(briefing.status, BriefingStatus::Critical);
    }
}
