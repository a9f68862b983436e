use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Runway,
    Taxiway,
    Apron,
    Light,
    Approach,
    Departure,
    Gps,
    Obstruction,
    Navaid,
    Communication,
    Airway,
    Airspace,
    Aip,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Runway,
        Category::Taxiway,
        Category::Apron,
        Category::Light,
        Category::Approach,
        Category::Departure,
        Category::Gps,
        Category::Obstruction,
        Category::Navaid,
        Category::Communication,
        Category::Airway,
        Category::Airspace,
        Category::Aip,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Runway => "RUNWAY",
            Category::Taxiway => "TAXIWAY",
            Category::Apron => "APRON",
            Category::Light => "LIGHT",
            Category::Approach => "APPROACH",
            Category::Departure => "DEPARTURE",
            Category::Gps => "GPS",
            Category::Obstruction => "OBSTRUCTION",
            Category::Navaid => "NAVAID",
            Category::Communication => "COMMUNICATION",
            Category::Airway => "AIRWAY",
            Category::Airspace => "AIRSPACE",
            Category::Aip => "AIP",
            Category::Other => "OTHER",
        }
    }

    /// Category implied by a NOTAM Q-code, `QMRLC` -> runway.
    pub fn from_q_code(q_code: &str) -> Option<Self> {
        let subject = q_code.strip_prefix('Q')?;
        let category = match subject.get(..2)? {
            "MR" => Category::Runway,
            "MX" => Category::Taxiway,
            "MA" | "MN" | "MP" => Category::Apron,
            "PD" => Category::Departure,
            "AR" => Category::Airway,
            _ => match subject.get(..1)? {
                "L" => Category::Light,
                "I" | "P" => Category::Approach,
                "G" => Category::Gps,
                "N" => Category::Navaid,
                "C" | "S" => Category::Communication,
                "A" | "R" => Category::Airspace,
                "O" => Category::Obstruction,
                _ => return None,
            },
        };

        Some(category)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-word keywords and their weight. Facility specific words outweigh generic ones.
const CATEGORY_KEYWORDS: [(Category, &[(&str, u32)]); 12] = [
    (
        Category::Runway,
        &[
            ("RWY", 2),
            ("RUNWAY", 2),
            ("RWYS", 2),
            ("THR", 1),
            ("THRESHOLD", 1),
            ("TORA", 1),
            ("TODA", 1),
            ("LDA", 1),
        ],
    ),
    (
        Category::Taxiway,
        &[("TWY", 2), ("TAXIWAY", 2), ("TWYS", 2), ("TAXILANE", 2)],
    ),
    (
        Category::Apron,
        &[
            ("APRON", 2),
            ("RAMP", 2),
            ("STAND", 2),
            ("STANDS", 2),
            ("SPOT", 1),
            ("PARKING", 1),
            ("GATE", 3),
            ("DOCKING", 3),
        ],
    ),
    (
        Category::Light,
        &[
            ("LGT", 2),
            ("LIGHT", 2),
            ("LIGHTS", 2),
            ("LIGHTING", 2),
            ("PAPI", 3),
            ("VASIS", 3),
            ("ALS", 2),
            ("RCLL", 2),
            ("REDL", 2),
            ("TDZ", 1),
        ],
    ),
    (
        Category::Approach,
        &[
            ("APCH", 2),
            ("APPROACH", 2),
            ("ILS", 2),
            ("LOC", 2),
            ("IAP", 2),
            ("MDA", 2),
            ("GP", 1),
            ("RNAV", 1),
            ("RNP", 1),
            ("MINIMA", 1),
        ],
    ),
    (
        Category::Departure,
        &[
            ("SID", 2),
            ("DEPARTURE", 2),
            ("TKOF", 2),
            ("TAKEOFF", 2),
            ("DEP", 1),
            ("CLIMB", 1),
        ],
    ),
    (
        Category::Gps,
        &[
            ("GPS", 3),
            ("GNSS", 3),
            ("RAIM", 3),
            ("SBAS", 2),
            ("WAAS", 2),
        ],
    ),
    (
        Category::Obstruction,
        &[
            ("OBST", 3),
            ("OBSTACLE", 3),
            ("OBSTACLES", 3),
            ("OBSTRUCTION", 3),
            ("CRANE", 3),
            ("CRANES", 3),
        ],
    ),
    (
        Category::Navaid,
        &[
            ("VOR", 2),
            ("DVOR", 2),
            ("DME", 2),
            ("NDB", 2),
            ("TACAN", 2),
            ("VORTAC", 2),
            ("NAVAID", 2),
        ],
    ),
    (
        Category::Communication,
        &[
            ("FREQ", 2),
            ("FREQUENCY", 2),
            ("ATIS", 2),
            ("CPDLC", 2),
            ("MHZ", 1),
            ("KHZ", 1),
            ("VHF", 1),
            ("HF", 1),
            ("RADIO", 1),
        ],
    ),
    (
        Category::Airway,
        &[("AWY", 2), ("AIRWAY", 2), ("ATS", 1), ("RTE", 1), ("ROUTE", 1)],
    ),
    (
        Category::Airspace,
        &[
            ("AIRSPACE", 2),
            ("TFR", 2),
            ("DANGER", 2),
            ("CTR", 1),
            ("TMA", 1),
            ("FIR", 1),
            ("PROHIBITED", 1),
            ("RESTRICTED", 1),
            ("MIL", 1),
        ],
    ),
];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9]+").unwrap());

/// Keyword score per category, in table order.
pub fn keyword_scores(text: &str) -> Vec<(Category, u32)> {
    let text = text.to_uppercase();
    let words = WORD_RE
        .find_iter(&text)
        .map(|word| word.as_str())
        .collect::<Vec<_>>();

    CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            let score = words
                .iter()
                .filter_map(|word| {
                    keywords
                        .iter()
                        .find(|(keyword, _)| keyword == word)
                        .map(|(_, weight)| weight)
                })
                .sum::<u32>();
            (*category, score)
        })
        .collect()
}

/// Q-code wins outright, then an AIP supplement number, then the best keyword score. Ties go
/// to the category listed first.
pub fn classify(body: &str, q_code: Option<&str>, aip_supplement: bool) -> Category {
    if let Some(category) = q_code.and_then(Category::from_q_code) {
        return category;
    }
    if aip_supplement {
        return Category::Aip;
    }

    keyword_scores(body)
        .into_iter()
        .fold((Category::Other, 0), |best, (category, score)| {
            if score > best.1 {
                (category, score)
            } else {
                best
            }
        })
        .0
}

#[cfg(test)]
mod test {
    use super::{classify, keyword_scores, Category};

    #[test]
    fn test_q_code() {
        assert_eq!(Category::from_q_code("QMRLC"), Some(Category::Runway));
        assert_eq!(Category::from_q_code("QMXLC"), Some(Category::Taxiway));
        assert_eq!(Category::from_q_code("QMNHW"), Some(Category::Apron));
        assert_eq!(Category::from_q_code("QLRAS"), Some(Category::Light));
        assert_eq!(Category::from_q_code("QPDCH"), Some(Category::Departure));
        assert_eq!(Category::from_q_code("QPICH"), Some(Category::Approach));
        assert_eq!(Category::from_q_code("QARLC"), Some(Category::Airway));
        assert_eq!(Category::from_q_code("QRTCA"), Some(Category::Airspace));
        assert_eq!(Category::from_q_code("QOBCE"), Some(Category::Obstruction));
        assert_eq!(Category::from_q_code("QMDXX"), None);
        assert_eq!(Category::from_q_code("XMRLC"), None);
        assert_eq!(Category::from_q_code("Q"), None);
    }

    #[test]
    fn test_keyword_scoring() {
        assert_eq!(
            classify("RWY 15L/33R CLOSED DUE TO MAINT", None, false),
            Category::Runway
        );
        // GATE outweighs a single TWY mention
        assert_eq!(
            classify("GATE 23 CLSD, ACCESS VIA TWY A", None, false),
            Category::Apron
        );
        assert_eq!(
            classify("PAPI RWY 34 U/S", None, false),
            Category::Light
        );
        assert_eq!(
            classify("GPS RAIM OUTAGE PREDICTED", None, false),
            Category::Gps
        );
        assert_eq!(classify("BIRD ACTIVITY", None, false), Category::Other);
        assert_eq!(classify("", None, false), Category::Other);
    }

    #[test]
    fn test_whole_words_only() {
        // TWYS counts, "STANDARD" and "RUNWAYS" do not
        let scores = keyword_scores("standard runways twys");
        assert!(scores.contains(&(Category::Taxiway, 2)));
        assert!(scores.contains(&(Category::Runway, 0)));
        assert!(scores.contains(&(Category::Apron, 0)));
    }

    #[test]
    fn test_ties_and_overrides() {
        // RWY and TWY both score 2, runway is listed first
        assert_eq!(classify("RWY TWY", None, false), Category::Runway);
        assert_eq!(classify("RWY 15L CLSD", Some("QOBCE"), false), Category::Obstruction);
        assert_eq!(classify("RWY 15L CLSD", None, true), Category::Aip);
        assert_eq!(classify("RWY 15L CLSD", Some("QXXXX"), true), Category::Aip);
    }
}
