use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::parser::extract_airport_code;

pub const PACKAGE_MARKER: &str = "KOREAN AIR NOTAM PACKAGE";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BulletinKind {
    /// Flight briefing package covering several aerodromes and FIRs, identifier lines come
    /// before the validity line.
    Package,
    /// NOTAMs of a single aerodrome.
    Airport,
}

impl BulletinKind {
    pub fn detect(text: &str) -> Self {
        if text.contains(PACKAGE_MARKER) {
            BulletinKind::Package
        } else {
            BulletinKind::Airport
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    SeekingFirstNotam,
    InNotam,
    Skipping,
}

static PACKAGE_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:E\))?\s*(?:\d+\.\s+)?\d{2}[A-Z]{3}\d{2}\s+\d{2}:\d{2}\s*-\s*(?:\d{2}[A-Z]{3}\d{2}\s+\d{2}:\d{2}|UFN|PERM)\s+[A-Z]{4}(?:\s+AIRAC)?(?:\s+AIP\s+SUP)?\s+[A-Z0-9]+/\d{2}",
    )
    .unwrap()
});

static AIRPORT_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\d+\.\s+)?(?:\d{2}[A-Z]{3}\d{2}\s+\d{2}:\d{2}\s*-|[A-Z]{4}(?:\s+[A-Z]+)?\s*\d{1,3}/\d{2}$|[A-Z]{4}\s+[A-Z]\d{4}/\d{2}$|[A-Z]{4}\s+COAD\d{2}/\d{2}$)",
    )
    .unwrap()
});

static DATE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\.\s+)?\d{2}[A-Z]{3}\d{2}\s+\d{2}:\d{2}\s*-").unwrap());

static ID_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Z]{4}(?:\s+AIRAC)?(?:\s+AIP\s+SUP)?\s+\d{1,3}/\d{2}$|^[A-Z]{4}\s+(?:[A-Z]\d{4}|COAD\d{2})/\d{2}$",
    )
    .unwrap()
});

static SECTION_END_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\*{8}\s*NO CURRENT NOTAMS FOUND\s*\*{8}$",
        r"(?i)END OF KOREAN AIR NOTAM PACKAGE",
        r"(?i)^KOREAN AIR NOTAM PACKAGE",
        r"(?i)^SECY\s*/\s*SECURITY INFORMATION",
        r"(?i)^\[(?:DEP|DEST|ALTN|ERA|\d+%?\s*ERA|FIR|REFILE|EDTO)\]",
        r"(?i)(?:CO)?MPANY ADVISORY",
        r"(?i)^COMPANY MINIMA",
        r"(?i)^DEPARTURE AIRPORT TECHNICAL INFORMATION",
        r"^={20,}$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static UNDERSCORE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_{20,}$").unwrap());

static ADDITIONAL_INFO_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\d+\.\s*COMPANY\s+RADIO\s*:",
        r"(?i)^\d+\.\s*COMPANY\s+ADVISORY\s*:",
        r"(?i)^\d+\.\s*RADIO\s*:",
        r"(?i)^\d+\.\s*ADVISORY\s*:",
        r"(?i)^\d+\.\s*[A-Z\s]+\s*:",
        r"(?i)^\[PAX\]",
        r"(?i)^\[JINAIR\]",
        r"(?i)^CTC\s+TWR",
        r"(?i)^NIL",
        r"(?i)^\d+\.\s+\d{2}[A-Z]{3}\d{2}\s+\d{2}:\d{2}\s*-\s*(?:UFN|PERM)\s+[A-Z]{4}\s+COAD\d+/\d+",
        r"â—[A-Z]¼",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Category headers between the NOTAMs of a package.
const CATEGORY_HEADERS: [&str; 11] = [
    "RUNWAY",
    "TAXIWAY",
    "RAMP",
    "APPROACH",
    "DEPARTURE",
    "GPS",
    "AIP",
    "AIRPORT",
    "OTHER",
    "RUNWAY LIGHT",
    "OBSTRUCTION",
];

const BOILERPLATE_SIGNATURES: [&str; 3] = [
    "TECHNICAL INFORMATION",
    "COMPANY MINIMA",
    "COMPANY ADVISORY",
];

static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Strips NUL and BOM characters and collapses runs of spaces and of blank lines.
pub fn clean_text(text: &str) -> String {
    let text = text.replace(['\0', '\u{feff}'], "").replace("\r\n", "\n");
    let text = SPACES_RE.replace_all(&text, " ");
    BLANK_LINES_RE.replace_all(&text, "\n\n").to_string()
}

fn is_section_end(line: &str) -> bool {
    SECTION_END_RES.iter().any(|regex| regex.is_match(line))
}

fn is_category_header(line: &str) -> bool {
    CATEGORY_HEADERS.contains(&line)
}

/// Drops company additional information and OCR debris from package lines, then joins an
/// identifier line with the validity line right below it into `"{validity} {identifier}"`.
fn preprocess_package(text: &str) -> Vec<String> {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !ADDITIONAL_INFO_RES.iter().any(|regex| regex.is_match(line)))
        .collect::<Vec<_>>();

    let mut merged = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if ID_LINE_RE.is_match(line) {
            if let Some(next) = lines.get(i + 1).filter(|next| DATE_LINE_RE.is_match(next)) {
                merged.push(format!("{next} {line}"));
                i += 2;
                continue;
            }
        }
        merged.push(line.to_string());
        i += 1;
    }

    merged
}

#[derive(Clone, Debug)]
pub struct NotamSegmenter {
    kind: Option<BulletinKind>,
    boilerplate_length_threshold: usize,
}

impl Default for NotamSegmenter {
    fn default() -> Self {
        Self {
            kind: None,
            boilerplate_length_threshold: Self::DEFAULT_BOILERPLATE_LENGTH_THRESHOLD,
        }
    }
}

impl NotamSegmenter {
    pub const DEFAULT_BOILERPLATE_LENGTH_THRESHOLD: usize = 800;

    pub fn new(kind: Option<BulletinKind>, boilerplate_length_threshold: usize) -> Self {
        Self {
            kind,
            boilerplate_length_threshold,
        }
    }

    /// Forces the bulletin kind instead of detecting it from the package marker.
    pub fn with_kind(mut self, kind: BulletinKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn kind_of(&self, text: &str) -> BulletinKind {
        self.kind.unwrap_or_else(|| BulletinKind::detect(text))
    }

    fn is_boilerplate(&self, block: &str) -> bool {
        block.len() > self.boilerplate_length_threshold
            && BOILERPLATE_SIGNATURES
                .iter()
                .any(|signature| block.contains(signature))
    }

    /// Splits a bulletin into NOTAM blocks. Never fails, text without NOTAMs yields no blocks.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let text = clean_text(text);
        let kind = self.kind_of(&text);
        let (lines, start_re): (Vec<Cow<str>>, &Regex) = match kind {
            BulletinKind::Package => (
                preprocess_package(&text).into_iter().map(Cow::Owned).collect(),
                &*PACKAGE_START_RE,
            ),
            BulletinKind::Airport => (
                text.lines().map(Cow::Borrowed).collect(),
                &*AIRPORT_START_RE,
            ),
        };
        debug!("segmenting {kind:?} bulletin with {} lines", lines.len());

        let mut blocks = vec![];
        let mut current: Vec<&str> = vec![];
        let mut state = State::SeekingFirstNotam;

        for line in &lines {
            let line: &str = line;
            let trimmed = line.trim();
            if UNDERSCORE_SEPARATOR_RE.is_match(trimmed) || is_category_header(trimmed) {
                continue;
            }
            let is_start = start_re.is_match(line);

            if state == State::Skipping && !is_start {
                continue;
            }

            if is_section_end(trimmed) {
                trace!("section end: {trimmed:?}");
                self.emit(&mut blocks, &mut current);
                state = State::Skipping;
                continue;
            }

            if is_start && !continues_identifier_line(&current, trimmed) {
                self.emit(&mut blocks, &mut current);
                current.push(line);
                state = State::InNotam;
            } else if state == State::InNotam {
                current.push(line);
            }
        }
        self.emit(&mut blocks, &mut current);

        debug!("segmented {} NOTAM blocks", blocks.len());
        blocks
    }

    fn emit(&self, blocks: &mut Vec<String>, current: &mut Vec<&str>) {
        if current.is_empty() {
            return;
        }
        let block = current.join("\n").trim().to_string();
        current.clear();

        if block.is_empty() {
            return;
        }
        if self.is_boilerplate(&block) {
            debug!(
                "discarding {} character boilerplate block {:?}",
                block.len(),
                block.lines().next().unwrap_or_default()
            );
            return;
        }
        if extract_airport_code(&block).is_none() {
            warn!(
                "discarding block without airport code: {:?}",
                block.lines().next().unwrap_or_default()
            );
            return;
        }

        blocks.push(block);
    }
}

/// A validity line directly below a lone identifier line belongs to the same NOTAM.
fn continues_identifier_line(current: &[&str], line: &str) -> bool {
    matches!(current, [identifier] if ID_LINE_RE.is_match(identifier.trim()))
        && DATE_LINE_RE.is_match(line)
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{clean_text, BulletinKind, NotamSegmenter};

    const PACKAGE: &str = "KOREAN AIR NOTAM PACKAGE 1 OF 1
DEP: RKSI DEST: KSEA ALTN: KPDX
[DEP] RKSI/ICN INCHEON INTL
RUNWAY
RKSI Z0582/25
09JUL25 16:00 - 25SEP25 09:00
E) RWY 15L/33R CLOSED DUE TO WIP
____________________________________________
1. COMPANY RADIO: 131.5
1. 01JUL25 00:00 - UFN RKSI COAD01/25
TAXIWAY
12AUG25 22:00 - 13AUG25 06:00 RKSI AIP SUP 7/25
E) TWY C CLSD
SECY / SECURITY INFORMATION
THIS SECTION IS NOT A NOTAM
[DEST] KSEA/SEA SEATTLE TACOMA INTL
05JUL25 12:00 - PERM KSEA A1234/25
E) OBST CRANE 250FT AGL 1NM N OF RWY 16L
COMPANY ADVISORY
DO NOT USE GATE S1
END OF KOREAN AIR NOTAM PACKAGE
";

    #[test]
    fn test_package() {
        let blocks = NotamSegmenter::default().segment(PACKAGE);

        assert_eq_sorted!(
            blocks,
            vec![
                "09JUL25 16:00 - 25SEP25 09:00 RKSI Z0582/25\nE) RWY 15L/33R CLOSED DUE TO WIP",
                "12AUG25 22:00 - 13AUG25 06:00 RKSI AIP SUP 7/25\nE) TWY C CLSD",
                "05JUL25 12:00 - PERM KSEA A1234/25\nE) OBST CRANE 250FT AGL 1NM N OF RWY 16L",
            ]
        );
    }

    #[test]
    fn test_airport_bulletin() {
        let bulletin = "RJTT NOTAM LIST
PRINTED 01JUL25
RJTT A1234/25
01JUL25 00:00 - 31JUL25 23:59
E) PAPI RWY 34R U/S

2. 05JUL25 12:00 - UFN RJTT A1300/25
E) TWY H CLSD
==============================
NOTES FOR CREW
";
        let segmenter = NotamSegmenter::default();
        assert_eq!(segmenter.kind_of(bulletin), BulletinKind::Airport);

        assert_eq_sorted!(
            segmenter.segment(bulletin),
            vec![
                "RJTT A1234/25\n01JUL25 00:00 - 31JUL25 23:59\nE) PAPI RWY 34R U/S",
                "2. 05JUL25 12:00 - UFN RJTT A1300/25\nE) TWY H CLSD",
            ]
        );
    }

    #[test]
    fn test_empty_and_noise() {
        let segmenter = NotamSegmenter::default();
        assert!(segmenter.segment("").is_empty());
        assert!(segmenter.segment("NOTHING TO SEE HERE\nAT ALL").is_empty());
    }

    #[test]
    fn test_boilerplate_is_discarded() {
        let appendix = format!(
            "01JUL25 00:00 - UFN RKSI A0001/25\nDEPARTURE AIRPORT DATA\n{}\nTECHNICAL INFORMATION",
            "RUNWAY LENGTH TABLE 3750M\n".repeat(40)
        );
        assert!(NotamSegmenter::default().segment(&appendix).is_empty());
        assert_eq!(
            NotamSegmenter::new(None, 10_000).segment(&appendix).len(),
            1
        );
    }

    #[test]
    fn test_blocks_without_airport_are_discarded() {
        let bulletin = "01JUL25 00:00 - UFN\nE) SOMETHING WITHOUT ANY LOCATION";
        assert!(NotamSegmenter::default().segment(bulletin).is_empty());
    }

    #[test]
    fn test_resegmenting_is_stable() {
        for (text, kind) in [
            (PACKAGE, BulletinKind::Package),
            (
                "RJTT A1234/25\n01JUL25 00:00 - 31JUL25 23:59\nE) PAPI RWY 34R U/S\n\n\n2. 05JUL25 12:00 - UFN RJTT A1300/25\nE) TWY H CLSD",
                BulletinKind::Airport,
            ),
        ] {
            let segmenter = NotamSegmenter::default().with_kind(kind);
            let blocks = segmenter.segment(text);
            assert!(!blocks.is_empty());
            assert!(blocks.iter().map(String::len).sum::<usize>() <= text.len());

            let again = segmenter.segment(&blocks.join("\n"));
            assert_eq_sorted!(again, blocks);
        }
    }

    const SUPPLEMENTS: &str = "KOREAN AIR NOTAM PACKAGE 1 OF 1
[DEP] RKSI/ICN INCHEON INTL
RUNWAY
RKSI Z0582/25
09JUL25 16:00 - 25SEP25 09:00
E) RWY 15L/33R CLOSED DUE TO WIP
AIP
RKSI AIRAC AIP SUP 12/25
01JAN25 00:00 - UFN
E) NEW SID ANYANG 1A PUBLISHED
OTHER
RKSI COAD01/25
01JUL25 00:00 - PERM
E) CREW TO REPORT BIRD ACTIVITY
END OF KOREAN AIR NOTAM PACKAGE
";

    #[test]
    fn test_package_identifier_forms() {
        let blocks = NotamSegmenter::default().segment(SUPPLEMENTS);

        assert_eq_sorted!(
            blocks,
            vec![
                "09JUL25 16:00 - 25SEP25 09:00 RKSI Z0582/25\nE) RWY 15L/33R CLOSED DUE TO WIP",
                "01JAN25 00:00 - UFN RKSI AIRAC AIP SUP 12/25\nE) NEW SID ANYANG 1A PUBLISHED",
                "01JUL25 00:00 - PERM RKSI COAD01/25\nE) CREW TO REPORT BIRD ACTIVITY",
            ]
        );
    }

    #[test]
    fn test_resegmenting_with_detected_kind() {
        let segmenter = NotamSegmenter::default();
        for text in [PACKAGE, SUPPLEMENTS] {
            let blocks = segmenter.segment(text);
            assert!(!blocks.is_empty());

            let joined = blocks.join("\n");
            assert_eq!(segmenter.kind_of(&joined), BulletinKind::Airport);
            assert_eq_sorted!(segmenter.segment(&joined), blocks);
        }
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("\u{feff}RKSI  A1/25\0\r\n\n\n\nE)   RWY"),
            "RKSI A1/25\n\nE) RWY"
        );
    }
}
