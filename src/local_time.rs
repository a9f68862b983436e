use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{
    notam::{Expiry, NotamRecord},
    timezone::{AirportTimeZone, TimeZoneResolver},
};

const DISPLAY_FORMAT: &str = "%m/%d %H:%M";
const MINUTES_PER_DAY: i32 = 24 * 60;

static TIME_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([01]\d|2[0-4])([0-5]\d)-([01]\d|2[0-4])([0-5]\d)\b").unwrap());

fn local(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp
        .with_timezone(&offset)
        .format(DISPLAY_FORMAT)
        .to_string()
}

/// `"07/10 01:00 - 09/25 18:00 (+09:00)"`. Open-ended expiries are printed as `UFN`/`PERM`, a
/// missing expiry leaves only the start.
pub fn format_local_window(
    effective_time: DateTime<Utc>,
    expiry_time: Option<&Expiry>,
    zone: &AirportTimeZone,
) -> String {
    let offset = zone.fixed_offset();
    let start = local(effective_time, offset);

    match expiry_time {
        Some(Expiry::At(expiry)) => format!(
            "{start} - {} ({})",
            local(*expiry, offset),
            zone.utc_offset
        ),
        Some(sentinel) => format!("{start} - {sentinel} ({})", zone.utc_offset),
        None => format!("{start} ({})", zone.utc_offset),
    }
}

/// Shifts every `HHMM-HHMM` range of a `D)` schedule by `offset_minutes`, wrapping at midnight.
pub fn rebase_time_band(band: &str, offset_minutes: i32) -> String {
    let shift = |hours: &str, minutes: &str| {
        let utc = hours.parse::<i32>().unwrap_or_default() * 60
            + minutes.parse::<i32>().unwrap_or_default();
        let local = (utc + offset_minutes).rem_euclid(MINUTES_PER_DAY);
        format!("{:02}{:02}", local / 60, local % 60)
    };

    TIME_RANGE_RE
        .replace_all(band, |captures: &Captures| {
            format!(
                "{}-{}",
                shift(&captures[1], &captures[2]),
                shift(&captures[3], &captures[4])
            )
        })
        .to_string()
}

pub struct LocalTimeFormatter<'a> {
    resolver: &'a TimeZoneResolver,
}

impl<'a> LocalTimeFormatter<'a> {
    pub fn new(resolver: &'a TimeZoneResolver) -> Self {
        Self { resolver }
    }

    /// Local validity of a record, with its `D)` schedule in local time appended. `None` for
    /// records without validity.
    pub fn format(&self, record: &NotamRecord) -> Option<String> {
        let validity = record.validity?;
        let zone = self
            .resolver
            .resolve(&record.airport_code, validity.effective_time);
        let window = format_local_window(
            validity.effective_time,
            Some(&validity.expiry_time),
            &zone,
        );

        Some(match &record.time_band {
            Some(band) => format!("{window}, {}", rebase_time_band(band, zone.offset_minutes)),
            None => window,
        })
    }

    /// Attaches the local time display to every record.
    pub fn annotate(&self, records: &mut [NotamRecord]) {
        for record in records {
            record.local_time_display = self.format(record);
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use crate::{
        notam::{Expiry, NotamRecord},
        timezone::TimeZoneResolver,
    };

    use super::{format_local_window, rebase_time_band, LocalTimeFormatter};

    #[test]
    fn test_windows() {
        let resolver = TimeZoneResolver::new();
        let start = Utc.with_ymd_and_hms(2025, 7, 9, 16, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 9, 25, 9, 0, 0).unwrap();
        let rksi = resolver.resolve("RKSI", start);

        assert_eq!(
            format_local_window(start, Some(&Expiry::At(end)), &rksi),
            "07/10 01:00 - 09/25 18:00 (+09:00)"
        );
        assert_eq!(
            format_local_window(start, Some(&Expiry::Ufn), &rksi),
            "07/10 01:00 - UFN (+09:00)"
        );
        assert_eq!(
            format_local_window(start, Some(&Expiry::Perm), &rksi),
            "07/10 01:00 - PERM (+09:00)"
        );
        assert_eq!(format_local_window(start, None, &rksi), "07/10 01:00 (+09:00)");

        let ksea = resolver.resolve("KSEA", start);
        assert_eq!(
            format_local_window(start, Some(&Expiry::At(end)), &ksea),
            "07/09 09:00 - 09/25 02:00 (-07:00)"
        );
    }

    #[test]
    fn test_time_band() {
        assert_eq!(rebase_time_band("DAILY 1300-1500", 540), "DAILY 2200-0000");
        assert_eq!(
            rebase_time_band("MON-FRI 0030-0600 2200-2359", -480),
            "MON-FRI 1630-2200 1400-1559"
        );
        assert_eq!(rebase_time_band("SR-SS", 540), "SR-SS");
    }

    #[test]
    fn test_record_display() {
        let resolver = TimeZoneResolver::new();
        let formatter = LocalTimeFormatter::new(&resolver);
        let mut records = NotamRecord::parse_all([
            "RKSI A0001/25\nB) 2507010000 C) 2507310600\nD) DAILY 1300-1500\nE) RWY 15L CLSD",
            "E) TWY A CLSD A0002/25",
        ]);
        formatter.annotate(&mut records);

        assert_eq!(
            records[0].local_time_display.as_deref(),
            Some("07/01 09:00 - 07/31 15:00 (+09:00), DAILY 2200-0000")
        );
        assert_eq!(records[1].local_time_display, None);
    }
}
