use std::io;

use geo::{Coord, Point};
use tracing::warn;

pub mod briefing;
pub mod config;
pub mod coordinate;
pub mod filter;
pub mod fir;
pub mod flight_info;
pub mod gazetteer;
pub mod local_time;
pub mod notam;
pub mod pipeline;
pub mod timezone;
pub mod translate;

pub use pipeline::{Error, NotamPipeline};

fn read_to_string(contents: &[u8]) -> Result<String, io::Error> {
    String::from_utf8(contents.to_vec()).or_else(|_| {
        let (string, _, errors) = encoding_rs::WINDOWS_1252.decode(contents);
        if errors {
            warn!("errors while decoding win-1252");
        }
        Ok(string.to_string())
    })
}

/// Signed degrees, minutes, seconds. Degrees carry the hemisphere sign, `-0.0` included, so
/// `000000S 1410000E`-style literals south of the equator keep their sign.
pub type DegMinSec = (f64, u8, f64);

fn decimal_to_dms(decimal: f64) -> (u16, u8, u8) {
    let abs = decimal.abs();
    let mut degrees = abs.trunc() as u16;
    let mut minutes = ((abs - abs.trunc()) * 60.0).trunc() as u8;
    let mut seconds =
        ((abs - abs.trunc() - f64::from(minutes) / 60.0) * 3600.0).round() as u8;

    if seconds >= 60 {
        seconds -= 60;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    (degrees, minutes, seconds)
}

pub trait DegMinSecExt {
    fn from_deg_min_sec(lat: DegMinSec, lng: DegMinSec) -> Self;
    /// `DDMMSS[N|S]`
    fn lat_notam_fmt(&self) -> String;
    /// `DDDMMSS[E|W]`
    fn lng_notam_fmt(&self) -> String;
    fn notam_fmt(&self) -> String {
        format!("{} {}", self.lat_notam_fmt(), self.lng_notam_fmt())
    }
}

impl DegMinSecExt for Coord {
    fn from_deg_min_sec(lat: DegMinSec, lng: DegMinSec) -> Self {
        let lat_sign = lat.0.signum();
        let lng_sign = lng.0.signum();
        Self {
            y: lat.0 + lat_sign * f64::from(lat.1) / 60.0 + lat_sign * lat.2 / 3600.0,
            x: lng.0 + lng_sign * f64::from(lng.1) / 60.0 + lng_sign * lng.2 / 3600.0,
        }
    }

    fn lat_notam_fmt(&self) -> String {
        let (deg, min, sec) = decimal_to_dms(self.y);
        let hemi = if self.y.is_sign_negative() { 'S' } else { 'N' };
        format!("{deg:02}{min:02}{sec:02}{hemi}")
    }

    fn lng_notam_fmt(&self) -> String {
        let (deg, min, sec) = decimal_to_dms(self.x);
        let hemi = if self.x.is_sign_negative() { 'W' } else { 'E' };
        format!("{deg:03}{min:02}{sec:02}{hemi}")
    }
}
impl DegMinSecExt for Point {
    fn from_deg_min_sec(lat: DegMinSec, lng: DegMinSec) -> Self {
        Coord::from_deg_min_sec(lat, lng).into()
    }

    fn lat_notam_fmt(&self) -> String {
        self.0.lat_notam_fmt()
    }

    fn lng_notam_fmt(&self) -> String {
        self.0.lng_notam_fmt()
    }
}

/// Four ASCII uppercase letters.
pub fn is_icao_code(code: &str) -> bool {
    code.len() == 4 && code.bytes().all(|b| b.is_ascii_uppercase())
}

#[cfg(test)]
mod test {
    use geo::Coord;

    use crate::{is_icao_code, read_to_string, DegMinSecExt as _};

    #[test]
    fn test_dms_roundtrip() {
        let lat = (54., 40, 9.);
        let lng = (170., 0, 0.);
        let coord = Coord::from_deg_min_sec(lat, lng);
        let expected = 54.669_166_666_666_667;
        assert!(
            (coord.y - expected).abs() < 1e-12,
            "left: {:?} not equal right: {:?}",
            coord.y,
            expected
        );
        assert!(
            (coord.x - 170.).abs() < f64::EPSILON,
            "left: {:?} not equal right: 170.0",
            coord.x,
        );
        assert_eq!(coord.notam_fmt(), "544009N 1700000E");
    }

    #[test]
    fn test_dms_southern_zero_degrees() {
        let coord = Coord::from_deg_min_sec((-0., 30, 0.), (-120., 0, 0.));
        assert!((coord.y + 0.5).abs() < f64::EPSILON, "{coord:?}");
        assert!((coord.x + 120.).abs() < f64::EPSILON, "{coord:?}");
        assert_eq!(coord.notam_fmt(), "003000S 1200000W");
    }

    #[test]
    fn test_windows_1252_fallback() {
        let decoded = read_to_string(b"RWY 15L/33R CLSD \xb0").unwrap();
        assert_eq!(decoded, "RWY 15L/33R CLSD \u{b0}");
    }

    #[test]
    fn test_icao_code() {
        assert!(is_icao_code("RKSI"));
        assert!(!is_icao_code("RKS1"));
        assert!(!is_icao_code("rksi"));
        assert!(!is_icao_code("RKSIX"));
    }
}
