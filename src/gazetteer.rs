use std::{collections::HashMap, io, path::Path};

use geo::{point, Point};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum GazetteerError {
    #[error("failed to read waypoint csv: {0}")]
    FileRead(#[from] io::Error),
    #[error("failed to parse waypoint csv: {0}")]
    Csv(#[from] csv::Error),
}

pub type GazetteerResult = Result<WaypointGazetteer, GazetteerError>;

/// (lat, lng) of Pacific crossing fixes
static DEFAULT_WAYPOINTS: phf::Map<&'static str, (f64, f64)> = phf_map! {
    "EGOBA" => (37.5, 126.5),
    "LANAT" => (35.2, 129.0),
    "SAMON" => (33.5, 126.5),
    "GTC" => (25.1, 121.2),
    "ADNAP" => (22.3, 113.9),
    "ADGOR" => (16.0, 108.2),
    "ORNAI" => (47.5, -122.3),
    "TOU" => (37.6, -122.4),
    "BOPTA" => (37.5, 126.5),
    "PONIK" => (35.2, 129.0),
    "SADLI" => (31.1, 121.8),
    "IKEKA" => (35.5, 139.8),
};

static DEFAULT_AIRWAYS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "Y697" => &["EGOBA", "LANAT"],
    "Y51" => &["LANAT", "SAMON"],
    "Y142" => &["SAMON", "GTC"],
    "Y512" => &["GTC", "ADNAP"],
    "R591" => &["ADNAP", "ADGOR"],
};

/// Coarse latitude/longitude bands for fixes that are not inside any known FIR polygon.
pub fn estimate_fir(lat: f64, lng: f64) -> Option<&'static str> {
    if (24.0..=50.0).contains(&lat) && (120.0..=180.0).contains(&lng) {
        Some("RJJJ")
    } else if (20.0..=55.0).contains(&lat)
        && ((140.0..=180.0).contains(&lng) || (-180.0..=-140.0).contains(&lng))
    {
        Some("KZAK")
    } else if (45.0..=70.0).contains(&lat) && (-180.0..=-120.0).contains(&lng) {
        Some("PAZA")
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct WaypointRow {
    waypoint: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct WaypointGazetteer {
    waypoints: HashMap<String, Point>,
    airways: HashMap<String, Vec<String>>,
}

impl Default for WaypointGazetteer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WaypointGazetteer {
    pub fn builtin() -> Self {
        Self {
            waypoints: DEFAULT_WAYPOINTS
                .entries()
                .map(|(name, (lat, lng))| ((*name).to_string(), point! { x: *lng, y: *lat }))
                .collect(),
            airways: DEFAULT_AIRWAYS
                .entries()
                .map(|(airway, fixes)| {
                    (
                        (*airway).to_string(),
                        fixes.iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            waypoints: HashMap::new(),
            airways: HashMap::new(),
        }
    }

    /// Adds waypoints from a csv with `waypoint,latitude,longitude` columns. Rows that do not
    /// deserialize are skipped, later rows override earlier ones and the built-in fixes.
    pub fn with_csv(mut self, content: &[u8]) -> GazetteerResult {
        let mut reader = csv::Reader::from_reader(content);
        let mut count = 0;
        for (line, row) in reader.deserialize::<WaypointRow>().enumerate() {
            match row {
                Ok(row) if !row.waypoint.trim().is_empty() => {
                    self.insert(&row.waypoint, point! { x: row.longitude, y: row.latitude });
                    count += 1;
                }
                Ok(_) => {}
                Err(e) => warn!("skipping waypoint csv row {}: {e}", line + 1),
            }
        }
        debug!("loaded {count} waypoints from csv");

        Ok(self)
    }

    pub fn with_csv_file(self, path: &Path) -> GazetteerResult {
        let content = fs_err::read(path)?;
        self.with_csv(&content)
    }

    pub fn insert(&mut self, name: &str, coordinate: Point) {
        self.waypoints
            .insert(name.trim().to_uppercase(), coordinate);
    }

    pub fn get(&self, name: &str) -> Option<Point> {
        self.waypoints.get(&name.to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Fixes along an airway, empty for unknown airways.
    pub fn expand_airway(&self, airway: &str) -> &[String] {
        self.airways
            .get(&airway.to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn estimate_fir(&self, name: &str) -> Option<&'static str> {
        self.get(name)
            .and_then(|coordinate| estimate_fir(coordinate.y(), coordinate.x()))
    }
}

#[cfg(test)]
mod test {
    use geo::point;

    use super::{estimate_fir, WaypointGazetteer};

    #[test]
    fn test_builtin() {
        let gazetteer = WaypointGazetteer::builtin();
        assert_eq!(gazetteer.len(), 12);
        assert_eq!(gazetteer.get("egoba"), Some(point! { x: 126.5, y: 37.5 }));
        assert_eq!(gazetteer.get("NOPE"), None);
        assert_eq!(gazetteer.expand_airway("Y697"), ["EGOBA", "LANAT"]);
        assert!(gazetteer.expand_airway("A590").is_empty());
    }

    #[test]
    fn test_estimate_fir() {
        assert_eq!(estimate_fir(37.5, 126.5), Some("RJJJ"));
        // RJJJ band wins where bands overlap
        assert_eq!(estimate_fir(45., 170.), Some("RJJJ"));
        assert_eq!(estimate_fir(52., 170.), Some("KZAK"));
        assert_eq!(estimate_fir(30., -150.), Some("KZAK"));
        assert_eq!(estimate_fir(47.5, -122.3), Some("PAZA"));
        assert_eq!(estimate_fir(37.6, -122.4), None);
        assert_eq!(estimate_fir(22.3, 113.9), None);

        let gazetteer = WaypointGazetteer::builtin();
        assert_eq!(gazetteer.estimate_fir("ORNAI"), Some("PAZA"));
        assert_eq!(gazetteer.estimate_fir("ADNAP"), None);
        assert_eq!(gazetteer.estimate_fir("UNKNOWN"), None);
    }

    #[test]
    fn test_csv_overrides() {
        let csv = b"waypoint,latitude,longitude
NIPPI,40.5,160.25
egoba,1.0,2.0
BROKEN,north,east
,10.0,10.0
";
        let gazetteer = WaypointGazetteer::builtin().with_csv(csv).unwrap();
        assert_eq!(gazetteer.len(), 13);
        assert_eq!(gazetteer.get("NIPPI"), Some(point! { x: 160.25, y: 40.5 }));
        assert_eq!(gazetteer.get("EGOBA"), Some(point! { x: 2.0, y: 1.0 }));
        assert_eq!(gazetteer.get("BROKEN"), None);
    }
}
