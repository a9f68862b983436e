pub mod classifier;
pub mod route;

use std::fmt::Display;

use bevy_derive::Deref;
use geo::{coord, Coord, LineString, Rect};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{coordinate::parse_coordinates, DegMinSecExt as _};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FirPolygon {
    pub fir_code: String,
    /// Closed ring, the last vertex connects back to the first. A repeated closing vertex from
    /// the source table is kept as is.
    pub vertices: Vec<Coord>,
}

/// Lateral extent of a FIR. A polygon crossing the antimeridian has an eastern box up to 180
/// and a western box from -180.
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub enum BoundingBox {
    Simple(Rect),
    Antimeridian { east: Rect, west: Rect },
}

fn rect_contains(rect: &Rect, lat: f64, lng: f64) -> bool {
    lat >= rect.min().y && lat <= rect.max().y && lng >= rect.min().x && lng <= rect.max().x
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        match self {
            BoundingBox::Simple(rect) => rect_contains(rect, lat, lng),
            BoundingBox::Antimeridian { east, west } => {
                rect_contains(east, lat, lng) || rect_contains(west, lat, lng)
            }
        }
    }
}

impl FirPolygon {
    pub const MIN_VERTICES: usize = 3;

    pub fn new(fir_code: &str, vertices: Vec<Coord>) -> Option<Self> {
        if vertices.len() < Self::MIN_VERTICES {
            warn!(
                "FIR {fir_code} has only {} vertices, skipping",
                vertices.len()
            );
            return None;
        }

        Some(Self {
            fir_code: fir_code.to_string(),
            vertices,
        })
    }

    /// Longitudes of both signs spanning more than half the globe mean the ring is drawn across
    /// the antimeridian rather than around the prime meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        let (min_lng, max_lng) = self
            .longitudes()
            .fold((f64::MAX, f64::MIN), |(min, max), lng| (min.min(lng), max.max(lng)));
        min_lng < 0.0 && max_lng > 0.0 && max_lng - min_lng > 180.0
    }

    /// Longitudes of the vertices off the poles, or of all vertices when every one is polar.
    /// A pole vertex like `900000S 0000000E` carries no longitude and would stretch the box.
    fn longitudes(&self) -> impl Iterator<Item = f64> + '_ {
        let all_polar = self.vertices.iter().all(|c| c.y.abs() >= 90.0);
        self.vertices
            .iter()
            .filter(move |c| all_polar || c.y.abs() < 90.0)
            .map(|c| c.x)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let (min_lat, max_lat) = self
            .vertices
            .iter()
            .fold((f64::MAX, f64::MIN), |(min, max), c| (min.min(c.y), max.max(c.y)));

        if self.crosses_antimeridian() {
            let east_min = self
                .longitudes()
                .filter(|lng| *lng >= 0.0)
                .fold(180.0_f64, f64::min);
            let west_max = self
                .longitudes()
                .filter(|lng| *lng < 0.0)
                .fold(-180.0_f64, f64::max);

            BoundingBox::Antimeridian {
                east: Rect::new(
                    coord! { x: east_min, y: min_lat },
                    coord! { x: 180.0, y: max_lat },
                ),
                west: Rect::new(
                    coord! { x: -180.0, y: min_lat },
                    coord! { x: west_max, y: max_lat },
                ),
            }
        } else {
            let (min_lng, max_lng) = self
                .longitudes()
                .fold((f64::MAX, f64::MIN), |(min, max), lng| (min.min(lng), max.max(lng)));
            BoundingBox::Simple(Rect::new(
                coord! { x: min_lng, y: min_lat },
                coord! { x: max_lng, y: max_lat },
            ))
        }
    }

    /// Vertices as a closed line string, western longitudes shifted by +360 for rings crossing
    /// the antimeridian so the ring is continuous.
    pub fn ring(&self) -> LineString {
        let unwrap = self.crosses_antimeridian();
        let mut ring: LineString = self
            .vertices
            .iter()
            .map(|c| {
                if unwrap && c.x < 0.0 {
                    coord! { x: c.x + 360.0, y: c.y }
                } else {
                    *c
                }
            })
            .collect();
        ring.close();
        ring
    }
}

impl Display for FirPolygon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.fir_code)?;
        for vertex in &self.vertices {
            writeln!(f, "{}", vertex.notam_fmt())?;
        }

        Ok(())
    }
}

/// FIR polygons in lookup order. The order matters: the first matching FIR wins when boxes
/// overlap.
#[derive(Clone, Debug, Default, Serialize, Deref)]
pub struct FirBoundaryTable(Vec<FirPolygon>);

impl FirBoundaryTable {
    /// Builds the table from `(fir_code, description)` pairs, where each description line holds
    /// one or more `DDMMSS[N|S] DDDMMSS[E|W]` pairs. Malformed lines are skipped.
    pub fn from_descriptions<'a>(
        descriptions: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self(
            descriptions
                .into_iter()
                .filter_map(|(fir_code, description)| {
                    let vertices = parse_boundary_description(fir_code, description);
                    debug!("FIR {fir_code}: {} vertices", vertices.len());
                    FirPolygon::new(fir_code, vertices)
                })
                .collect(),
        )
    }

    pub fn from_polygons(polygons: Vec<FirPolygon>) -> Self {
        Self(polygons)
    }

    /// The built-in Pacific FIRs.
    pub fn embedded() -> Self {
        Self::from_descriptions(EMBEDDED_BOUNDARIES.iter().copied())
    }

    /// The built-in table restricted to the given FIR codes, order of the built-in table kept.
    pub fn embedded_subset(fir_codes: &[&str]) -> Self {
        Self::from_descriptions(
            EMBEDDED_BOUNDARIES
                .iter()
                .copied()
                .filter(|(fir_code, _)| fir_codes.contains(fir_code)),
        )
    }

    pub fn get(&self, fir_code: &str) -> Option<&FirPolygon> {
        self.0.iter().find(|polygon| polygon.fir_code == fir_code)
    }

    pub fn fir_codes(&self) -> Vec<&str> {
        self.0.iter().map(|polygon| polygon.fir_code.as_str()).collect()
    }
}

fn parse_boundary_description(fir_code: &str, description: &str) -> Vec<Coord> {
    description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(|line| match parse_coordinates(line) {
            Ok(coords) => coords,
            Err(e) => {
                warn!("FIR {fir_code}: skipping boundary line {line:?}: {e}");
                vec![]
            }
        })
        .collect()
}

const PAZA_BOUNDARY: &str = "
544009N 1700000E
513000N 1700000E
510500N 1734400E
500800N 1763400W
454200N 1625500E
500500N 1590000E
540000N 1690000E
544009N 1700000E
";

const KZAK_BOUNDARY: &str = "
524300N 1350000W
510000N 1334500W
482000N 1280000W
450000N 1263000W
405900N 1265400W
405000N 1270000W
373023N 1270000W
362743N 1265600W
353000N 1255000W
360000N 1241200W
343000N 1231500W
304500N 1205000W
300000N 1200000W
033000N 1200000W
033000N 1450000W
050000S 1550000W
050000S 1800000W/E
033000N 1800000W/E
033000N 1600000E
000000N/S 1600000E
000000N/S 1410000E
033000N 1410000E
033000N 1330000E
070000N 1300000E
210000N 1300000E
210000N 1550000E
270000N 1550000E
270000N 1650000E
430000N 1650000E
454200N 1625500E
500800N 1763400W
512400N 1674900W
533000N 1600000W
560000N 1530000W 564542N 1514500W
532203N 1370000W
524300N 1350000W
";

const RJJJ_BOUNDARY: &str = "
454200N 1625500E
430000N 1650000E
270000N 1650000E
270000N 1550000E
210000N 1550000E
210000N 1213000E
403000N 1333900E
383800N 1333900E
380000N 1330000E
373000N 1330000E
344000N 1291000E
323000N 1281800E
300000N 1252500E
262500N 1230000E
233000N 1230000E
210000N 1213000E
";

const NZZO_BOUNDARY: &str = "
300000S 1310000W
900000S 0000000E
300000S 1630000E
280000S 1680000E
250000S 1712500E
250000S 1800000E
153245.1S 1754031.2W
050000S 1710000W
050000S 1570000W
300000S 1570000W
300000S 1310000W
";

const AYPM_BOUNDARY: &str = "
000000N 1600000E
045000S 1600000E
045000S 1590000E
120000S 1550000E
120000S 1440000E
000000N 1410000E
000000N 1600000E
";

pub const EMBEDDED_BOUNDARIES: [(&str, &str); 5] = [
    ("PAZA", PAZA_BOUNDARY),
    ("KZAK", KZAK_BOUNDARY),
    ("RJJJ", RJJJ_BOUNDARY),
    ("NZZO", NZZO_BOUNDARY),
    ("AYPM", AYPM_BOUNDARY),
];

#[cfg(test)]
mod test {
    use geo::coord;
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{BoundingBox, FirBoundaryTable, FirPolygon};

    #[test]
    fn test_embedded_table() {
        let table = FirBoundaryTable::embedded();
        assert_eq!(table.fir_codes(), vec!["PAZA", "KZAK", "RJJJ", "NZZO", "AYPM"]);

        // two pairs on one line both land in the ring
        assert_eq!(table.get("KZAK").unwrap().vertices.len(), 37);
        assert_eq!(table.get("PAZA").unwrap().vertices.len(), 8);
        assert_eq!(table.get("NZZO").unwrap().vertices.len(), 11);
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let table = FirBoundaryTable::from_descriptions([
            (
                "TEST",
                "100000N 1000000E\nGARBAGE\n100000N 1100000E\n200000N 1100000E\n",
            ),
            ("FEW", "100000N 1000000E\n100000N 1100000E\n"),
        ]);

        assert_eq!(table.fir_codes(), vec!["TEST"]);
        assert_eq_sorted!(
            table.get("TEST").unwrap().vertices,
            vec![
                coord! { x: 100., y: 10. },
                coord! { x: 110., y: 10. },
                coord! { x: 110., y: 20. },
            ]
        );
    }

    #[test]
    fn test_antimeridian_bounding_box() {
        let table = FirBoundaryTable::embedded();
        let kzak = table.get("KZAK").unwrap();
        assert!(kzak.crosses_antimeridian());

        let BoundingBox::Antimeridian { east, west } = kzak.bounding_box() else {
            panic!("KZAK should cross the antimeridian");
        };
        assert!((east.min().x - 130.).abs() < 1e-9);
        assert!((east.max().x - 180.).abs() < 1e-9);
        assert!((west.min().x + 180.).abs() < 1e-9);
        assert!((west.max().x + 120.).abs() < 1e-9);

        assert!(kzak.bounding_box().contains(50., 179.9));
        assert!(kzak.bounding_box().contains(50., -179.9));
        assert!(!kzak.bounding_box().contains(50., 0.));

        let rjjj = table.get("RJJJ").unwrap();
        assert!(!rjjj.crosses_antimeridian());
        assert!(matches!(rjjj.bounding_box(), BoundingBox::Simple(_)));
    }

    #[test]
    fn test_pole_vertex_does_not_widen_box() {
        let table = FirBoundaryTable::embedded();
        let nzzo = table.get("NZZO").unwrap();
        assert!(nzzo.crosses_antimeridian());

        let BoundingBox::Antimeridian { east, west } = nzzo.bounding_box() else {
            panic!("NZZO should cross the antimeridian");
        };
        assert!((east.min().x - 163.).abs() < 1e-9);
        assert!((east.min().y + 90.).abs() < 1e-9);
        assert!((west.max().x + 131.).abs() < 1e-9);

        // Sydney, Perth, Cape Town
        assert!(!nzzo.bounding_box().contains(-33.9, 151.2));
        assert!(!nzzo.bounding_box().contains(-31.9, 115.9));
        assert!(!nzzo.bounding_box().contains(-33.9, 18.4));
        assert!(nzzo.bounding_box().contains(-40., 175.));
    }

    #[test]
    fn test_ring_unwraps_western_longitudes() {
        let paza = FirPolygon::new(
            "PAZA",
            vec![
                coord! { x: 170., y: 54. },
                coord! { x: -176., y: 50. },
                coord! { x: 163., y: 45. },
            ],
        )
        .unwrap();
        let ring = paza.ring();
        assert_eq!(ring.0.len(), 4);
        assert!((ring.0[1].x - 184.).abs() < 1e-9);
        assert!(ring.is_closed());
    }

    #[test]
    fn test_display() {
        let table = FirBoundaryTable::embedded_subset(&["AYPM"]);
        assert_eq!(
            table.get("AYPM").unwrap().to_string(),
            "AYPM
000000N 1600000E
045000S 1600000E
045000S 1590000E
120000S 1550000E
120000S 1440000E
000000N 1410000E
000000N 1600000E
"
        );
    }
}
