use geo::{Coord, LineString, Point};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{BoundingBox, FirBoundaryTable, FirPolygon};

/// How points are attributed to FIRs.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// First FIR whose bounding box contains the point.
    BoundingBox,
    /// Bounding boxes first, ray casting only to pick between overlapping boxes. Falls back to
    /// the first box when no candidate polygon contains the point.
    #[default]
    Refined,
    /// Bounding box prefilter followed by a mandatory ray cast.
    Polygon,
}

/// Edge crossing parity test with `x` = latitude and `y` = longitude. A point on an edge is
/// inside when it sits on the upper end of the edge's longitude range, which keeps shared
/// vertices from being counted twice.
#[allow(clippy::float_cmp)]
pub fn ray_cast(lat: f64, lng: f64, polygon: &[Coord]) -> bool {
    let n = polygon.len();
    if n < FirPolygon::MIN_VERTICES {
        return false;
    }
    let (x, y) = (lat, lng);

    let mut inside = false;
    let mut p1 = polygon[0];
    for i in 1..=n {
        let p2 = polygon[i % n];
        let (p1x, p1y) = (p1.y, p1.x);
        let (p2x, p2y) = (p2.y, p2.x);

        if y > p1y.min(p2y) && y <= p1y.max(p2y) && x <= p1x.max(p2x) {
            // p1y != p2y, the range check above is empty for horizontal edges
            let xinters = (y - p1y) * (p2x - p1x) / (p2y - p1y) + p1x;
            if p1x == p2x || x <= xinters {
                inside = !inside;
            }
        }
        p1 = p2;
    }

    inside
}

#[derive(Clone, Debug)]
struct FirRegion {
    polygon: FirPolygon,
    bounding_box: BoundingBox,
    ring: LineString,
    unwrapped: bool,
}

impl FirRegion {
    fn new(polygon: FirPolygon) -> Self {
        Self {
            bounding_box: polygon.bounding_box(),
            ring: polygon.ring(),
            unwrapped: polygon.crosses_antimeridian(),
            polygon,
        }
    }

    fn contains_precise(&self, lat: f64, lng: f64) -> bool {
        let lng = if self.unwrapped && lng < 0.0 {
            lng + 360.0
        } else {
            lng
        };
        // the closing vertex of the ring duplicates the first, the edge it adds is degenerate
        ray_cast(lat, lng, &self.ring.0[..self.ring.0.len() - 1])
    }
}

#[derive(Clone, Debug)]
pub struct PointInRegionClassifier {
    regions: Vec<FirRegion>,
    table: FirBoundaryTable,
    mode: ClassifierMode,
}

impl PointInRegionClassifier {
    pub fn new(table: FirBoundaryTable, mode: ClassifierMode) -> Self {
        Self {
            regions: table.iter().cloned().map(FirRegion::new).collect(),
            table,
            mode,
        }
    }

    pub fn table(&self) -> &FirBoundaryTable {
        &self.table
    }

    pub fn mode(&self) -> ClassifierMode {
        self.mode
    }

    /// FIR code for a point, `None` when no known FIR contains it.
    pub fn classify(&self, lat: f64, lng: f64) -> Option<&str> {
        let candidates = self
            .regions
            .iter()
            .filter(|region| region.bounding_box.contains(lat, lng))
            .collect::<Vec<_>>();
        trace!(
            "({lat}, {lng}) bounding box candidates: {:?}",
            candidates
                .iter()
                .map(|region| &region.polygon.fir_code)
                .collect::<Vec<_>>()
        );

        let region = match self.mode {
            ClassifierMode::BoundingBox => candidates.first().copied(),
            ClassifierMode::Refined if candidates.len() > 1 => candidates
                .iter()
                .find(|region| region.contains_precise(lat, lng))
                .or(candidates.first())
                .copied(),
            ClassifierMode::Refined => candidates.first().copied(),
            ClassifierMode::Polygon => candidates
                .into_iter()
                .find(|region| region.contains_precise(lat, lng)),
        };

        region.map(|region| region.polygon.fir_code.as_str())
    }

    pub fn classify_point(&self, point: &Point) -> Option<&str> {
        self.classify(point.y(), point.x())
    }

    /// Ray cast against a single FIR, regardless of mode.
    pub fn contains(&self, fir_code: &str, lat: f64, lng: f64) -> bool {
        self.regions
            .iter()
            .find(|region| region.polygon.fir_code == fir_code)
            .is_some_and(|region| region.contains_precise(lat, lng))
    }
}
