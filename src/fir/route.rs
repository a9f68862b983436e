use geo::Point;
use itertools::Itertools;
use multimap::MultiMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    coordinate::{parse_route, ParsedRoute},
    gazetteer::WaypointGazetteer,
};

use super::classifier::PointInRegionClassifier;

/// Contiguous span of route coordinates attributed to one FIR, or to none.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RouteSegment {
    pub fir_code: Option<String>,
    pub start_index: usize,
    /// inclusive
    pub end_index: usize,
    pub coordinates: Vec<Point>,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FirSource {
    /// gazetteer coordinate inside a FIR of the boundary table
    Boundary,
    /// gazetteer coordinate outside all known FIRs, attributed by latitude/longitude band
    Estimate,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct WaypointFir {
    pub waypoint: String,
    pub fir_code: String,
    pub coordinate: Point,
    pub source: FirSource,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct WaypointFirAnalysis {
    pub waypoint_firs: Vec<WaypointFir>,
    pub fir_waypoints: MultiMap<String, String>,
    pub unknown_waypoints: Vec<String>,
}

impl WaypointFirAnalysis {
    pub fn fir_of(&self, waypoint: &str) -> Option<&str> {
        self.waypoint_firs
            .iter()
            .find(|entry| entry.waypoint == waypoint)
            .map(|entry| entry.fir_code.as_str())
    }

    /// FIRs of waypoints whose FIR came from the coarse band estimate.
    pub fn estimated_firs(&self) -> Vec<&str> {
        self.waypoint_firs
            .iter()
            .filter(|entry| entry.source == FirSource::Estimate)
            .map(|entry| entry.fir_code.as_str())
            .unique()
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RouteAnalysis {
    pub route: ParsedRoute,
    pub segments: Vec<RouteSegment>,
    /// distinct FIRs in order of first appearance along the route
    pub traversed_firs: Vec<String>,
    pub waypoints: WaypointFirAnalysis,
}

pub struct RouteFirAnalyzer<'a> {
    classifier: &'a PointInRegionClassifier,
    gazetteer: &'a WaypointGazetteer,
}

impl<'a> RouteFirAnalyzer<'a> {
    pub fn new(classifier: &'a PointInRegionClassifier, gazetteer: &'a WaypointGazetteer) -> Self {
        Self {
            classifier,
            gazetteer,
        }
    }

    /// Single pass over the coordinates, a new segment starts whenever the FIR changes,
    /// including changes to and from "no FIR". Segments partition `coordinates` exactly.
    pub fn segments(&self, coordinates: &[Point]) -> Vec<RouteSegment> {
        let mut segments = vec![];
        let mut current: Option<RouteSegment> = None;

        for (index, point) in coordinates.iter().enumerate() {
            let fir_code = self.classifier.classify_point(point).map(str::to_string);
            match current.as_mut() {
                Some(segment) if segment.fir_code == fir_code => {
                    segment.end_index = index;
                    segment.coordinates.push(*point);
                }
                _ => {
                    segments.extend(current.take());
                    current = Some(RouteSegment {
                        fir_code,
                        start_index: index,
                        end_index: index,
                        coordinates: vec![*point],
                    });
                }
            }
        }
        segments.extend(current);

        segments
    }

    pub fn traversed_firs(segments: &[RouteSegment]) -> Vec<String> {
        segments
            .iter()
            .filter_map(|segment| segment.fir_code.clone())
            .unique()
            .collect()
    }

    pub fn waypoint_firs<'w>(&self, waypoints: impl IntoIterator<Item = &'w str>) -> WaypointFirAnalysis {
        waypoints.into_iter().unique().fold(
            WaypointFirAnalysis::default(),
            |mut acc, waypoint| {
                let resolved = self.gazetteer.get(waypoint).and_then(|coordinate| {
                    self.classifier
                        .classify_point(&coordinate)
                        .map(|fir| (fir, FirSource::Boundary))
                        .or_else(|| {
                            crate::gazetteer::estimate_fir(coordinate.y(), coordinate.x())
                                .map(|fir| (fir, FirSource::Estimate))
                        })
                        .map(|(fir, source)| (fir.to_string(), coordinate, source))
                });

                match resolved {
                    Some((fir_code, coordinate, source)) => {
                        acc.fir_waypoints
                            .insert(fir_code.clone(), waypoint.to_string());
                        acc.waypoint_firs.push(WaypointFir {
                            waypoint: waypoint.to_string(),
                            fir_code,
                            coordinate,
                            source,
                        });
                    }
                    None => acc.unknown_waypoints.push(waypoint.to_string()),
                }

                acc
            },
        )
    }

    pub fn analyze(&self, route: &str) -> RouteAnalysis {
        self.analyze_parsed(parse_route(route))
    }

    pub fn analyze_parsed(&self, route: ParsedRoute) -> RouteAnalysis {
        let segments = self.segments(&route.coordinates());
        let traversed_firs = Self::traversed_firs(&segments);
        let waypoints = self.waypoint_firs(route.waypoints());
        debug!(
            "route {:?}: {} segments, traversed {traversed_firs:?}, {} unknown waypoints",
            route.full_route,
            segments.len(),
            waypoints.unknown_waypoints.len()
        );

        RouteAnalysis {
            route,
            segments,
            traversed_firs,
            waypoints,
        }
    }
}

#[cfg(test)]
mod test {
    use geo::{point, Point};
    use pretty_assertions_sorted::assert_eq_sorted;

    use crate::{
        fir::{
            classifier::{ClassifierMode, PointInRegionClassifier},
            FirBoundaryTable,
        },
        gazetteer::WaypointGazetteer,
    };

    use super::{FirSource, RouteFirAnalyzer, RouteSegment};

    fn assert_partition(segments: &[RouteSegment], len: usize) {
        let mut next = 0;
        for segment in segments {
            assert_eq!(segment.start_index, next);
            assert!(segment.end_index >= segment.start_index);
            assert_eq!(
                segment.coordinates.len(),
                segment.end_index - segment.start_index + 1
            );
            next = segment.end_index + 1;
        }
        assert_eq!(next, len);
    }

    #[test]
    fn test_single_fir_route() {
        let classifier = PointInRegionClassifier::new(
            FirBoundaryTable::embedded_subset(&["KZAK"]),
            ClassifierMode::Refined,
        );
        let gazetteer = WaypointGazetteer::builtin();
        let analyzer = RouteFirAnalyzer::new(&classifier, &gazetteer);

        let analysis = analyzer.analyze("N44E160..N46E170..N49E180");

        assert_eq_sorted!(
            analysis.segments,
            vec![RouteSegment {
                fir_code: Some("KZAK".to_string()),
                start_index: 0,
                end_index: 2,
                coordinates: vec![
                    point! { x: 160., y: 44. },
                    point! { x: 170., y: 46. },
                    point! { x: 180., y: 49. },
                ],
            }]
        );
        assert_eq!(analysis.traversed_firs, vec!["KZAK"]);
    }

    #[test]
    fn test_segments_include_gaps() {
        let classifier = PointInRegionClassifier::new(
            FirBoundaryTable::embedded_subset(&["KZAK"]),
            ClassifierMode::BoundingBox,
        );
        let gazetteer = WaypointGazetteer::empty();
        let analyzer = RouteFirAnalyzer::new(&classifier, &gazetteer);

        let route: Vec<Point> = vec![
            point! { x: 0., y: 51. },
            point! { x: 160., y: 44. },
            point! { x: 170., y: 46. },
            point! { x: 10., y: 51. },
            point! { x: -170., y: 30. },
        ];
        let segments = analyzer.segments(&route);

        assert_partition(&segments, route.len());
        assert_eq!(
            segments
                .iter()
                .map(|s| (s.fir_code.as_deref(), s.start_index, s.end_index))
                .collect::<Vec<_>>(),
            vec![
                (None, 0, 0),
                (Some("KZAK"), 1, 2),
                (None, 3, 3),
                (Some("KZAK"), 4, 4),
            ]
        );
        assert_eq!(RouteFirAnalyzer::traversed_firs(&segments), vec!["KZAK"]);
        assert!(analyzer.segments(&[]).is_empty());
    }

    #[test]
    fn test_traversal_order() {
        let classifier =
            PointInRegionClassifier::new(FirBoundaryTable::embedded(), ClassifierMode::Refined);
        let gazetteer = WaypointGazetteer::builtin();
        let analyzer = RouteFirAnalyzer::new(&classifier, &gazetteer);

        let analysis = analyzer.analyze("N50E179.9..N10W160..N50W179.9");

        assert_partition(&analysis.segments, 3);
        assert_eq!(analysis.traversed_firs, vec!["PAZA", "KZAK"]);
        assert_eq!(analysis.segments.len(), 3);
    }

    #[test]
    fn test_waypoint_firs() {
        let classifier = PointInRegionClassifier::new(
            FirBoundaryTable::embedded_subset(&["KZAK"]),
            ClassifierMode::Refined,
        );
        let gazetteer = WaypointGazetteer::builtin();
        let analyzer = RouteFirAnalyzer::new(&classifier, &gazetteer);

        let analysis = analyzer.analyze("RKSI..EGOBA Y697 LANAT..ORNAI..ADNAP..NOSUCH..EGOBA");
        let waypoints = &analysis.waypoints;

        assert_eq!(waypoints.fir_of("EGOBA"), Some("RJJJ"));
        assert_eq!(waypoints.fir_of("LANAT"), Some("RJJJ"));
        assert_eq!(waypoints.fir_of("ORNAI"), Some("KZAK"));
        assert_eq!(
            waypoints.unknown_waypoints,
            vec!["RKSI", "ADNAP", "NOSUCH"]
        );
        assert_eq!(
            waypoints.fir_waypoints.get_vec("RJJJ"),
            Some(&vec!["EGOBA".to_string(), "LANAT".to_string()])
        );
        assert!(waypoints
            .waypoint_firs
            .iter()
            .filter(|entry| entry.fir_code == "RJJJ")
            .all(|entry| entry.source == FirSource::Estimate));
        assert_eq!(waypoints.estimated_firs(), vec!["RJJJ"]);
        assert!(analysis.segments.is_empty());
    }
}
