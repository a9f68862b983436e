use std::{io, path::Path};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::{Config, ConfigError},
    coordinate::{parse_coordinate, CoordinateError},
    filter::{FirNotamAnalysis, FirNotamFilter},
    fir::{
        classifier::PointInRegionClassifier,
        route::{RouteAnalysis, RouteFirAnalyzer},
        FirBoundaryTable,
    },
    flight_info::FlightInfo,
    gazetteer::{GazetteerError, WaypointGazetteer},
    local_time::LocalTimeFormatter,
    notam::{NotamRecord, NotamSegmenter},
    read_to_string,
    timezone::{LiveTimeZoneLookup, TimeZoneError, TimeZoneResolver},
    translate::{TranslateError, TranslationPool, Translator},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("time zones: {0}")]
    TimeZone(#[from] TimeZoneError),
    #[error("gazetteer: {0}")]
    Gazetteer(#[from] GazetteerError),
    #[error("translation: {0}")]
    Translate(#[from] TranslateError),
    #[error("coordinate: {0}")]
    Coordinate(#[from] CoordinateError),
    #[error("failed to decode bulletin: {0}")]
    Decode(#[from] io::Error),
}

pub type PipelineResult<T> = Result<T, Error>;

/// Bulletin text in, parsed and route-filtered NOTAMs out. Built once from a [`Config`], every
/// operation afterwards only reads shared state.
pub struct NotamPipeline {
    config: Config,
    segmenter: NotamSegmenter,
    classifier: PointInRegionClassifier,
    gazetteer: WaypointGazetteer,
    resolver: TimeZoneResolver,
    filter: FirNotamFilter,
    translation: TranslationPool,
}

impl NotamPipeline {
    pub fn new(config: Config) -> PipelineResult<Self> {
        let gazetteer = match &config.gazetteer.csv_path {
            Some(path) => WaypointGazetteer::builtin().with_csv_file(path)?,
            None => WaypointGazetteer::builtin(),
        };
        let resolver = match &config.timezone.csv_path {
            Some(path) => TimeZoneResolver::new().with_csv_file(path)?,
            None => TimeZoneResolver::new(),
        };
        let translation = TranslationPool::new(
            config.translation.max_workers,
            config.translation.strategy,
            config.translation.batch_size,
            config.translation.on_failure,
        )?;
        let classifier =
            PointInRegionClassifier::new(FirBoundaryTable::embedded(), config.classifier_mode);
        info!(
            "pipeline ready: {} FIRs ({:?}), {} waypoints, {} airport time zones",
            classifier.table().fir_codes().len(),
            config.classifier_mode,
            gazetteer.len(),
            resolver.csv_len()
        );

        Ok(Self {
            segmenter: NotamSegmenter::new(None, config.segmenter.boilerplate_length_threshold),
            classifier,
            gazetteer,
            resolver,
            filter: FirNotamFilter::new(),
            translation,
            config,
        })
    }

    pub fn from_config_file(path: &Path) -> PipelineResult<Self> {
        Self::new(Config::from_file(path)?)
    }

    /// Attaches a live time zone service, ignored unless `timezone.use_live_lookup` is set.
    pub fn with_live_lookup(mut self, live: Box<dyn LiveTimeZoneLookup>) -> Self {
        if self.config.timezone.use_live_lookup {
            self.resolver = self.resolver.with_live_lookup(live);
        } else {
            debug!("live time zone lookup disabled by config");
        }
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &TimeZoneResolver {
        &self.resolver
    }

    /// Segments, parses and localises a bulletin. Malformed blocks are logged and skipped.
    pub fn parse_bulletin(&self, bulletin: &str) -> Vec<NotamRecord> {
        let blocks = self.segmenter.segment(bulletin);
        let mut records = NotamRecord::parse_all(blocks.iter().map(String::as_str));
        if records.len() < blocks.len() {
            warn!("{} of {} blocks were not NOTAMs", blocks.len() - records.len(), blocks.len());
        }

        LocalTimeFormatter::new(&self.resolver).annotate(&mut records);
        debug!("parsed {} NOTAMs", records.len());
        records
    }

    /// Like [`Self::parse_bulletin`] for raw bytes, which may be Windows-1252 encoded.
    pub fn parse_bulletin_bytes(&self, bulletin: &[u8]) -> PipelineResult<Vec<NotamRecord>> {
        Ok(self.parse_bulletin(&read_to_string(bulletin)?))
    }

    pub fn flight_info(&self, bulletin: &str) -> FlightInfo {
        FlightInfo::parse(bulletin)
    }

    pub fn analyze_route(&self, route: &str) -> RouteAnalysis {
        RouteFirAnalyzer::new(&self.classifier, &self.gazetteer).analyze(route)
    }

    pub fn filter_for_route(&self, route: &str, records: &[NotamRecord]) -> FirNotamAnalysis {
        self.filter.analyze(self.analyze_route(route), records)
    }

    /// FIR of a single `DDMMSS[N|S] DDDMMSS[E|W]` literal.
    pub fn fir_of_coordinate(&self, literal: &str) -> PipelineResult<Option<String>> {
        let coord = parse_coordinate(literal)?;
        Ok(self
            .classifier
            .classify(coord.y, coord.x)
            .map(str::to_string))
    }

    /// Translated bodies, one per record in record order.
    pub fn translate(&self, translator: &dyn Translator, records: &[NotamRecord]) -> Vec<String> {
        let bodies = records
            .iter()
            .map(|record| record.body_text.as_str())
            .collect::<Vec<_>>();
        self.translation.translate_all(translator, &bodies)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use crate::{
        config::Config,
        notam::Category,
        translate::{AbbreviationTranslator, TRANSLATION_FAILED},
    };

    use super::{Error, NotamPipeline};

    const PACKAGE: &str = "KOREAN AIR NOTAM PACKAGE 1 OF 1
KE0041 / ICN / SEA
DEP: RKSI DEST: KSEA ALTN: KPDX
[DEP] RKSI/ICN INCHEON INTL
RUNWAY
RKSI Z0582/25
09JUL25 16:00 - 25SEP25 09:00
E) RWY 15L/33R CLOSED DUE TO WIP
[DEST] KSEA/SEA SEATTLE TACOMA INTL
05JUL25 12:00 - PERM KSEA A1234/25
E) OBST CRANE 250FT AGL 1NM N OF RWY 16L
END OF KOREAN AIR NOTAM PACKAGE
";

    fn pipeline() -> NotamPipeline {
        NotamPipeline::new(Config::default()).unwrap()
    }

    #[test]
    fn test_parse_bulletin() {
        let pipeline = pipeline();
        let records = pipeline.parse_bulletin(PACKAGE);

        assert_eq_sorted!(
            records
                .iter()
                .map(|record| (
                    record.notam_number.as_str(),
                    record.airport_code.as_str(),
                    record.category,
                    record.local_time_display.as_deref(),
                ))
                .collect::<Vec<_>>(),
            vec![
                (
                    "Z0582/25",
                    "RKSI",
                    Category::Runway,
                    Some("07/10 01:00 - 09/25 18:00 (+09:00)"),
                ),
                (
                    "A1234/25",
                    "KSEA",
                    Category::Obstruction,
                    Some("07/05 05:00 - PERM (-07:00)"),
                ),
            ]
        );

        let flight = pipeline.flight_info(PACKAGE);
        assert_eq!(flight.dep.as_deref(), Some("RKSI"));
        assert_eq!(flight.dest.as_deref(), Some("KSEA"));
    }

    #[test]
    fn test_windows_1252_bulletin() {
        let mut bytes = PACKAGE.as_bytes().to_vec();
        bytes.extend_from_slice(b"\xb0\n");
        assert_eq!(pipeline().parse_bulletin_bytes(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn test_filter_for_route() {
        let pipeline = pipeline();
        let records = pipeline.parse_bulletin(PACKAGE);
        let analysis = pipeline.filter_for_route("RKSI..N50E179.9..N10W160..KSEA", &records);

        assert_eq!(analysis.route.traversed_firs, vec!["PAZA", "KZAK"]);
        assert_eq!(analysis.notams_for("PAZA").len(), 1);
        assert_eq!(analysis.notams_for("PAZA")[0].notam_number, "A1234/25");
        assert!(analysis.notams_for("KZAK").is_empty());
        assert!(analysis.waypoint_notams.is_empty());
        assert_eq!(analysis.total_relevant_notams, 1);
    }

    #[test]
    fn test_translate() {
        let pipeline = pipeline();
        let records = pipeline.parse_bulletin(PACKAGE);
        let translated = pipeline.translate(&AbbreviationTranslator, &records);

        assert_eq!(translated.len(), 2);
        assert_eq!(translated[0], "runway 15L/33R CLOSED DUE TO work in progress");
        assert!(translated.iter().all(|text| text != TRANSLATION_FAILED));
    }

    #[test]
    fn test_coordinate_literal() {
        let pipeline = pipeline();
        assert!(matches!(
            pipeline.fir_of_coordinate("not a coordinate"),
            Err(Error::Coordinate(_))
        ));
        assert_eq!(pipeline.fir_of_coordinate("000000N 1000000W").unwrap(), None);
    }
}
