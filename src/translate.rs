use once_cell::sync::Lazy;
use phf::phf_map;
use rayon::prelude::*;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const TRANSLATION_FAILED: &str = "translation failed";

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("translation service failed: {0}")]
    Service(String),
    #[error("translation service returned {returned} texts for a batch of {expected}")]
    BatchMismatch { expected: usize, returned: usize },
    #[error("failed to build translation worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type TranslateResult<T> = Result<T, TranslateError>;

/// Text-in, text-out translation service. An empty result counts as a failure.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> TranslateResult<String>;

    /// Several texts in one request, one result per input in input order.
    fn translate_batch(&self, texts: &[&str]) -> TranslateResult<Vec<String>> {
        texts.iter().map(|text| self.translate(text)).collect()
    }
}

pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, text: &str) -> TranslateResult<String> {
        Ok(text.to_string())
    }
}

static ABBREVIATIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "ACFT" => "aircraft",
    "AMSL" => "above mean sea level",
    "APCH" => "approach",
    "AVBL" => "available",
    "BTN" => "between",
    "CLSD" => "closed",
    "COND" => "condition",
    "DEP" => "departure",
    "EST" => "estimated",
    "EXC" => "except",
    "FLW" => "following",
    "FM" => "from",
    "HGT" => "height",
    "INFO" => "information",
    "LGT" => "lighting",
    "MAINT" => "maintenance",
    "OBST" => "obstacle",
    "OPR" => "operational",
    "REF" => "reference",
    "RWY" => "runway",
    "SKED" => "scheduled",
    "SVC" => "service",
    "TEMP" => "temporary",
    "THR" => "threshold",
    "TIL" => "until",
    "TWY" => "taxiway",
    "U/S" => "unserviceable",
    "UFN" => "until further notice",
    "WIP" => "work in progress",
};

static ABBREVIATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]+(?:/[A-Z]+)?\b").unwrap());

/// Offline translator expanding standard NOTAM contractions into plain English words.
pub struct AbbreviationTranslator;

impl AbbreviationTranslator {
    pub fn expand(text: &str) -> String {
        ABBREVIATION_RE
            .replace_all(text, |captures: &Captures| {
                let word = &captures[0];
                ABBREVIATIONS
                    .get(word)
                    .map_or_else(|| word.to_string(), |expansion| (*expansion).to_string())
            })
            .to_string()
    }
}

impl Translator for AbbreviationTranslator {
    fn translate(&self, text: &str) -> TranslateResult<String> {
        Ok(Self::expand(text))
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStrategy {
    #[default]
    Individual,
    Batch,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBatchSize {
    Fixed(usize),
    Keyword(String),
}

/// `"auto"` or a fixed number of texts per request.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawBatchSize")]
pub enum BatchSize {
    #[default]
    Auto,
    Fixed(usize),
}

impl TryFrom<RawBatchSize> for BatchSize {
    type Error = String;

    fn try_from(raw: RawBatchSize) -> Result<Self, Self::Error> {
        match raw {
            RawBatchSize::Fixed(0) => Err("batch size must be at least 1".to_string()),
            RawBatchSize::Fixed(size) => Ok(BatchSize::Fixed(size)),
            RawBatchSize::Keyword(keyword) if keyword == "auto" => Ok(BatchSize::Auto),
            RawBatchSize::Keyword(keyword) => Err(format!("unknown batch size {keyword:?}")),
        }
    }
}

impl BatchSize {
    /// Short texts share a request, long ones go alone.
    pub fn resolve(&self, texts: &[&str]) -> usize {
        match self {
            BatchSize::Fixed(size) => (*size).max(1),
            BatchSize::Auto => {
                if texts.is_empty() {
                    return 1;
                }
                let average = texts.iter().map(|text| text.len()).sum::<usize>() / texts.len();
                match average {
                    0..200 => 3,
                    200..500 => 2,
                    _ => 1,
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// replace the text with [`TRANSLATION_FAILED`]
    #[default]
    Sentinel,
    /// keep the untranslated text
    Passthrough,
}

/// Fans translation requests out over a bounded worker pool. Results keep the input order and a
/// failed text never affects the others.
pub struct TranslationPool {
    pool: rayon::ThreadPool,
    strategy: TranslationStrategy,
    batch_size: BatchSize,
    on_failure: FailurePolicy,
}

impl TranslationPool {
    pub const MAX_WORKERS: usize = 8;

    pub fn new(
        max_workers: usize,
        strategy: TranslationStrategy,
        batch_size: BatchSize,
        on_failure: FailurePolicy,
    ) -> TranslateResult<Self> {
        let workers = max_workers.clamp(1, Self::MAX_WORKERS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("translate-{i}"))
            .build()?;
        debug!("translation pool with {workers} workers, {strategy:?} strategy");

        Ok(Self {
            pool,
            strategy,
            batch_size,
            on_failure,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn failed(&self, text: &str) -> String {
        match self.on_failure {
            FailurePolicy::Sentinel => TRANSLATION_FAILED.to_string(),
            FailurePolicy::Passthrough => text.to_string(),
        }
    }

    fn translate_one(&self, translator: &dyn Translator, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        match translator.translate(text) {
            Ok(translated) if !translated.trim().is_empty() => translated,
            Ok(_) => {
                warn!("empty translation for {:?}", truncated(text));
                self.failed(text)
            }
            Err(e) => {
                warn!("translation of {:?} failed: {e}", truncated(text));
                self.failed(text)
            }
        }
    }

    fn translate_chunk(&self, translator: &dyn Translator, chunk: &[&str]) -> Vec<String> {
        if chunk.len() == 1 {
            return vec![self.translate_one(translator, chunk[0])];
        }

        let batch = translator.translate_batch(chunk).and_then(|translated| {
            if translated.len() == chunk.len() {
                Ok(translated)
            } else {
                Err(TranslateError::BatchMismatch {
                    expected: chunk.len(),
                    returned: translated.len(),
                })
            }
        });

        match batch {
            Ok(translated) if translated.iter().all(|text| !text.trim().is_empty()) => translated,
            Ok(_) => {
                warn!("batch of {} had empty results, retrying one by one", chunk.len());
                self.translate_each(translator, chunk)
            }
            Err(e) => {
                warn!("{e}, retrying one by one");
                self.translate_each(translator, chunk)
            }
        }
    }

    fn translate_each(&self, translator: &dyn Translator, texts: &[&str]) -> Vec<String> {
        texts
            .par_iter()
            .map(|text| self.translate_one(translator, text))
            .collect()
    }

    /// One result per input text, in input order.
    pub fn translate_all(&self, translator: &dyn Translator, texts: &[&str]) -> Vec<String> {
        self.pool.install(|| match self.strategy {
            TranslationStrategy::Individual => self.translate_each(translator, texts),
            TranslationStrategy::Batch => {
                let size = self.batch_size.resolve(texts);
                debug!("translating {} texts in batches of {size}", texts.len());
                texts
                    .par_chunks(size)
                    .map(|chunk| self.translate_chunk(translator, chunk))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .flatten()
                    .collect()
            }
        })
    }
}

fn truncated(text: &str) -> &str {
    text.char_indices()
        .nth(40)
        .map_or(text, |(index, _)| &text[..index])
}
