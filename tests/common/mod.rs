//! Helpers shared by the integration and property suites.

#![allow(dead_code)]

use std::path::PathBuf;

use dynidx::EngineConfig;
use dynidx::model::Record;
use dynidx::query::{SearchHit, SearchResult};

pub const SEED: u64 = 42;

#[must_use]
pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

/// Defaults with the result cache off, so every search runs the pipeline.
#[must_use]
pub fn uncached() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.cache.enabled = false;
    config
}

#[must_use]
pub fn number(record: &Record, field: &str) -> f64 {
    record.value(field).as_number().unwrap_or(f64::NAN)
}

#[must_use]
pub fn text<'a>(record: &'a Record, field: &str) -> &'a str {
    record.value(field).as_text().unwrap_or_default()
}

#[must_use]
pub fn ids(result: &SearchResult<SearchHit>) -> Vec<String> {
    result.items.iter().map(|hit| hit.id.clone()).collect()
}
