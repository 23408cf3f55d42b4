use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Engine-wide settings shared by every index a process creates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub index: IndexDefaults,
}

impl EngineConfig {
    /// Defaults, then the explicit file (or `DYNIDX_CONFIG`, or the user
    /// config file when present), then `DYNIDX_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("DYNIDX_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                EngineError::Config(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Defaults merged with a single TOML file; no environment lookups.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        let patch = Self::load_patch(path)?.ok_or_else(|| {
            EngineError::Config(format!("config file {} not found", path.display()))
        })?;
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    /// Defaults merged with TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config = Self::default();
        let patch = toml::from_str(raw)
            .map_err(|err| EngineError::Config(format!("parse config: {err}")))?;
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if search.default_page_size == 0 {
            return Err(EngineError::Config(
                "search.default_page_size must be positive".to_string(),
            ));
        }
        if search.max_page_size < search.default_page_size {
            return Err(EngineError::Config(format!(
                "search.max_page_size {} is below search.default_page_size {}",
                search.max_page_size, search.default_page_size
            )));
        }
        if !(0.0..=1.0).contains(&search.fuzzy_threshold) {
            return Err(EngineError::Config(format!(
                "search.fuzzy_threshold {} is outside [0, 1]",
                search.fuzzy_threshold
            )));
        }
        if self.index.default_max_items == Some(0) {
            return Err(EngineError::Config(
                "index.default_max_items must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("dynidx/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| EngineError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
        if let Some(patch) = patch.codec {
            self.codec.merge(patch);
        }
        if let Some(patch) = patch.index {
            self.index.merge(patch);
        }
    }

    /// Apply `DYNIDX_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        if let Some(value) = env.parse::<usize>("DYNIDX_SEARCH_DEFAULT_PAGE_SIZE")? {
            self.search.default_page_size = value;
        }
        if let Some(value) = env.parse::<usize>("DYNIDX_SEARCH_MAX_PAGE_SIZE")? {
            self.search.max_page_size = value;
        }
        if let Some(value) = env.parse::<f64>("DYNIDX_SEARCH_FUZZY_THRESHOLD")? {
            self.search.fuzzy_threshold = value;
        }
        if let Some(value) = env.parse::<u64>("DYNIDX_SEARCH_SLOW_QUERY_MS")? {
            self.search.slow_query_ms = value;
        }
        if let Some(value) = env.parse::<usize>("DYNIDX_SEARCH_PARALLEL_THRESHOLD")? {
            self.search.parallel_threshold = value;
        }

        if let Some(value) = env.bool("DYNIDX_CACHE_ENABLED") {
            self.cache.enabled = value;
        }
        if env.bool("DYNIDX_CACHE_DISABLED").unwrap_or(false) {
            self.cache.enabled = false;
        }
        if let Some(value) = env.parse::<usize>("DYNIDX_CACHE_CAPACITY")? {
            self.cache.capacity = value;
        }

        if let Some(value) = env.parse::<u32>("DYNIDX_CODEC_LEVEL")? {
            self.codec.level = value.min(9);
        }

        if let Some(value) = env.parse::<usize>("DYNIDX_INDEX_DEFAULT_MAX_ITEMS")? {
            self.index.default_max_items = Some(value);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Searches slower than this are logged at warn level.
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
    /// Collections at or above this size are filtered in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

const fn default_page_size() -> usize {
    20
}

const fn default_max_page_size() -> usize {
    1000
}

const fn default_fuzzy_threshold() -> f64 {
    crate::query::fuzzy::DEFAULT_FUZZY_THRESHOLD
}

const fn default_slow_query_ms() -> u64 {
    250
}

const fn default_parallel_threshold() -> usize {
    10_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            fuzzy_threshold: default_fuzzy_threshold(),
            slow_query_ms: default_slow_query_ms(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_page_size {
            self.default_page_size = value;
        }
        if let Some(value) = patch.max_page_size {
            self.max_page_size = value;
        }
        if let Some(value) = patch.fuzzy_threshold {
            self.fuzzy_threshold = value;
        }
        if let Some(value) = patch.slow_query_ms {
            self.slow_query_ms = value;
        }
        if let Some(value) = patch.parallel_threshold {
            self.parallel_threshold = value;
        }
    }
}

/// Per-instance query result cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

const fn default_cache_enabled() -> bool {
    true
}

const fn default_cache_capacity() -> usize {
    128
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            capacity: default_cache_capacity(),
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.capacity {
            self.capacity = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// gzip level, 0 (store) to 9 (best).
    #[serde(default = "default_codec_level")]
    pub level: u32,
}

const fn default_codec_level() -> u32 {
    6
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            level: default_codec_level(),
        }
    }
}

impl CodecConfig {
    fn merge(&mut self, patch: CodecPatch) {
        if let Some(value) = patch.level {
            self.level = value.min(9);
        }
    }
}

/// Defaults applied to index configurations that leave a setting unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_items: Option<usize>,
}

impl IndexDefaults {
    fn merge(&mut self, patch: IndexPatch) {
        if let Some(value) = patch.default_max_items {
            self.default_max_items = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub search: Option<SearchPatch>,
    pub cache: Option<CachePatch>,
    pub codec: Option<CodecPatch>,
    pub index: Option<IndexPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_page_size: Option<usize>,
    pub max_page_size: Option<usize>,
    pub fuzzy_threshold: Option<f64>,
    pub slow_query_ms: Option<u64>,
    pub parallel_threshold: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub enabled: Option<bool>,
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CodecPatch {
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexPatch {
    pub default_max_items: Option<usize>,
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn bool(&self, key: &str) -> Option<bool> {
        (self.0)(key).map(|value| {
            matches!(
                value.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(key) {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|err| {
                EngineError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }
}
