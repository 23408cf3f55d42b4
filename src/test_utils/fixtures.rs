//! Synthetic property listings and scratch directories.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::index::IndexInstance;
use crate::model::{FieldDefinition, IndexConfiguration, Record};

pub const CITIES: [&str; 6] = ["Sanaa", "Aden", "Taiz", "Hodeidah", "Ibb", "Mukalla"];

pub const NAME_PREFIXES: [&str; 7] = [
    "Hotel",
    "Grand Hotel",
    "Villa",
    "Apartment",
    "Residence",
    "Guest House",
    "Chalet",
];

pub const AMENITIES: [&str; 5] = ["wifi", "pool", "parking", "breakfast", "gym"];

/// 2024-01-01T00:00:00Z
const LISTED_EPOCH: i64 = 1_704_067_200;

#[must_use]
pub fn property_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::text("Name").required().sortable(),
        FieldDefinition::select("City", CITIES).required().sortable(),
        FieldDefinition::number("Price").sortable().min(0.0),
        FieldDefinition::number("Rating").sortable().min(0.0).max(5.0),
        FieldDefinition::multi_select("Amenities", AMENITIES),
        FieldDefinition::boolean("Available"),
        FieldDefinition::date("ListedOn").sortable(),
    ]
}

pub fn property_config(name: &str) -> Result<IndexConfiguration> {
    IndexConfiguration::new(name)
        .with_type("properties")
        .with_fields(property_fields())
}

/// `count` listings, deterministic for a given `seed`.
///
/// Cities and name prefixes cycle with the item number, so every city and
/// prefix shows up once `count` is large enough. Price, rating, amenities
/// and listing date are drawn from the seeded generator.
#[must_use]
pub fn property_records(count: usize, seed: u64) -> Vec<(String, Record)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let city = CITIES[i % CITIES.len()];
            let prefix = NAME_PREFIXES[i % NAME_PREFIXES.len()];
            let price = f64::from(rng.random_range(3_000..=50_000_i32)) / 100.0;
            let rating = f64::from(rng.random_range(10..=50_i32)) / 10.0;
            let amenities: Vec<&str> = AMENITIES
                .iter()
                .copied()
                .filter(|_| rng.random_bool(0.4))
                .collect();
            let listed_on =
                DateTime::from_timestamp(LISTED_EPOCH + rng.random_range(0..365_i64) * 86_400, 0);

            let record = Record::new()
                .with("Name", format!("{prefix} {city} {i}"))
                .with("City", city)
                .with("Price", price)
                .with("Rating", rating)
                .with("Amenities", amenities)
                .with("Available", rng.random_bool(0.7))
                .with("ListedOn", listed_on);
            (format!("prop-{i:03}"), record)
        })
        .collect()
}

/// An active property index loaded with [`property_records`].
pub fn property_index(count: usize, seed: u64, settings: &EngineConfig) -> Result<IndexInstance> {
    let index = IndexInstance::new(property_config("properties")?, settings)?;
    index.activate()?;
    for (id, record) in property_records(count, seed) {
        index.add_item(id, record)?;
    }
    Ok(index)
}

/// Scratch directory removed on drop.
pub struct TempWorkspace {
    pub temp_dir: TempDir,
}

impl TempWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path inside the workspace; nothing is created.
    #[must_use]
    pub fn join(&self, relative_path: &str) -> PathBuf {
        self.temp_dir.path().join(relative_path)
    }

    /// Write `content` to `relative_path`, creating parent directories.
    pub fn write_file(&self, relative_path: &str, content: &str) -> Result<PathBuf> {
        let full_path = self.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full_path, content)?;
        Ok(full_path)
    }
}
