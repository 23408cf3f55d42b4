//! Telemetry store: operation counters and derived statistics.
//!
//! Every counter is an atomic updated through [`TelemetryStore`]; callers
//! never touch the atomics directly. A store may forward to a parent so a
//! registry sees the searches of every index it created.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::{FieldDataType, FieldSchema, FieldValue, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Update,
    Remove,
    Search,
    Rebuild,
    Save,
}

impl Operation {
    const ALL: [Self; 6] = [
        Self::Add,
        Self::Update,
        Self::Remove,
        Self::Search,
        Self::Rebuild,
        Self::Save,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct OperationCounter {
    count: AtomicU64,
    micros: AtomicU64,
}

/// Atomic counters owned by one index (or one registry).
#[derive(Debug)]
pub struct TelemetryStore {
    operations: [OperationCounter; 6],
    failed: AtomicU64,
    items_examined: AtomicU64,
    items_matched: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    started: Mutex<(Instant, DateTime<Utc>)>,
    parent: Option<Arc<TelemetryStore>>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operations: Default::default(),
            failed: AtomicU64::new(0),
            items_examined: AtomicU64::new(0),
            items_matched: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            started: Mutex::new((Instant::now(), Utc::now())),
            parent: None,
        }
    }

    /// A store whose operation counts are also added to `parent`.
    #[must_use]
    pub fn with_parent(parent: Arc<Self>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new()
        }
    }

    pub fn record_success(&self, operation: Operation, elapsed: Duration) {
        let counter = &self.operations[operation.slot()];
        counter.count.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        counter.micros.fetch_add(micros, Ordering::Relaxed);
        if let Some(parent) = &self.parent {
            parent.record_success(operation, elapsed);
        }
    }

    pub fn record_failure(&self, operation: Operation) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Some(parent) = &self.parent {
            parent.record_failure(operation);
        }
    }

    pub fn record_filter(&self, examined: u64, matched: u64) {
        self.items_examined.fetch_add(examined, Ordering::Relaxed);
        self.items_matched.fetch_add(matched, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn count(&self, operation: Operation) -> u64 {
        self.operations[operation.slot()].count.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> TelemetryCounters {
        let load = |op: Operation| {
            let counter = &self.operations[op.slot()];
            (
                counter.count.load(Ordering::Relaxed),
                counter.micros.load(Ordering::Relaxed),
            )
        };
        let (add_operations, add_time_us) = load(Operation::Add);
        let (update_operations, update_time_us) = load(Operation::Update);
        let (remove_operations, remove_time_us) = load(Operation::Remove);
        let (search_operations, search_time_us) = load(Operation::Search);
        let (rebuild_operations, rebuild_time_us) = load(Operation::Rebuild);
        let (save_operations, save_time_us) = load(Operation::Save);

        TelemetryCounters {
            add_operations,
            update_operations,
            remove_operations,
            search_operations,
            rebuild_operations,
            save_operations,
            failed_operations: self.failed.load(Ordering::Relaxed),
            items_examined: self.items_examined.load(Ordering::Relaxed),
            items_matched: self.items_matched.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            add_time_us,
            update_time_us,
            remove_time_us,
            search_time_us,
            rebuild_time_us,
            save_time_us,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.lock().0.elapsed()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started.lock().1
    }

    #[must_use]
    pub fn derived(&self) -> DerivedStatistics {
        DerivedStatistics::calculate(&self.snapshot(), self.elapsed())
    }

    /// Zero every counter and restart the clock. The parent is untouched.
    pub fn reset(&self) {
        for op in Operation::ALL {
            let counter = &self.operations[op.slot()];
            counter.count.store(0, Ordering::Relaxed);
            counter.micros.store(0, Ordering::Relaxed);
        }
        for counter in [
            &self.failed,
            &self.items_examined,
            &self.items_matched,
            &self.cache_hits,
            &self.cache_misses,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.started.lock() = (Instant::now(), Utc::now());
    }
}

/// Plain copy of the raw counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub add_operations: u64,
    pub update_operations: u64,
    pub remove_operations: u64,
    pub search_operations: u64,
    pub rebuild_operations: u64,
    pub save_operations: u64,
    pub failed_operations: u64,
    pub items_examined: u64,
    pub items_matched: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub add_time_us: u64,
    pub update_time_us: u64,
    pub remove_time_us: u64,
    pub search_time_us: u64,
    pub rebuild_time_us: u64,
    pub save_time_us: u64,
}

impl TelemetryCounters {
    #[must_use]
    pub const fn successful_operations(&self) -> u64 {
        self.add_operations
            + self.update_operations
            + self.remove_operations
            + self.search_operations
            + self.rebuild_operations
            + self.save_operations
    }

    #[must_use]
    pub const fn total_operations(&self) -> u64 {
        self.successful_operations() + self.failed_operations
    }
}

/// Values computed from counters. Zero denominators yield 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStatistics {
    pub total_operations: u64,
    pub success_rate: f64,
    pub throughput_ops_per_second: f64,
    pub cache_hit_ratio: f64,
    pub efficiency_ratio: f64,
    pub average_search_time_ms: f64,
    pub average_insert_time_ms: f64,
    pub average_update_time_ms: f64,
    pub average_remove_time_ms: f64,
}

impl DerivedStatistics {
    /// Pure function of `counters` and `elapsed`.
    #[must_use]
    pub fn calculate(counters: &TelemetryCounters, elapsed: Duration) -> Self {
        let total = counters.total_operations();
        Self {
            total_operations: total,
            success_rate: ratio(counters.successful_operations(), total),
            throughput_ops_per_second: {
                let seconds = elapsed.as_secs_f64();
                if seconds > 0.0 { as_f64(total) / seconds } else { 0.0 }
            },
            cache_hit_ratio: ratio(counters.cache_hits, counters.cache_hits + counters.cache_misses),
            efficiency_ratio: ratio(counters.items_matched, counters.items_examined),
            average_search_time_ms: average_ms(counters.search_time_us, counters.search_operations),
            average_insert_time_ms: average_ms(counters.add_time_us, counters.add_operations),
            average_update_time_ms: average_ms(counters.update_time_us, counters.update_operations),
            average_remove_time_ms: average_ms(counters.remove_time_us, counters.remove_operations),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: u64) -> f64 {
    n as f64
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        as_f64(numerator) / as_f64(denominator)
    }
}

fn average_ms(total_us: u64, count: u64) -> f64 {
    ratio(total_us, count) / 1000.0
}

/// Per-field value statistics, recomputed on rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub non_null_count: usize,
    pub null_count: usize,
    pub distinct_values: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<FieldValue>,
}

impl FieldStats {
    /// Statistics for one field over `records`.
    pub fn collect<'a>(
        field_name: &str,
        data_type: FieldDataType,
        records: impl IntoIterator<Item = &'a Record>,
    ) -> Self {
        let mut stats = Self::default();
        let mut distinct = HashSet::new();
        for record in records {
            let value = record.value(field_name);
            if value.is_null() {
                stats.null_count += 1;
                continue;
            }
            stats.non_null_count += 1;
            distinct.insert(
                value
                    .index_key()
                    .unwrap_or_else(|| value.display_string().to_lowercase()),
            );
            if data_type.is_ordered() {
                let lower = stats
                    .min
                    .as_ref()
                    .is_none_or(|min| value.sort_compare(min, data_type).is_lt());
                if lower {
                    stats.min = Some(value.clone());
                }
                let higher = stats
                    .max
                    .as_ref()
                    .is_none_or(|max| value.sort_compare(max, data_type).is_gt());
                if higher {
                    stats.max = Some(value.clone());
                }
            }
        }
        stats.distinct_values = distinct.len();
        stats
    }
}

/// Statistics for every declared field.
pub fn field_statistics<'a, I>(schema: &FieldSchema, records: I) -> BTreeMap<String, FieldStats>
where
    I: IntoIterator<Item = &'a Record>,
    I::IntoIter: Clone,
{
    let records = records.into_iter();
    schema
        .iter()
        .map(|field| {
            (
                field.field_name.clone(),
                FieldStats::collect(&field.field_name, field.data_type, records.clone()),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub enabled: bool,
    pub capacity: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    /// Most hits served by a single live entry.
    pub hottest_entry_hits: u64,
    /// Age of the oldest live entry.
    pub oldest_entry_age_ms: f64,
}

/// Everything `get_statistics` reports for one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_items: usize,
    pub index_size_bytes: usize,
    pub average_search_time_ms: f64,
    pub average_insert_time_ms: f64,
    pub average_update_time_ms: f64,
    pub average_remove_time_ms: f64,
    pub counters: TelemetryCounters,
    pub derived: DerivedStatistics,
    pub field_statistics: BTreeMap<String, FieldStats>,
    pub cache_statistics: CacheStatistics,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: f64,
}

impl PerformanceMetrics {
    #[must_use]
    pub fn assemble(
        telemetry: &TelemetryStore,
        total_items: usize,
        index_size_bytes: usize,
        field_statistics: BTreeMap<String, FieldStats>,
        cache_statistics: CacheStatistics,
    ) -> Self {
        let counters = telemetry.snapshot();
        let elapsed = telemetry.elapsed();
        let derived = DerivedStatistics::calculate(&counters, elapsed);
        Self {
            total_items,
            index_size_bytes,
            average_search_time_ms: derived.average_search_time_ms,
            average_insert_time_ms: derived.average_insert_time_ms,
            average_update_time_ms: derived.average_update_time_ms,
            average_remove_time_ms: derived.average_remove_time_ms,
            counters,
            derived,
            field_statistics,
            cache_statistics,
            started_at: telemetry.started_at(),
            uptime_seconds: elapsed.as_secs_f64(),
        }
    }
}
