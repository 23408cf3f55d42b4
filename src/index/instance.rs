//! A single named index: records, schema, lifecycle and search.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{
    FieldDefinition, FieldSchema, FieldValue, IndexConfiguration, IndexStatus, Record,
};
use crate::query::{
    self, QueryEngine, QueryPlan, SearchHit, SearchRequest, SearchResult, Searchable,
    validate_request,
};
use crate::telemetry::{
    CacheStatistics, Operation, PerformanceMetrics, TelemetryStore, field_statistics,
};

use super::cache::QueryCache;
use super::snapshot::{IndexSnapshot, SnapshotItem};

#[derive(Debug, Clone)]
struct StoredItem {
    id: String,
    record: Record,
    encoded_len: usize,
}

impl Searchable for StoredItem {
    fn record(&self) -> &Record {
        &self.record
    }
}

/// field name -> index key -> sequence numbers
type Postings = HashMap<String, HashMap<String, BTreeSet<u64>>>;

#[derive(Debug)]
struct IndexState {
    config: IndexConfiguration,
    /// Keyed by insertion sequence, so iteration is insertion order.
    items: BTreeMap<u64, StoredItem>,
    ids: HashMap<String, u64>,
    next_seq: u64,
    postings: Postings,
    size_bytes: usize,
}

impl IndexState {
    fn new(config: IndexConfiguration) -> Self {
        Self {
            config,
            items: BTreeMap::new(),
            ids: HashMap::new(),
            next_seq: 0,
            postings: Postings::new(),
            size_bytes: 0,
        }
    }

    fn invalid_state(&self, operation: &str) -> EngineError {
        EngineError::InvalidState {
            index: self.config.name.clone(),
            state: self.config.status.to_string(),
            operation: operation.to_string(),
        }
    }

    fn ensure_mutable(&self, operation: &str) -> Result<()> {
        match self.config.status {
            IndexStatus::Active => Ok(()),
            IndexStatus::Building | IndexStatus::Disabled => Err(self.invalid_state(operation)),
        }
    }

    fn ensure_searchable(&self) -> Result<()> {
        match self.config.status {
            IndexStatus::Building | IndexStatus::Active => Ok(()),
            IndexStatus::Disabled => Err(self.invalid_state("search")),
        }
    }

    fn posting_keys(value: &FieldValue) -> Vec<String> {
        match value {
            FieldValue::List(items) => items.iter().filter_map(FieldValue::index_key).collect(),
            other => other.index_key().into_iter().collect(),
        }
    }

    fn index_record(&mut self, seq: u64, record: &Record) {
        for field in &self.config.fields {
            if !field.data_type.supports_postings() {
                continue;
            }
            let Some(value) = record.get(&field.field_name) else {
                continue;
            };
            let by_key = self.postings.entry(field.field_name.clone()).or_default();
            for key in Self::posting_keys(value) {
                by_key.entry(key).or_default().insert(seq);
            }
        }
    }

    fn unindex_record(&mut self, seq: u64, record: &Record) {
        for (field_name, by_key) in &mut self.postings {
            let Some(value) = record.get(field_name) else {
                continue;
            };
            for key in Self::posting_keys(value) {
                if let Some(seqs) = by_key.get_mut(&key) {
                    seqs.remove(&seq);
                    if seqs.is_empty() {
                        by_key.remove(&key);
                    }
                }
            }
        }
    }

    fn rebuild(&mut self) {
        self.postings.clear();
        for field in &self.config.fields {
            if field.data_type.supports_postings() {
                self.postings.insert(field.field_name.clone(), HashMap::new());
            }
        }
        let items = std::mem::take(&mut self.items);
        self.size_bytes = 0;
        for (seq, mut item) in items {
            item.encoded_len = encoded_len(&item.record);
            self.size_bytes += item.encoded_len;
            self.index_record(seq, &item.record);
            self.items.insert(seq, item);
        }
    }

    /// Candidates in insertion order, narrowed by the smallest postings
    /// list among the plan's required equality criteria.
    fn candidates(&self, plan: &QueryPlan) -> Vec<&StoredItem> {
        let mut narrowest: Option<BTreeSet<u64>> = None;
        for (field_name, operands) in plan.equality_lookups() {
            let Some(by_key) = self.postings.get(field_name) else {
                continue;
            };
            let mut seqs = BTreeSet::new();
            let mut usable = true;
            for operand in operands {
                match operand.index_key() {
                    Some(key) => {
                        if let Some(found) = by_key.get(&key) {
                            seqs.extend(found.iter().copied());
                        }
                    }
                    None => {
                        usable = false;
                        break;
                    }
                }
            }
            if usable && narrowest.as_ref().is_none_or(|best| seqs.len() < best.len()) {
                narrowest = Some(seqs);
            }
        }

        match narrowest {
            Some(seqs) => seqs.iter().filter_map(|seq| self.items.get(seq)).collect(),
            None => self.items.values().collect(),
        }
    }

    fn max_items(&self, defaults: Option<usize>) -> Option<usize> {
        self.config.max_items.or(defaults)
    }
}

fn encoded_len(record: &Record) -> usize {
    serde_json::to_vec(record).map_or(0, |bytes| bytes.len())
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(EngineError::Validation("item id is required".to_string()));
    }
    Ok(())
}

/// One index instance. Shared behind `Arc`; searches take a read lock,
/// mutations and schema changes take the write lock.
#[derive(Debug)]
pub struct IndexInstance {
    state: RwLock<IndexState>,
    settings: EngineConfig,
    engine: QueryEngine,
    codec: Codec,
    cache: QueryCache,
    telemetry: TelemetryStore,
}

impl IndexInstance {
    /// Create an index in `Building` status.
    pub fn new(config: IndexConfiguration, settings: &EngineConfig) -> Result<Self> {
        Self::create(config, settings, None)
    }

    pub(crate) fn create(
        mut config: IndexConfiguration,
        settings: &EngineConfig,
        parent: Option<Arc<TelemetryStore>>,
    ) -> Result<Self> {
        config.validate()?;
        config.status = IndexStatus::Building;
        config.is_enabled = true;
        let mut state = IndexState::new(config);
        state.rebuild();
        let instance = Self::assemble(state, settings, parent);
        info!(
            target: "index",
            index = %instance.name(),
            fields = instance.state.read().config.fields.len(),
            "index created"
        );
        Ok(instance)
    }

    fn assemble(
        state: IndexState,
        settings: &EngineConfig,
        parent: Option<Arc<TelemetryStore>>,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            settings: settings.clone(),
            engine: QueryEngine::new(settings.search.parallel_threshold),
            codec: Codec::new(settings.codec.level),
            cache: QueryCache::new(&settings.cache),
            telemetry: parent.map_or_else(TelemetryStore::new, TelemetryStore::with_parent),
        }
    }

    // ---- accessors ----

    #[must_use]
    pub fn name(&self) -> String {
        self.state.read().config.name.clone()
    }

    #[must_use]
    pub fn index_id(&self) -> String {
        self.state.read().config.index_id.clone()
    }

    #[must_use]
    pub fn status(&self) -> IndexStatus {
        self.state.read().config.status
    }

    #[must_use]
    pub fn configuration(&self) -> IndexConfiguration {
        self.state.read().config.clone()
    }

    #[must_use]
    pub fn schema(&self) -> FieldSchema {
        self.state.read().config.fields.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item ids in insertion order.
    #[must_use]
    pub fn item_ids(&self) -> Vec<String> {
        self.state
            .read()
            .items
            .values()
            .map(|item| item.id.clone())
            .collect()
    }

    #[must_use]
    pub fn get_item(&self, id: &str) -> Option<Record> {
        let state = self.state.read();
        let seq = state.ids.get(id)?;
        state.items.get(seq).map(|item| item.record.clone())
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.state.read().size_bytes
    }

    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    // ---- lifecycle ----

    /// `Building` -> `Active`.
    pub fn activate(&self) -> Result<()> {
        self.transition(IndexStatus::Building, IndexStatus::Active, "activate")
    }

    /// `Active` -> `Disabled`. Records are kept.
    pub fn disable(&self) -> Result<()> {
        self.transition(IndexStatus::Active, IndexStatus::Disabled, "disable")
    }

    /// `Disabled` -> `Active`.
    pub fn enable(&self) -> Result<()> {
        self.transition(IndexStatus::Disabled, IndexStatus::Active, "enable")
    }

    fn transition(&self, from: IndexStatus, to: IndexStatus, operation: &str) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if state.config.status != from {
            let err = state.invalid_state(operation);
            debug!(target: "index", index = %state.config.name, %err, "transition rejected");
            return Err(err);
        }
        state.config.status = to;
        state.config.is_enabled = to != IndexStatus::Disabled;
        state.config.touch();
        self.cache.clear();
        info!(target: "index", index = %state.config.name, %from, %to, "status changed");
        Ok(())
    }

    // ---- schema ----

    /// Declare a new field.
    ///
    /// Values already stored under the field's name are validated against
    /// the new definition and replaced by their coerced form. Any failure
    /// rejects the whole change and leaves the index untouched. Postings are
    /// rebuilt once the field is in place.
    pub fn add_field(&self, field: FieldDefinition) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if state.config.status == IndexStatus::Disabled {
            return Err(state.invalid_state("add field"));
        }
        field.validate_definition()?;
        if state.config.fields.contains(&field.field_name) {
            return Err(EngineError::Validation(format!(
                "field {} already exists",
                field.field_name
            )));
        }

        let mut coerced = Vec::with_capacity(state.items.len());
        for (seq, item) in &state.items {
            let value = field
                .validate_value(item.record.value(&field.field_name))
                .map_err(|err| {
                    debug!(
                        target: "index",
                        index = %state.config.name,
                        field = %field.field_name,
                        id = %item.id,
                        %err,
                        "field rejected by existing item"
                    );
                    err
                })?;
            coerced.push((*seq, value));
        }

        let field_name = field.field_name.clone();
        state.config.fields.push(field)?;
        for (seq, value) in coerced {
            if let Some(item) = state.items.get_mut(&seq) {
                if value.is_null() {
                    item.record.remove(&field_name);
                } else {
                    item.record.insert(field_name.clone(), value);
                }
            }
        }
        state.rebuild();
        state.config.touch();
        self.cache.clear();
        Ok(())
    }

    /// Drop a field declaration. Stored values stay on the records but are
    /// no longer searchable.
    pub fn remove_field(&self, field_name: &str) -> Result<FieldDefinition> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if state.config.status == IndexStatus::Disabled {
            return Err(state.invalid_state("remove field"));
        }
        let removed = state
            .config
            .fields
            .remove(field_name)
            .ok_or_else(|| EngineError::UnknownField(field_name.to_string()))?;
        if state.config.status == IndexStatus::Active {
            state.rebuild();
        }
        state.config.touch();
        self.cache.clear();
        Ok(removed)
    }

    // ---- mutations ----

    pub fn add_item(&self, id: impl Into<String>, record: Record) -> Result<()> {
        let id = id.into();
        self.observe(Operation::Add, || {
            validate_id(&id)?;
            let mut guard = self.state.write();
            let state = &mut *guard;
            state.ensure_mutable("add item")?;
            if state.ids.contains_key(&id) {
                return Err(EngineError::DuplicateItem(id.clone()));
            }
            if let Some(max_items) = state.max_items(self.settings.index.default_max_items) {
                if state.items.len() >= max_items {
                    return Err(EngineError::CapacityExceeded {
                        index: state.config.name.clone(),
                        max_items,
                    });
                }
            }
            let record = state.config.fields.validate_record(&record)?;

            let seq = state.next_seq;
            state.next_seq += 1;
            state.index_record(seq, &record);
            let item = StoredItem {
                id: id.clone(),
                encoded_len: encoded_len(&record),
                record,
            };
            state.size_bytes += item.encoded_len;
            state.ids.insert(id.clone(), seq);
            state.items.insert(seq, item);
            self.cache.clear();
            debug!(target: "index", index = %state.config.name, id = %id, "item added");
            Ok(())
        })
    }

    /// Add any serializable value, typed through the schema.
    pub fn add_serializable<T: Serialize>(&self, id: impl Into<String>, value: &T) -> Result<()> {
        let record = Record::from_serializable(value, &self.schema())?;
        self.add_item(id, record)
    }

    /// Replace an existing record; its position in insertion order is kept.
    pub fn update_item(&self, id: &str, record: Record) -> Result<()> {
        self.observe(Operation::Update, || {
            let mut guard = self.state.write();
            let state = &mut *guard;
            state.ensure_mutable("update item")?;
            let seq = *state
                .ids
                .get(id)
                .ok_or_else(|| EngineError::ItemNotFound(id.to_string()))?;
            let record = state.config.fields.validate_record(&record)?;

            let Some(old) = state.items.get(&seq).map(|item| item.record.clone()) else {
                return Err(EngineError::ItemNotFound(id.to_string()));
            };
            state.unindex_record(seq, &old);
            state.index_record(seq, &record);
            let new_len = encoded_len(&record);
            if let Some(item) = state.items.get_mut(&seq) {
                let old_len = std::mem::replace(&mut item.encoded_len, new_len);
                item.record = record;
                state.size_bytes = state.size_bytes - old_len + new_len;
            }
            self.cache.clear();
            debug!(target: "index", index = %state.config.name, id = %id, "item updated");
            Ok(())
        })
    }

    /// Remove a record. `Ok(false)` when the id is unknown.
    pub fn remove_item(&self, id: &str) -> Result<bool> {
        let started = Instant::now();
        let result = self.remove_locked(id);
        match &result {
            Ok(true) => self.telemetry.record_success(Operation::Remove, started.elapsed()),
            Ok(false) | Err(_) => self.telemetry.record_failure(Operation::Remove),
        }
        result
    }

    fn remove_locked(&self, id: &str) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.ensure_mutable("remove item")?;
        let Some(seq) = state.ids.remove(id) else {
            debug!(target: "index", index = %state.config.name, id = %id, "remove of unknown item");
            return Ok(false);
        };
        if let Some(item) = state.items.remove(&seq) {
            state.unindex_record(seq, &item.record);
            state.size_bytes -= item.encoded_len;
        }
        self.cache.clear();
        debug!(target: "index", index = %state.config.name, id = %id, "item removed");
        Ok(true)
    }

    /// Time `f` and report its outcome to telemetry.
    fn observe<T>(&self, operation: Operation, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let result = f();
        match &result {
            Ok(_) => self.telemetry.record_success(operation, started.elapsed()),
            Err(err) => {
                self.telemetry.record_failure(operation);
                debug!(target: "index", ?operation, code = err.code(), %err, "operation failed");
            }
        }
        result
    }

    // ---- search ----

    /// Run a request. Accepted while `Building` or `Active`.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult<SearchHit>> {
        let started = Instant::now();
        let result = self.observe(Operation::Search, || self.search_locked(request, started));
        if let Ok(page) = &result {
            let elapsed = started.elapsed();
            if elapsed >= Duration::from_millis(self.settings.search.slow_query_ms) {
                warn!(
                    target: "index",
                    index = %self.name(),
                    elapsed_ms = elapsed.as_millis(),
                    criteria = request.criteria.len(),
                    total = page.total_count,
                    "slow search"
                );
            }
        }
        result
    }

    fn search_locked(
        &self,
        request: &SearchRequest,
        started: Instant,
    ) -> Result<SearchResult<SearchHit>> {
        let state = self.state.read();
        state.ensure_searchable()?;

        let key = self.cache.key(request);
        if let Some(key) = key {
            if let Some(mut cached) = self.cache.get(key) {
                self.telemetry.record_cache_hit();
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                cached.execution_time_ms = elapsed_ms;
                if let Some(stats) = cached.statistics.as_mut() {
                    stats.served_from_cache = true;
                    stats.execution_time_ms = elapsed_ms;
                }
                return Ok(cached);
            }
            self.telemetry.record_cache_miss();
        }

        let validated = validate_request(request, &state.config.fields, &self.settings.search)?;
        let candidates = state.candidates(&validated.plan);
        let result = query::execute(&candidates, &validated, &self.engine, &self.telemetry)
            .map_items(|scored| SearchHit {
                id: scored.item.id.clone(),
                score: scored.score,
                record: scored.item.record.clone(),
            });

        if let Some(key) = key {
            self.cache.put(key, result.clone());
        }
        Ok(result)
    }

    /// Search and convert each record into `T`.
    pub fn search_as<T: DeserializeOwned>(&self, request: &SearchRequest) -> Result<SearchResult<T>> {
        self.search(request)?
            .try_map_items(|hit| hit.record.to_typed())
    }

    // ---- maintenance ----

    /// Recompute postings and size estimates from the stored records.
    pub fn rebuild_index(&self) -> Result<bool> {
        self.observe(Operation::Rebuild, || {
            let mut state = self.state.write();
            state.rebuild();
            self.cache.clear();
            info!(target: "index", index = %state.config.name, items = state.items.len(), "index rebuilt");
            Ok(true)
        })
    }

    #[must_use]
    pub fn get_statistics(&self) -> PerformanceMetrics {
        let state = self.state.read();
        let fields = field_statistics(
            &state.config.fields,
            state.items.values().map(|item| &item.record),
        );
        let counters = self.telemetry.snapshot();
        let lookups = counters.cache_hits + counters.cache_misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_ratio = if lookups == 0 {
            0.0
        } else {
            counters.cache_hits as f64 / lookups as f64
        };
        let (hottest_entry_hits, oldest_entry_age) = self.cache.entry_summary();
        let cache = CacheStatistics {
            enabled: self.cache.is_enabled(),
            capacity: self.cache.capacity(),
            entries: self.cache.len(),
            hits: counters.cache_hits,
            misses: counters.cache_misses,
            hit_ratio,
            hottest_entry_hits,
            oldest_entry_age_ms: oldest_entry_age.as_secs_f64() * 1000.0,
        };
        PerformanceMetrics::assemble(
            &self.telemetry,
            state.items.len(),
            state.size_bytes,
            fields,
            cache,
        )
    }

    // ---- persistence ----

    fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();
        let items = state
            .items
            .values()
            .map(|item| SnapshotItem {
                id: item.id.clone(),
                record: item.record.clone(),
            })
            .collect();
        IndexSnapshot::new(state.config.clone(), items)
    }

    /// Persist configuration and records to `path` atomically.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        self.observe(Operation::Save, || {
            let snapshot = self.snapshot();
            snapshot.write_to(path, &self.codec)?;
            info!(
                target: "index",
                index = %snapshot.configuration.name,
                items = snapshot.items.len(),
                path = %path.display(),
                "index saved"
            );
            Ok(true)
        })
    }

    /// Reconstruct an index saved with [`IndexInstance::save_to_file`].
    pub fn load_from_file(path: impl AsRef<Path>, settings: &EngineConfig) -> Result<Self> {
        Self::load(path.as_ref(), settings, None)
    }

    pub(crate) fn load(
        path: &Path,
        settings: &EngineConfig,
        parent: Option<Arc<TelemetryStore>>,
    ) -> Result<Self> {
        let snapshot = IndexSnapshot::read_from(path, &Codec::new(settings.codec.level))?;
        snapshot.configuration.validate()?;

        let mut state = IndexState::new(snapshot.configuration);
        for item in snapshot.items {
            validate_id(&item.id)?;
            if state.ids.contains_key(&item.id) {
                return Err(EngineError::DuplicateItem(item.id));
            }
            let record = state.config.fields.validate_record(&item.record)?;
            let seq = state.next_seq;
            state.next_seq += 1;
            state.ids.insert(item.id.clone(), seq);
            state.items.insert(
                seq,
                StoredItem {
                    id: item.id,
                    record,
                    encoded_len: 0,
                },
            );
        }
        state.rebuild();
        info!(
            target: "index",
            index = %state.config.name,
            items = state.items.len(),
            status = %state.config.status,
            path = %path.display(),
            "index loaded"
        );

        Ok(Self::assemble(state, settings, parent))
    }

    /// The configuration, codec framed.
    pub fn export_configuration(&self) -> Result<Vec<u8>> {
        self.codec.compress(&self.configuration())
    }

    /// A result page, codec framed.
    pub fn export_results<T: Serialize>(&self, result: &SearchResult<T>) -> Result<Vec<u8>> {
        self.codec.compress(result)
    }

    /// Decode a configuration produced by [`IndexInstance::export_configuration`].
    pub fn import_configuration(&self, bytes: &[u8]) -> Result<IndexConfiguration> {
        self.codec.decompress(bytes)
    }
}
