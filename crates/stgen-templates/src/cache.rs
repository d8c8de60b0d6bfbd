//! Compiled-template cache with usage statistics.
//!
//! The cache is the only mutable state shared by generators. All of it sits
//! behind one mutex, and a lookup holds that mutex from the map check through
//! load, compile and insert, so a cold key is compiled exactly once no matter
//! how many threads ask for it at the same time.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use stgen_model::{FieldMap, RenderError};
use tracing::{debug, info, trace, warn};

use crate::error::TemplateError;
use crate::key::TemplateKey;
use crate::render::{CompiledTemplate, RenderOutput, render};
use crate::store::TemplateStore;

/// Number of most recent renders the average duration is computed over.
pub const RENDER_WINDOW: usize = 128;

/// One cached template and its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub template: Arc<CompiledTemplate>,
    pub created_at: DateTime<Utc>,
    pub size_estimate: usize,
    pub fingerprint: String,
    pub hits: u64,
    sequence: u64,
}

/// Metadata an [`EvictionPolicy`] decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub key: TemplateKey,
    pub created_at: DateTime<Utc>,
    pub size_estimate: usize,
    pub hits: u64,
    /// Insertion order, strictly increasing.
    pub sequence: u64,
}

/// Decides which entries to drop after an insert.
pub trait EvictionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the keys to evict. `entries` is sorted by insertion order,
    /// oldest first, and includes the entry just inserted.
    fn select_victims(&self, entries: &[EntryInfo]) -> Vec<TemplateKey>;
}

/// Keeps everything until `clear` or `invalidate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEviction;

impl EvictionPolicy for NoEviction {
    fn name(&self) -> &'static str {
        "none"
    }

    fn select_victims(&self, _entries: &[EntryInfo]) -> Vec<TemplateKey> {
        Vec::new()
    }
}

/// Keeps at most `max_entries`, dropping the oldest first.
#[derive(Debug, Clone, Copy)]
pub struct CapacityEviction {
    pub max_entries: usize,
}

impl CapacityEviction {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }
}

impl EvictionPolicy for CapacityEviction {
    fn name(&self) -> &'static str {
        "capacity"
    }

    fn select_victims(&self, entries: &[EntryInfo]) -> Vec<TemplateKey> {
        let excess = entries.len().saturating_sub(self.max_entries.max(1));
        entries
            .iter()
            .take(excess)
            .map(|entry| entry.key.clone())
            .collect()
    }
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub total_entries: usize,
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    pub entries_by_type: BTreeMap<String, usize>,
    pub memory_estimate_bytes: usize,
    pub average_render_micros: f64,
    pub render_samples: usize,
    pub evictions: u64,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub lifetime_requests: u64,
    pub lifetime_compilations: u64,
    pub eviction_policy: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Counters {
    total_requests: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    lifetime_requests: u64,
    lifetime_compilations: u64,
}

struct CacheState {
    entries: HashMap<TemplateKey, CacheEntry>,
    counters: Counters,
    render_times: VecDeque<Duration>,
    next_sequence: u64,
    last_cleanup: Option<DateTime<Utc>>,
}

impl CacheState {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            counters: Counters::default(),
            render_times: VecDeque::with_capacity(RENDER_WINDOW),
            next_sequence: 0,
            last_cleanup: None,
        }
    }
}

/// Resolves `(type, version)` to a compiled template, compiling on first use.
pub struct TemplateCache {
    store: Box<dyn TemplateStore>,
    eviction: Box<dyn EvictionPolicy>,
    state: Mutex<CacheState>,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("store", &self.store.describe())
            .field("eviction", &self.eviction.name())
            .finish_non_exhaustive()
    }
}

impl TemplateCache {
    pub fn new(store: impl TemplateStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            eviction: Box::new(NoEviction),
            state: Mutex::new(CacheState::new()),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_eviction(mut self, policy: impl EvictionPolicy + 'static) -> Self {
        self.eviction = Box::new(policy);
        self
    }

    pub fn store(&self) -> &dyn TemplateStore {
        self.store.as_ref()
    }

    /// A panic while the lock was held leaves the counters usable, so a
    /// poisoned lock is taken over instead of propagated.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the compiled template for `(type_tag, version)`.
    ///
    /// Every call counts as a request. Load and compile failures count as
    /// misses and leave the map unchanged.
    pub fn resolve(
        &self,
        type_tag: &str,
        version: &str,
    ) -> Result<Arc<CompiledTemplate>, TemplateError> {
        let key = TemplateKey::new(type_tag, version);
        let mut guard = self.lock();
        let state = &mut *guard;
        state.counters.total_requests += 1;
        state.counters.lifetime_requests += 1;

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.hits += 1;
            state.counters.hits += 1;
            trace!(template = %key, hits = entry.hits, "template cache hit");
            return Ok(Arc::clone(&entry.template));
        }

        state.counters.misses += 1;
        debug!(template = %key, store = %self.store.describe(), "template cache miss");
        let started = Instant::now();
        let source = self.store.load(&key).inspect_err(|err| {
            warn!(template = %key, error = %err, "template load failed");
        })?;
        let template = Arc::new(CompiledTemplate::compile(key.clone(), &source).inspect_err(
            |err| warn!(template = %key, error = %err, "template compile failed"),
        )?);
        state.counters.lifetime_compilations += 1;

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let entry = CacheEntry {
            template: Arc::clone(&template),
            created_at: Utc::now(),
            size_estimate: template.size_estimate(),
            fingerprint: template.fingerprint().to_string(),
            hits: 0,
            sequence,
        };
        debug!(
            template = %key,
            fingerprint = %entry.fingerprint,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "template compiled"
        );
        state.entries.insert(key, entry);
        self.apply_eviction(state);
        Ok(template)
    }

    fn apply_eviction(&self, state: &mut CacheState) {
        let mut infos: Vec<EntryInfo> = state
            .entries
            .iter()
            .map(|(key, entry)| EntryInfo {
                key: key.clone(),
                created_at: entry.created_at,
                size_estimate: entry.size_estimate,
                hits: entry.hits,
                sequence: entry.sequence,
            })
            .collect();
        infos.sort_by_key(|info| info.sequence);
        for victim in self.eviction.select_victims(&infos) {
            if state.entries.remove(&victim).is_some() {
                state.counters.evictions += 1;
                debug!(template = %victim, policy = self.eviction.name(), "template evicted");
            }
        }
    }

    /// Renders through the cache so the duration lands in the statistics.
    pub fn render(
        &self,
        template: &CompiledTemplate,
        fields: &FieldMap,
    ) -> Result<RenderOutput, RenderError> {
        let started = Instant::now();
        let result = render(template, fields);
        self.record_render(started.elapsed());
        result
    }

    /// Adds one render duration to the rolling window.
    pub fn record_render(&self, elapsed: Duration) {
        let mut state = self.lock();
        if state.render_times.len() == RENDER_WINDOW {
            state.render_times.pop_front();
        }
        state.render_times.push_back(elapsed);
    }

    /// Drops one entry. Returns whether it was cached.
    pub fn invalidate(&self, type_tag: &str, version: &str) -> bool {
        let key = TemplateKey::new(type_tag, version);
        let removed = self.lock().entries.remove(&key).is_some();
        if removed {
            debug!(template = %key, "template invalidated");
        }
        removed
    }

    /// Empties the cache and resets the windowed counters. Lifetime counters
    /// are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.render_times.clear();
        let counters = &mut state.counters;
        counters.total_requests = 0;
        counters.hits = 0;
        counters.misses = 0;
        counters.evictions = 0;
        state.last_cleanup = Some(Utc::now());
        info!(dropped, "template cache cleared");
    }

    pub fn contains(&self, type_tag: &str, version: &str) -> bool {
        self.lock()
            .entries
            .contains_key(&TemplateKey::new(type_tag, version))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Copy of one entry's bookkeeping, if cached.
    pub fn entry(&self, type_tag: &str, version: &str) -> Option<CacheEntry> {
        self.lock()
            .entries
            .get(&TemplateKey::new(type_tag, version))
            .cloned()
    }

    pub fn get_statistics(&self) -> CacheStatistics {
        let state = self.lock();
        let counters = &state.counters;
        let mut entries_by_type = BTreeMap::new();
        for key in state.entries.keys() {
            *entries_by_type.entry(key.type_tag().to_string()).or_insert(0) += 1;
        }
        let render_samples = state.render_times.len();
        let average_render_micros = if render_samples == 0 {
            0.0
        } else {
            let total: Duration = state.render_times.iter().sum();
            total.as_secs_f64() * 1_000_000.0 / render_samples as f64
        };
        let hit_ratio = if counters.total_requests == 0 {
            0.0
        } else {
            counters.hits as f64 / counters.total_requests as f64
        };
        CacheStatistics {
            total_entries: state.entries.len(),
            total_requests: counters.total_requests,
            hits: counters.hits,
            misses: counters.misses,
            hit_ratio,
            entries_by_type,
            memory_estimate_bytes: state.entries.values().map(|e| e.size_estimate).sum(),
            average_render_micros,
            render_samples,
            evictions: counters.evictions,
            last_cleanup: state.last_cleanup,
            lifetime_requests: counters.lifetime_requests,
            lifetime_compilations: counters.lifetime_compilations,
            eviction_policy: self.eviction.name().to_string(),
            created_at: self.created_at,
        }
    }
}
