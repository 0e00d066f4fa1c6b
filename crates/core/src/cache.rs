use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::domain::shipment::ValidatedShipment;

pub const DEFAULT_TTL_SECS: u64 = 86_400;
pub const DEFAULT_MAX_ENTRIES: usize = 1_000;

/// Cache key for a shipment: identical physical shipments share a narrative.
pub fn shipment_fingerprint(shipment: &ValidatedShipment) -> String {
    let canonical = [
        shipment.dimensions.as_str(),
        shipment.weight.as_str(),
        shipment.origin.as_str(),
        shipment.destination.as_str(),
        shipment.fragility.label(),
        shipment.special_requirements.as_str(),
    ]
    .join("|");
    format!("quote:{}", blake3::hash(canonical.as_bytes()).to_hex())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedNarrative {
    pub narrative: String,
    pub model: String,
}

#[derive(Debug)]
struct Entry {
    value: CachedNarrative,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|existing| existing != key);
        Some(entry)
    }
}

/// Bounded TTL cache of LLM narratives keyed by shipment fingerprint.
#[derive(Debug)]
pub struct QuoteCache {
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS), DEFAULT_MAX_ENTRIES)
    }
}

impl QuoteCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries: max_entries.max(1), state: Mutex::new(CacheState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<CachedNarrative> {
        let mut state = self.lock();
        let expired = state.entries.get(key)?.inserted_at.elapsed() >= self.ttl;
        if expired {
            state.remove(key);
            return None;
        }
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: CachedNarrative) {
        let key = key.into();
        let mut state = self.lock();
        state.remove(&key);
        while state.entries.len() >= self.max_entries {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, Entry { value, inserted_at: Instant::now() });
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent: String,
    pub calls: u64,
    pub successes: u64,
    pub average_duration_ms: f64,
}

impl AgentPerformance {
    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            return 0.0;
        }
        self.successes as f64 / self.calls as f64 * 100.0
    }
}

/// Per-agent call counts with a running mean of call duration.
#[derive(Debug, Default)]
pub struct AgentMetrics {
    agents: Mutex<BTreeMap<String, AgentPerformance>>,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, agent: &str, duration: Duration, success: bool) {
        let mut agents = self.agents.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = agents
            .entry(agent.to_string())
            .or_insert_with(|| AgentPerformance { agent: agent.to_string(), ..Default::default() });

        entry.calls += 1;
        if success {
            entry.successes += 1;
        }
        let n = entry.calls as f64;
        let sample = duration.as_secs_f64() * 1000.0;
        entry.average_duration_ms = (entry.average_duration_ms * (n - 1.0) + sample) / n;
    }

    pub fn snapshot(&self) -> Vec<AgentPerformance> {
        let agents = self.agents.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        agents.values().cloned().collect()
    }
}
