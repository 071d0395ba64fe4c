use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Storage keys for the persisted run state.
///
/// Mirrors the layout a per-tab session store imposes: a handful of distinct
/// string entries rather than one blob. The store survives reloads but not
/// tab closure, which is exactly the lifetime a resumable run needs.
const MODE_KEY: &str = "chatsweep.mode";
const REMAINING_KEY: &str = "chatsweep.remaining";
const SUCCESS_KEY: &str = "chatsweep.success";
const FAILURE_KEY: &str = "chatsweep.failure";
const TOTAL_KEY: &str = "chatsweep.total";
const CONSECUTIVE_KEY: &str = "chatsweep.consecutive";

/// How a run selects its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    /// Re-query the live list each step; self-healing, no explicit queue.
    All,
    /// Consume a frozen snapshot of durable identifiers, head first.
    Selected,
}

/// Persisted description of an in-progress or resumable bulk action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub mode: RunMode,
    /// Durable identifiers still to process; `Selected` mode only.
    pub remaining: Vec<String>,
    pub success_count: u32,
    pub failure_count: u32,
    /// Item count at run start, for progress display. May be revised upward
    /// when an `All` run discovers more items after a reload.
    pub total: u32,
    /// Failures in a row across items, surviving reload cycles so the fatal
    /// threshold applies to the run, not the page generation.
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl RunState {
    pub fn new_all(total: u32) -> Self {
        Self {
            mode: RunMode::All,
            remaining: Vec::new(),
            success_count: 0,
            failure_count: 0,
            total,
            consecutive_failures: 0,
        }
    }

    pub fn new_selected(remaining: Vec<String>) -> Self {
        let total = remaining.len() as u32;
        Self {
            mode: RunMode::Selected,
            remaining,
            success_count: 0,
            failure_count: 0,
            total,
            consecutive_failures: 0,
        }
    }

    /// Items attempted so far, successful or not.
    pub fn processed(&self) -> u32 {
        self.success_count + self.failure_count
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.consecutive_failures += 1;
    }
}

/// The per-tab key-value store abstraction.
///
/// Adapters back this with whatever their environment offers (a session
/// store, a scratch file). Writes are not required to be atomic across keys;
/// the orchestrator is the sole writer of the run state.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory [`KeyValueStore`], used by tests and same-page embeddings.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// Saves, loads and clears the [`RunState`] across page reloads.
///
/// Robust to missing or mangled entries: an absent mode key means no run is
/// pending, unparseable counters degrade to zero, and a mangled remaining
/// list degrades to empty with a warning.
#[derive(Clone)]
pub struct CheckpointStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CheckpointStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn save(&self, state: &RunState) {
        let mode = match state.mode {
            RunMode::All => "ALL",
            RunMode::Selected => "SELECTED",
        };
        self.kv.set(MODE_KEY, mode);
        // serializing a Vec<String> cannot fail
        let remaining = serde_json::to_string(&state.remaining).unwrap_or_default();
        self.kv.set(REMAINING_KEY, &remaining);
        self.kv.set(SUCCESS_KEY, &state.success_count.to_string());
        self.kv.set(FAILURE_KEY, &state.failure_count.to_string());
        self.kv.set(TOTAL_KEY, &state.total.to_string());
        self.kv
            .set(CONSECUTIVE_KEY, &state.consecutive_failures.to_string());
    }

    pub fn load(&self) -> Option<RunState> {
        let mode = match self.kv.get(MODE_KEY)?.as_str() {
            "ALL" => RunMode::All,
            "SELECTED" => RunMode::Selected,
            other => {
                warn!(mode = other, "unrecognized persisted run mode, ignoring");
                return None;
            }
        };

        let remaining = match self.kv.get(REMAINING_KEY) {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "mangled remaining list in checkpoint, treating as empty");
                Vec::new()
            }),
            None => Vec::new(),
        };

        Some(RunState {
            mode,
            remaining,
            success_count: self.counter(SUCCESS_KEY),
            failure_count: self.counter(FAILURE_KEY),
            total: self.counter(TOTAL_KEY),
            consecutive_failures: self.counter(CONSECUTIVE_KEY),
        })
    }

    pub fn clear(&self) {
        for key in [
            MODE_KEY,
            REMAINING_KEY,
            SUCCESS_KEY,
            FAILURE_KEY,
            TOTAL_KEY,
            CONSECUTIVE_KEY,
        ] {
            self.kv.remove(key);
        }
    }

    /// Whether a run is pending in the store.
    pub fn is_pending(&self) -> bool {
        self.kv.get(MODE_KEY).is_some()
    }

    fn counter(&self, key: &str) -> u32 {
        self.kv
            .get(key)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
    }
}
