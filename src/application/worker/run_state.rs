//! Persisted run state of the ingest worker.
//!
//! A small JSON file records whether the initial full discovery sweep is
//! still owed and when the last one finished. The path is injected so tests
//! and parallel deployments never share state.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::WorkerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRunState {
    /// Whether the initial full discovery sweep has not completed yet
    pub init_run: bool,
    /// When the last full sweep finished
    pub last_init_run: Option<DateTime<Utc>>,
}

impl Default for WorkerRunState {
    fn default() -> Self {
        Self {
            init_run: true,
            last_init_run: None,
        }
    }
}

impl WorkerRunState {
    /// Load the state file; a missing file means a fresh deployment that
    /// still owes its first full sweep.
    pub fn load(path: &str) -> Result<Self, WorkerError> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .map_err(|e| WorkerError::StateError(format!("Failed to read {}: {}", path, e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| WorkerError::StateError(format!("Malformed state file {}: {}", path, e)))
    }

    /// Persist the state, called on every transition
    pub fn save(&self, path: &str) -> Result<(), WorkerError> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| WorkerError::StateError(format!("Failed to serialize state: {}", e)))?;
        fs::write(path, raw)
            .map_err(|e| WorkerError::StateError(format!("Failed to write {}: {}", path, e)))
    }

    /// Whether a full discovery sweep is owed: none has ever completed, or
    /// the last one is older than the seed interval.
    pub fn needs_full_sweep(&self, now: DateTime<Utc>, interval_days: i64) -> bool {
        if self.init_run {
            return true;
        }
        match self.last_init_run {
            Some(last) => now - last > Duration::days(interval_days),
            None => true,
        }
    }

    /// Whether an incremental sweep is owed: the last full sweep is older
    /// than the incremental window but not yet old enough for a full one.
    pub fn needs_incremental_sweep(&self, now: DateTime<Utc>, window_days: i64) -> bool {
        match self.last_init_run {
            Some(last) => now - last > Duration::days(window_days),
            None => false,
        }
    }

    /// Record a completed full sweep
    pub fn mark_full_sweep_done(&mut self, now: DateTime<Utc>) {
        self.init_run = false;
        self.last_init_run = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_owes_full_sweep() {
        let state = WorkerRunState::default();
        assert!(state.needs_full_sweep(Utc::now(), 365));
        assert!(!state.needs_incremental_sweep(Utc::now(), 14));
    }

    #[test]
    fn test_completed_sweep_ages_into_incremental_then_full() {
        let now = Utc::now();
        let mut state = WorkerRunState::default();
        state.mark_full_sweep_done(now - Duration::days(30));

        assert!(!state.needs_full_sweep(now, 365));
        assert!(state.needs_incremental_sweep(now, 14));

        state.mark_full_sweep_done(now - Duration::days(400));
        assert!(state.needs_full_sweep(now, 365));
    }

    #[test]
    fn test_recent_sweep_owes_nothing() {
        let now = Utc::now();
        let mut state = WorkerRunState::default();
        state.mark_full_sweep_done(now - Duration::days(1));
        assert!(!state.needs_full_sweep(now, 365));
        assert!(!state.needs_incremental_sweep(now, 14));
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir().join("run_state_round_trip.json");
        let path = path.to_str().expect("temp path is valid utf-8");

        let mut state = WorkerRunState::default();
        state.mark_full_sweep_done(Utc::now());
        state.save(path).expect("save state");

        let loaded = WorkerRunState::load(path).expect("load state");
        assert!(!loaded.init_run);
        assert_eq!(loaded.last_init_run, state.last_init_run);

        std::fs::remove_file(path).ok();
    }
}
