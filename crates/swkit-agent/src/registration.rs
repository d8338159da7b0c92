//! Registration lifecycle: installing, waiting and active workers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkerState {
    /// Registered, not yet installing.
    #[default]
    Parsed,
    /// Install event running.
    Installing,
    /// Installed, waiting for activation.
    Installed,
    /// Activate event running.
    Activating,
    /// Active and serving fetches.
    Activated,
    /// Replaced, or install failed.
    Redundant,
}

/// One worker version.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub cache_version: u32,
    pub state: WorkerState,
}

impl WorkerRecord {
    /// Create a worker for a cache version.
    pub fn new(cache_version: u32) -> Self {
        Self {
            id: WorkerId::new(),
            cache_version,
            state: WorkerState::Parsed,
        }
    }

    /// Set state.
    pub fn set_state(&mut self, state: WorkerState) {
        self.state = state;
    }
}

/// Worker versions of one registration.
#[derive(Debug, Default)]
pub struct Registration {
    pub installing: Option<WorkerRecord>,
    pub waiting: Option<WorkerRecord>,
    pub active: Option<WorkerRecord>,
    /// Most recent worker whose install failed.
    pub failed: Option<WorkerRecord>,
}

impl Registration {
    /// Create an empty registration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start installing a new worker version.
    pub fn begin_install(&mut self, cache_version: u32) -> &WorkerRecord {
        let mut worker = WorkerRecord::new(cache_version);
        worker.set_state(WorkerState::Installing);
        if let Some(mut previous) = self.installing.take() {
            previous.set_state(WorkerState::Redundant);
        }
        self.failed = None;
        self.installing.insert(worker)
    }

    /// Installing worker succeeded: move it to waiting.
    pub fn install_complete(&mut self) -> Option<&WorkerRecord> {
        let mut worker = self.installing.take()?;
        worker.set_state(WorkerState::Installed);
        if let Some(mut stale) = self.waiting.replace(worker) {
            stale.set_state(WorkerState::Redundant);
        }
        self.waiting.as_ref()
    }

    /// Installing worker failed: discard it, leaving the active worker in control.
    pub fn install_failed(&mut self) -> Option<&WorkerRecord> {
        let mut worker = self.installing.take()?;
        worker.set_state(WorkerState::Redundant);
        Some(&*self.failed.insert(worker))
    }

    /// Move the waiting worker to activating, retiring the old active worker.
    pub fn begin_activate(&mut self) -> Option<&WorkerRecord> {
        let mut worker = self.waiting.take()?;
        worker.set_state(WorkerState::Activating);
        if let Some(mut old) = self.active.replace(worker) {
            old.set_state(WorkerState::Redundant);
        }
        self.active.as_ref()
    }

    /// Activating worker finished.
    pub fn activate_complete(&mut self) -> Option<&WorkerRecord> {
        let worker = self.active.as_mut()?;
        worker.set_state(WorkerState::Activated);
        Some(&*worker)
    }

    /// The newest worker's state.
    pub fn current_state(&self) -> WorkerState {
        self.installing
            .as_ref()
            .or(self.waiting.as_ref())
            .or(self.active.as_ref())
            .or(self.failed.as_ref())
            .map(|w| w.state)
            .unwrap_or_default()
    }

    /// Whether the active worker handles fetches. An activating worker
    /// already owns its precached bucket, so it serves too.
    pub fn is_serving(&self) -> bool {
        self.active.as_ref().is_some_and(|w| {
            matches!(w.state, WorkerState::Activating | WorkerState::Activated)
        })
    }
}
