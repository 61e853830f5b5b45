//! Batched delivery of profiling events to the manager.
//!
//! Events are buffered locally and shipped in one RPC per
//! [`FLUSH_THRESHOLD`] events, so that a chatty submodel does not turn every
//! send into two network round trips. The profiler shares the manager
//! connection with the instance that owns it.

use {
    crate::{
        manager::ManagerClient,
        profiling::{ProfileEvent, ProfileTimestamp},
    },
    log::warn,
    parking_lot::Mutex,
    std::sync::Arc,
};

/// Buffer size at which the event batch is submitted.
pub const FLUSH_THRESHOLD: usize = 100;

/// Collects profiling events and submits them to the manager in batches.
#[derive(Debug)]
pub struct Profiler<M: ManagerClient> {
    manager: Arc<Mutex<M>>,
    enabled: bool,
    events: Vec<ProfileEvent>,
}

impl<M: ManagerClient> Profiler<M> {
    /// Create a profiler submitting through the given manager connection.
    ///
    /// Profiling starts enabled; see [`Profiler::set_level`].
    pub fn new(manager: Arc<Mutex<M>>) -> Self {
        Self {
            manager,
            enabled: true,
            events: Vec::new(),
        }
    }

    /// Configure the profiling level. Any level other than `"all"` disables
    /// event collection.
    pub fn set_level(&mut self, level: &str) {
        self.enabled = level == "all";
    }

    /// Record one event.
    ///
    /// An event without a stop time is stamped with the current time. When
    /// the buffer reaches [`FLUSH_THRESHOLD`] events it is submitted and
    /// cleared.
    pub fn record_event(&mut self, mut event: ProfileEvent) {
        if event.stop_time.is_none() {
            event.stop_time = Some(ProfileTimestamp::now());
        }
        if self.enabled {
            self.events.push(event);
        }
        if self.events.len() >= FLUSH_THRESHOLD {
            self.flush_();
        }
    }

    /// Submit any buffered events. Called once, when the instance
    /// deregisters.
    pub fn shutdown(&mut self) {
        self.flush_();
    }

    fn flush_(&mut self) {
        if self.events.is_empty() {
            return;
        }
        if let Err(e) = self.manager.lock().submit_profile_events(&self.events) {
            warn!("failed to submit {} profile events: {e}", self.events.len());
        }
        self.events.clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
