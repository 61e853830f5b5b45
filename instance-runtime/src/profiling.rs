//! Profiling event types.
//!
//! The runtime measures its own communication and lifecycle operations and
//! ships the measurements to the manager in batches (see
//! [`crate::profiler::Profiler`]). Events carry wall-clock timestamps;
//! correlating them across instances is the manager's job.

use {
    mcf_coupling_model::Identifier,
    serde::{Deserialize, Serialize},
    std::time::{SystemTime, UNIX_EPOCH},
};

/// A wall-clock timestamp, in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileTimestamp(pub i64);

impl ProfileTimestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        Self(nanos)
    }
}

/// The kind of operation an event measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileEventType {
    /// Registering with the manager.
    Register,
    /// Requesting peers and wiring up the transport.
    Connect,
    /// Sending a message on a port.
    Send,
    /// Receiving a message on a port.
    Receive,
    /// Withdrawing the registration.
    Deregister,
    /// Tearing down the transport.
    Shutdown,
}

/// One measured operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEvent {
    /// What was measured.
    pub event_type: ProfileEventType,
    /// When the operation started.
    pub start_time: ProfileTimestamp,
    /// When the operation finished; filled in at recording time if absent.
    pub stop_time: Option<ProfileTimestamp>,
    /// The port involved, for send and receive events.
    pub port: Option<Identifier>,
    /// The slot involved, for vector ports.
    pub slot: Option<usize>,
    /// Payload size in bytes, when the transport reports it.
    pub message_size: Option<usize>,
}

impl ProfileEvent {
    /// An event that started at `start_time` and has not finished yet.
    pub fn new(event_type: ProfileEventType, start_time: ProfileTimestamp) -> Self {
        Self {
            event_type,
            start_time,
            stop_time: None,
            port: None,
            slot: None,
            message_size: None,
        }
    }
}
