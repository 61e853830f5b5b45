//! Messages exchanged between instances.
//!
//! A [`Message`] pairs a simulation timestamp with a [`Data`] payload and an
//! optional settings overlay. The payload is a tagged union: alongside the
//! user's domain data it can carry a [`Settings`] map (on the reserved
//! settings input) or the [`Data::ClosePort`] sentinel, which signals that no
//! further messages will arrive on a port.

use {
    mcf_coupling_model::Settings,
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

/// The payload of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    /// No data.
    Nil,
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A text value.
    String(String),
    /// Raw bytes; the simulation's own codec gives them meaning.
    Bytes(Vec<u8>),
    /// A list of payloads.
    List(Vec<Data>),
    /// A string-keyed mapping of payloads.
    Map(BTreeMap<String, Data>),
    /// A settings overlay, sent on the reserved settings input.
    Settings(Settings),
    /// Sentinel: the sender will transmit nothing further on this port.
    ClosePort,
}

impl Data {
    /// Whether this payload is the close-port sentinel.
    pub fn is_close_port(&self) -> bool {
        matches!(self, Data::ClosePort)
    }

    /// The settings payload, if this is one.
    pub fn as_settings(&self) -> Option<&Settings> {
        match self {
            Data::Settings(settings) => Some(settings),
            _ => None,
        }
    }
}

impl From<i64> for Data {
    fn from(i: i64) -> Self {
        Data::Int(i)
    }
}

impl From<f64> for Data {
    fn from(x: f64) -> Self {
        Data::Float(x)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::String(s.to_string())
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data::Bytes(bytes)
    }
}

/// A message to be sent or that has been received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Simulation time for which the payload is valid.
    pub timestamp: f64,
    /// Simulation time of the next message on this port, when known.
    pub next_timestamp: Option<f64>,
    /// The payload.
    pub data: Data,
    /// The settings overlay travelling with the payload.
    pub settings: Option<Settings>,
}

impl Message {
    /// Create a message with the given timestamp and payload and nothing
    /// else.
    pub fn new(timestamp: f64, data: Data) -> Self {
        Self {
            timestamp,
            next_timestamp: None,
            data,
            settings: None,
        }
    }

    /// This message with `next_timestamp` set.
    pub fn with_next_timestamp(mut self, next_timestamp: f64) -> Self {
        self.next_timestamp = Some(next_timestamp);
        self
    }

    /// This message with a settings overlay attached.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Whether a settings overlay is attached.
    pub fn has_settings(&self) -> bool {
        self.settings.is_some()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
