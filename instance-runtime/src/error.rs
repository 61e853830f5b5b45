//! Error types for the instance runtime.

use {
    mcf_coupling_model::{ReferenceError, SettingsError},
    thiserror::Error,
};

/// Errors that can occur while running a compute element instance.
///
/// Every failure that is raised after the instance has connected first runs
/// the graceful shutdown path, so that peers and the manager observe a clean
/// termination before the error reaches the caller.
#[derive(Error, Debug)]
pub enum InstanceError {
    /// The instance was started with an unusable command line or port
    /// declaration. Raised before anything registers, so no shutdown runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// The user's code broke a protocol rule: receiving twice in one
    /// initialization phase, using an undeclared port, mismatched settings
    /// overlays, or a wrong payload type on the settings input.
    #[error("logic error: {0}")]
    Logic(String),

    /// A peer violated the shutdown protocol, most likely by crashing.
    #[error("peer fault: {0}")]
    PeerFault(String),

    /// The transport or manager connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A settings lookup or typed access failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// A name could not be parsed as a reference.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Convenience result type for instance runtime operations.
pub type Result<T> = std::result::Result<T, InstanceError>;
