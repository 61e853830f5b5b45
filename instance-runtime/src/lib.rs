//! # MCF Instance Runtime
//!
//! The instance-side runtime library of the MCF multiscale coupling
//! framework. Linked into each simulation component, it mediates all
//! communication between that component and its peers, and between the
//! component and the central manager, turning an ordinary simulation loop
//! into a reusable submodel:
//!
//! - **Lifecycle**: register with the manager, resolve peers, connect the
//!   transport, and shut down gracefully (close, drain, deregister).
//! - **Reuse loop**: per iteration, install a fresh settings overlay and
//!   pre-receive all initialization inputs; tell the user whether to run
//!   again.
//! - **Messaging**: validate and route sends and receives, attach the
//!   overlay on send, and check overlay consistency on receive.
//! - **Profiling**: measure communication operations and ship them to the
//!   manager in batches.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`instance`]     | [`Instance`], the orchestrator the user's loop talks to |
//! | [`config`]       | [`InstanceConfig`]: identity and manager location from the command line |
//! | [`communicator`] | [`Communicator`], the peer transport seam |
//! | [`manager`]      | [`ManagerClient`], the manager RPC seam |
//! | [`message`]      | [`Message`] and the [`Data`] payload union |
//! | [`port`]         | Runtime [`Port`] state: slots, length, open flags |
//! | [`settings`]     | [`SettingsManager`]: base and overlay layers |
//! | [`cache`]        | [`FInitCache`]: pre-received initialization inputs |
//! | [`profiler`]     | [`Profiler`]: batched event delivery |
//! | [`profiling`]    | Profile event types |
//! | [`error`]        | [`InstanceError`] and the crate [`Result`] |
//!
//! The transport between instances and the wire protocol to the manager
//! live outside this crate, behind the two seam traits.

pub mod cache;
pub mod communicator;
pub mod config;
pub mod error;
pub mod instance;
pub mod manager;
pub mod message;
pub mod port;
pub mod profiler;
pub mod profiling;
pub mod settings;

#[cfg(any(test, feature = "dev-context-only-utils"))]
pub mod testing;


// Re-exports for convenience.
pub use cache::FInitCache;
pub use communicator::{Communicator, PeerDims, PeerLocations, SETTINGS_IN_PORT};
pub use config::InstanceConfig;
pub use error::{InstanceError, Result};
pub use instance::{Instance, PortsDescription};
pub use manager::ManagerClient;
pub use message::{Data, Message};
pub use port::Port;
pub use profiler::Profiler;
pub use profiling::{ProfileEvent, ProfileEventType, ProfileTimestamp};
pub use settings::SettingsManager;
