//! The coordinator seam: RPCs to the central manager.
//!
//! Every simulation has one manager process that wires instances together
//! and distributes settings. The instance runtime consumes a fixed, small
//! RPC surface, expressed as the [`ManagerClient`] trait so that tests can
//! substitute a recording double for the real connection.

use {
    crate::{
        communicator::{PeerDims, PeerLocations},
        error::Result,
        profiling::ProfileEvent,
    },
    mcf_coupling_model::{Conduit, Identifier, Operator, Reference, Settings},
};

/// Client for the manager's RPC surface.
///
/// Calls block until the manager responds; ordering is the caller's
/// responsibility (registration strictly precedes the peer request).
pub trait ManagerClient {
    /// Announce this instance: where it listens and which ports it declares.
    fn register_instance(
        &mut self,
        name: &Reference,
        locations: Vec<String>,
        ports: Vec<(Identifier, Operator)>,
    ) -> Result<()>;

    /// Ask for the peer topology of this instance.
    ///
    /// Returns the conduits attached to this instance's compute element,
    /// the instance set dimensions per peer compute element, and the
    /// network locations per peer instance. The triple is handed to
    /// [`crate::communicator::Communicator::connect`] verbatim.
    fn request_peers(
        &mut self,
        name: &Reference,
    ) -> Result<(Vec<Conduit>, PeerDims, PeerLocations)>;

    /// Fetch the simulation-wide base settings.
    fn get_settings(&mut self) -> Result<Settings>;

    /// Withdraw this instance's registration. Called exactly once, after
    /// all ports are closed and drained.
    fn deregister_instance(&mut self, name: &Reference) -> Result<()>;

    /// Submit a batch of profiling events.
    fn submit_profile_events(&mut self, events: &[ProfileEvent]) -> Result<()>;
}
