//! The transport seam: peer-to-peer message passing.
//!
//! The instance runtime is transport-agnostic. Everything that touches the
//! network between instances sits behind the [`Communicator`] trait; the
//! orchestration logic in [`crate::instance`] only ever talks to this
//! interface, and tests substitute an in-memory double. All calls are
//! synchronous; blocking and timeouts are the implementation's concern.

use {
    crate::{error::Result, message::Message, port::Port},
    mcf_coupling_model::{Conduit, Operator, Reference},
    std::collections::HashMap,
};

/// The reserved port on which per-iteration settings overlays arrive.
///
/// A close-port sentinel on this port signals that the submodel will not run
/// again.
pub const SETTINGS_IN_PORT: &str = "muscle_settings_in";

/// For each peer compute element, the dimensions of its instance set.
pub type PeerDims = HashMap<Reference, Vec<usize>>;

/// For each peer instance, the network locations it listens on.
pub type PeerLocations = HashMap<Reference, Vec<String>>;

/// Peer-to-peer message transport for one instance.
///
/// Implementations own the port registry: they resolve declared ports
/// against the conduits received from the manager and track per-port state.
pub trait Communicator {
    /// The locations this instance can be reached at, as
    /// `protocol:location` strings.
    fn get_locations(&self) -> Vec<String>;

    /// Wire this instance to its peers, as resolved by the manager.
    fn connect(
        &mut self,
        conduits: Vec<Conduit>,
        peer_dims: PeerDims,
        peer_locations: PeerLocations,
    ) -> Result<()>;

    /// All known ports, grouped by operator. The reserved settings input is
    /// not listed.
    fn list_ports(&self) -> HashMap<Operator, Vec<String>>;

    /// Whether a port with this name exists.
    fn port_exists(&self, port_name: &str) -> bool;

    /// The state of the named port.
    ///
    /// Callers check [`Communicator::port_exists`] first; implementations
    /// may panic on an unknown name.
    fn get_port(&self, port_name: &str) -> &Port;

    /// Mutable access to the state of the named port. Same contract as
    /// [`Communicator::get_port`].
    fn get_port_mut(&mut self, port_name: &str) -> &mut Port;

    /// Whether the reserved settings input is connected.
    fn settings_in_connected(&self) -> bool;

    /// Send a message on the named port. For vector ports, `slot` selects
    /// the destination instance.
    fn send_message(
        &mut self,
        port_name: &str,
        message: Message,
        slot: Option<usize>,
    ) -> Result<()>;

    /// Receive the next message on the named port, blocking until one
    /// arrives.
    ///
    /// On a disconnected port the `default` is returned as given; without a
    /// default, a disconnected receive is an error.
    fn receive_message(
        &mut self,
        port_name: &str,
        slot: Option<usize>,
        default: Option<Message>,
    ) -> Result<Message>;

    /// Send the close-port sentinel on the named port and slot.
    fn close_port(&mut self, port_name: &str, slot: Option<usize>) -> Result<()>;

    /// Tear down all transport resources. No sends or receives may follow.
    fn shutdown(&mut self) -> Result<()>;
}
