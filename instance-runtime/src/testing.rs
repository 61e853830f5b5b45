//! In-memory doubles for the transport and manager seams.
//!
//! [`MockCommunicator`] and [`MockManagerClient`] record every call into
//! shared ledgers that a test can keep a handle to, and replay messages and
//! responses that the test queued up front. Nothing here touches the
//! network.

use {
    crate::{
        communicator::{Communicator, PeerDims, PeerLocations, SETTINGS_IN_PORT},
        error::{InstanceError, Result},
        manager::ManagerClient,
        message::Message,
        port::Port,
        profiling::ProfileEvent,
    },
    mcf_coupling_model::{Conduit, Identifier, Operator, Reference, Settings},
    parking_lot::Mutex,
    std::{
        collections::{HashMap, VecDeque},
        sync::Arc,
    },
};

// ── Transport double ────────────────────────────────────────────────────────

/// Observable state of a [`MockCommunicator`], shared with the test.
#[derive(Debug, Default)]
pub struct CommLedger {
    /// Locations reported by `get_locations`.
    pub locations: Vec<String>,
    /// Whether the reserved settings input reports connected.
    pub settings_in_connected: bool,
    /// Messages waiting to be received, per (port, slot).
    pub queued: HashMap<(String, Option<usize>), VecDeque<Message>>,
    /// Every message handed to `send_message`.
    pub sent: Vec<(String, Option<usize>, Message)>,
    /// Every `close_port` call.
    pub closed: Vec<(String, Option<usize>)>,
    /// Every `connect` call, with its arguments.
    pub connects: Vec<(Vec<Conduit>, PeerDims, PeerLocations)>,
    /// Number of `shutdown` calls.
    pub shutdowns: usize,
}

impl CommLedger {
    /// Queue a message for a later receive on (port, slot).
    pub fn queue_message(&mut self, port_name: &str, slot: Option<usize>, message: Message) {
        self.queued
            .entry((port_name.to_string(), slot))
            .or_default()
            .push_back(message);
    }

    fn pop_queued(&mut self, port_name: &str, slot: Option<usize>) -> Option<Message> {
        self.queued
            .get_mut(&(port_name.to_string(), slot))
            .and_then(|queue| queue.pop_front())
    }
}

/// A [`Communicator`] that replays queued messages and records everything.
#[derive(Debug)]
pub struct MockCommunicator {
    ports: HashMap<String, Port>,
    ledger: Arc<Mutex<CommLedger>>,
}

impl Default for MockCommunicator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCommunicator {
    /// A communicator with no ports and a disconnected settings input.
    pub fn new() -> Self {
        let ledger = CommLedger {
            locations: vec!["tcp:localhost:9001".to_string()],
            ..CommLedger::default()
        };
        Self {
            ports: HashMap::new(),
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Add a port, keyed by its name.
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.insert(port.name().as_str().to_string(), port);
        self
    }

    /// Set whether the reserved settings input is connected.
    pub fn with_settings_in(self, connected: bool) -> Self {
        self.ledger.lock().settings_in_connected = connected;
        self
    }

    /// Queue a message for a later receive.
    pub fn queue_message(&self, port_name: &str, slot: Option<usize>, message: Message) {
        self.ledger.lock().queue_message(port_name, slot, message);
    }

    /// A handle to the shared ledger, usable after the communicator has
    /// been moved into an instance.
    pub fn ledger(&self) -> Arc<Mutex<CommLedger>> {
        Arc::clone(&self.ledger)
    }
}

impl Communicator for MockCommunicator {
    fn get_locations(&self) -> Vec<String> {
        self.ledger.lock().locations.clone()
    }

    fn connect(
        &mut self,
        conduits: Vec<Conduit>,
        peer_dims: PeerDims,
        peer_locations: PeerLocations,
    ) -> Result<()> {
        self.ledger
            .lock()
            .connects
            .push((conduits, peer_dims, peer_locations));
        Ok(())
    }

    fn list_ports(&self) -> HashMap<Operator, Vec<String>> {
        let mut result: HashMap<Operator, Vec<String>> = HashMap::new();
        for (name, port) in &self.ports {
            result.entry(port.operator()).or_default().push(name.clone());
        }
        result
    }

    fn port_exists(&self, port_name: &str) -> bool {
        self.ports.contains_key(port_name)
    }

    fn get_port(&self, port_name: &str) -> &Port {
        self.ports.get(port_name).expect("unknown port")
    }

    fn get_port_mut(&mut self, port_name: &str) -> &mut Port {
        self.ports.get_mut(port_name).expect("unknown port")
    }

    fn settings_in_connected(&self) -> bool {
        self.ledger.lock().settings_in_connected
    }

    fn send_message(
        &mut self,
        port_name: &str,
        message: Message,
        slot: Option<usize>,
    ) -> Result<()> {
        self.ledger
            .lock()
            .sent
            .push((port_name.to_string(), slot, message));
        Ok(())
    }

    fn receive_message(
        &mut self,
        port_name: &str,
        slot: Option<usize>,
        default: Option<Message>,
    ) -> Result<Message> {
        let connected = if port_name == SETTINGS_IN_PORT {
            self.ledger.lock().settings_in_connected
        } else {
            match self.ports.get(port_name) {
                Some(port) => port.is_connected(),
                None => {
                    return Err(InstanceError::Transport(format!(
                        "receiving on unknown port '{port_name}'",
                    )));
                }
            }
        };
        if !connected {
            return default.ok_or_else(|| {
                InstanceError::Transport(format!(
                    "receiving on disconnected port '{port_name}' without a \
                     default",
                ))
            });
        }

        let message = self
            .ledger
            .lock()
            .pop_queued(port_name, slot)
            .ok_or_else(|| {
                InstanceError::Transport(format!(
                    "no message queued on '{port_name}' slot {slot:?}",
                ))
            })?;
        if message.data.is_close_port() {
            if let Some(port) = self.ports.get_mut(port_name) {
                port.set_closed(slot);
            }
        }
        Ok(message)
    }

    fn close_port(&mut self, port_name: &str, slot: Option<usize>) -> Result<()> {
        self.ledger.lock().closed.push((port_name.to_string(), slot));
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.ledger.lock().shutdowns += 1;
        Ok(())
    }
}

// ── Manager double ──────────────────────────────────────────────────────────

/// Observable state of a [`MockManagerClient`], shared with the test.
#[derive(Debug, Default)]
pub struct ManagerLedger {
    /// Every `register_instance` call, with its arguments.
    pub registrations: Vec<(Reference, Vec<String>, Vec<(Identifier, Operator)>)>,
    /// Every `request_peers` call.
    pub peer_requests: Vec<Reference>,
    /// Number of `get_settings` calls.
    pub settings_requests: usize,
    /// Every `deregister_instance` call.
    pub deregistrations: Vec<Reference>,
    /// Size of each submitted profile batch, in order.
    pub profile_batches: Vec<usize>,
    /// All submitted profile events, in order.
    pub profile_events: Vec<ProfileEvent>,
    /// Response handed out by `request_peers`.
    pub peers_response: (Vec<Conduit>, PeerDims, PeerLocations),
    /// Response handed out by `get_settings`.
    pub settings_response: Settings,
}

/// A [`ManagerClient`] that replays configured responses and records
/// everything.
#[derive(Debug, Default)]
pub struct MockManagerClient {
    ledger: Arc<Mutex<ManagerLedger>>,
}

impl MockManagerClient {
    /// A manager with empty responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base settings returned by `get_settings`.
    pub fn with_settings(self, settings: Settings) -> Self {
        self.ledger.lock().settings_response = settings;
        self
    }

    /// Set the peer topology returned by `request_peers`.
    pub fn with_peers(
        self,
        conduits: Vec<Conduit>,
        peer_dims: PeerDims,
        peer_locations: PeerLocations,
    ) -> Self {
        self.ledger.lock().peers_response = (conduits, peer_dims, peer_locations);
        self
    }

    /// A handle to the shared ledger, usable after the client has been
    /// moved into an instance.
    pub fn ledger(&self) -> Arc<Mutex<ManagerLedger>> {
        Arc::clone(&self.ledger)
    }
}

impl ManagerClient for MockManagerClient {
    fn register_instance(
        &mut self,
        name: &Reference,
        locations: Vec<String>,
        ports: Vec<(Identifier, Operator)>,
    ) -> Result<()> {
        self.ledger
            .lock()
            .registrations
            .push((name.clone(), locations, ports));
        Ok(())
    }

    fn request_peers(
        &mut self,
        name: &Reference,
    ) -> Result<(Vec<Conduit>, PeerDims, PeerLocations)> {
        let mut ledger = self.ledger.lock();
        ledger.peer_requests.push(name.clone());
        Ok(ledger.peers_response.clone())
    }

    fn get_settings(&mut self) -> Result<Settings> {
        let mut ledger = self.ledger.lock();
        ledger.settings_requests += 1;
        Ok(ledger.settings_response.clone())
    }

    fn deregister_instance(&mut self, name: &Reference) -> Result<()> {
        self.ledger.lock().deregistrations.push(name.clone());
        Ok(())
    }

    fn submit_profile_events(&mut self, events: &[ProfileEvent]) -> Result<()> {
        let mut ledger = self.ledger.lock();
        ledger.profile_batches.push(events.len());
        ledger.profile_events.extend_from_slice(events);
        Ok(())
    }
}
