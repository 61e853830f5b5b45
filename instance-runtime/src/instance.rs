//! The instance orchestrator.
//!
//! [`Instance`] turns an ordinary simulation loop into a reusable submodel.
//! It registers with the manager, wires the transport to its peers, drives
//! the reuse loop (fresh settings overlay and pre-received initialization
//! inputs per iteration), validates and routes the user's sends and
//! receives, and tears everything down gracefully when the simulation ends.
//!
//! The orchestration logic is deterministic given the messages it is fed;
//! all I/O happens behind the [`Communicator`] and [`ManagerClient`] seams.
//!
//! The user's code is a plain loop:
//!
//! ```ignore
//! let config = InstanceConfig::from_args(&args)?;
//! let manager = MmpTcpClient::connect(&config.manager_location)?;
//! let communicator = TcpCommunicator::new(config.kernel(), config.index(), &ports);
//! let mut instance = Instance::new(config, Some(ports), communicator, manager)?;
//!
//! while instance.reuse_instance(true)? {
//!     let msg = instance.receive("initial_state", None, None)?;
//!     // ... compute ...
//!     instance.send("final_state", Message::new(t, result), None)?;
//! }
//! ```

use {
    crate::{
        cache::FInitCache,
        communicator::{Communicator, SETTINGS_IN_PORT},
        config::InstanceConfig,
        error::{InstanceError, Result},
        manager::ManagerClient,
        message::{Data, Message},
        profiler::Profiler,
        profiling::{ProfileEvent, ProfileEventType, ProfileTimestamp},
        settings::SettingsManager,
    },
    log::{debug, error, info, warn},
    mcf_coupling_model::{
        Identifier, Operator, Reference, SettingValue, Settings, SettingsError,
    },
    parking_lot::Mutex,
    std::{collections::HashMap, process, sync::Arc},
};

/// Ports declared by the user, per operator. A name ending in `[]` declares
/// a vector port; the suffix is stripped before registration.
pub type PortsDescription = HashMap<Operator, Vec<String>>;

/// Setting that selects the profiling level; any value other than `"all"`
/// disables event collection.
const PROFILE_LEVEL_SETTING: &str = "muscle_profile_level";

/// The runtime face of one compute element instance.
///
/// Owns the transport, the settings layers, the initialization-input cache,
/// and the profiler. Generic over the transport and manager connections so
/// that tests can substitute doubles.
pub struct Instance<C: Communicator, M: ManagerClient> {
    name: Reference,
    communicator: C,
    manager: Arc<Mutex<M>>,
    declared_ports: Option<PortsDescription>,
    settings_manager: SettingsManager,
    first_run: bool,
    f_init_cache: FInitCache,
    profiler: Profiler<M>,
    is_shut_down: bool,
}

impl<C: Communicator, M: ManagerClient> Instance<C, M> {
    /// Create an instance, register it with the manager, and connect it to
    /// its peers.
    ///
    /// `communicator` must have been built for the compute element and index
    /// named by `config`. Registration strictly precedes the peer request,
    /// which precedes any peer I/O.
    pub fn new(
        config: InstanceConfig,
        declared_ports: Option<PortsDescription>,
        communicator: C,
        manager: M,
    ) -> Result<Self> {
        let manager = Arc::new(Mutex::new(manager));
        let profiler = Profiler::new(Arc::clone(&manager));
        let mut instance = Self {
            name: config.name,
            communicator,
            manager,
            declared_ports,
            settings_manager: SettingsManager::new(),
            first_run: true,
            f_init_cache: FInitCache::new(),
            profiler,
            is_shut_down: false,
        };
        instance.register_()?;
        instance.connect_()?;
        info!("instance '{}' is registered and connected", instance.name);
        Ok(instance)
    }

    /// The fully qualified name of this instance.
    pub fn name(&self) -> &Reference {
        &self.name
    }

    /// Decide whether the submodel should run again, and set up the next
    /// iteration if so.
    ///
    /// Receives the new settings overlay and pre-fetches all initialization
    /// inputs. With `apply_overlay` set, the overlay travelling with each
    /// initialization message is installed locally and stripped from the
    /// message; pass `false` to handle overlays by hand via
    /// [`Instance::receive_with_settings`].
    ///
    /// The user's loop condition is exactly the returned value.
    pub fn reuse_instance(&mut self, apply_overlay: bool) -> Result<bool> {
        let result = self.reuse_instance_(apply_overlay);
        if result.is_err() {
            self.shutdown_();
        }
        result
    }

    /// Send a message on an outgoing port.
    ///
    /// A message without settings is given the current overlay. `slot` is
    /// required for vector ports.
    pub fn send(&mut self, port_name: &str, message: Message, slot: Option<usize>) -> Result<()> {
        let result = self.send_(port_name, message, slot);
        if result.is_err() {
            self.shutdown_();
        }
        result
    }

    /// Receive a message on an incoming port.
    ///
    /// Initialization ports are served from the pre-receive cache filled by
    /// [`Instance::reuse_instance`]; each (port, slot) may be received
    /// exactly once per iteration. `default` is returned when the port is
    /// not connected. The returned message has its settings stripped, after
    /// a consistency check against the local overlay.
    pub fn receive(
        &mut self,
        port_name: &str,
        slot: Option<usize>,
        default: Option<Message>,
    ) -> Result<Message> {
        let result = self.receive_message_(port_name, slot, default, false);
        if result.is_err() {
            self.shutdown_();
        }
        result
    }

    /// Like [`Instance::receive`], but the returned message keeps the
    /// settings overlay it travelled with.
    ///
    /// On initialization ports this requires having called
    /// `reuse_instance(false)`, since applying the overlay strips it.
    pub fn receive_with_settings(
        &mut self,
        port_name: &str,
        slot: Option<usize>,
        default: Option<Message>,
    ) -> Result<Message> {
        let result = self.receive_message_(port_name, slot, default, true);
        if result.is_err() {
            self.shutdown_();
        }
        result
    }

    /// The value of a setting, resolved against this instance's name.
    pub fn get_setting(&self, name: &str) -> Result<SettingValue> {
        let name_ref: Reference = name.parse()?;
        Ok(self.settings_manager.get_setting(&self.name, &name_ref)?)
    }

    /// The value of a setting, converted to the requested type.
    pub fn get_setting_as<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<SettingValue, Error = SettingsError>,
    {
        Ok(T::try_from(self.get_setting(name)?)?)
    }

    /// All ports of this instance, grouped by operator.
    pub fn list_ports(&self) -> HashMap<Operator, Vec<String>> {
        self.communicator.list_ports()
    }

    /// Whether the named port resolved to a conduit.
    pub fn is_connected(&self, port_name: &str) -> Result<bool> {
        self.check_port_(port_name)?;
        Ok(self.communicator.get_port(port_name).is_connected())
    }

    /// Whether the named port is a vector port.
    pub fn is_vector_port(&self, port_name: &str) -> Result<bool> {
        self.check_port_(port_name)?;
        Ok(self.communicator.get_port(port_name).is_vector())
    }

    /// Whether the named vector port's length may be set locally.
    pub fn is_resizable(&self, port_name: &str) -> Result<bool> {
        self.check_port_(port_name)?;
        Ok(self.communicator.get_port(port_name).is_resizable())
    }

    /// The current length of the named vector port.
    pub fn get_port_length(&self, port_name: &str) -> Result<usize> {
        self.check_port_(port_name)?;
        self.communicator.get_port(port_name).length()
    }

    /// Resize the named resizable vector port.
    pub fn set_port_length(&mut self, port_name: &str, length: usize) -> Result<()> {
        self.check_port_(port_name)?;
        self.communicator.get_port_mut(port_name).set_length(length)
    }

    /// Shut down communication and deregister. Idempotent; also runs on
    /// drop if it has not been called.
    pub fn shutdown(&mut self) {
        self.shutdown_();
    }

    /// Log `message`, shut down gracefully, and terminate the process with
    /// exit status 1.
    ///
    /// For fatal conditions in the user's code: shutting down first lets
    /// peers and the manager observe a clean termination instead of a hang.
    pub fn exit_error(&mut self, message: &str) -> ! {
        error!("'{}' exiting: {message}", self.name);
        self.shutdown_();
        process::exit(1);
    }

    // ── Registration and connection ─────────────────────────────────────

    /// Register this instance with the manager.
    fn register_(&mut self) -> Result<()> {
        let start = ProfileTimestamp::now();
        let locations = self.communicator.get_locations();
        let port_list = self.list_declared_ports_()?;
        self.manager
            .lock()
            .register_instance(&self.name, locations, port_list)?;
        self.profiler
            .record_event(ProfileEvent::new(ProfileEventType::Register, start));
        debug!("'{}' registered with the manager", self.name);
        Ok(())
    }

    /// Connect to peers and load the base settings.
    fn connect_(&mut self) -> Result<()> {
        let start = ProfileTimestamp::now();
        let (conduits, peer_dims, peer_locations) =
            self.manager.lock().request_peers(&self.name)?;
        self.communicator
            .connect(conduits, peer_dims, peer_locations)?;
        self.settings_manager.base = self.manager.lock().get_settings()?;

        // Apply the configured profiling level before recording anything
        // further.
        if let Ok(key) = PROFILE_LEVEL_SETTING.parse::<Reference>() {
            if let Ok(value) = self.settings_manager.get_setting(&self.name, &key) {
                if let Some(level) = value.as_str() {
                    self.profiler.set_level(level);
                }
            }
        }
        self.profiler
            .record_event(ProfileEvent::new(ProfileEventType::Connect, start));
        debug!("'{}' connected to its peers", self.name);
        Ok(())
    }

    /// Withdraw the registration. The profiler is flushed afterwards; this
    /// is the last traffic the manager sees from us.
    fn deregister_(&mut self) {
        let start = ProfileTimestamp::now();
        if let Err(e) = self.manager.lock().deregister_instance(&self.name) {
            warn!("'{}' failed to deregister: {e}", self.name);
        }
        self.profiler
            .record_event(ProfileEvent::new(ProfileEventType::Deregister, start));
        self.profiler.shutdown();
    }

    // ── Reuse loop ──────────────────────────────────────────────────────

    fn reuse_instance_(&mut self, apply_overlay: bool) -> Result<bool> {
        if !self.f_init_cache.is_empty() {
            warn!(
                "'{}' entered reuse_instance() with {} unreceived \
                 initialization messages; the previous iteration did not \
                 receive everything that was sent to it",
                self.name,
                self.f_init_cache.len(),
            );
        }

        let mut do_reuse = self.receive_settings_()?;
        self.pre_receive_f_init_(apply_overlay)?;

        let ports = self.communicator.list_ports();
        let f_init_connected = ports
            .get(&Operator::FInit)
            .is_some_and(|names| {
                names
                    .iter()
                    .any(|name| self.communicator.get_port(name).is_connected())
            });
        let settings_in_connected = self.communicator.settings_in_connected();

        if !f_init_connected && !settings_in_connected {
            // Nothing upstream can signal reuse; run exactly once.
            do_reuse = self.first_run;
            self.first_run = false;
        } else if self
            .f_init_cache
            .iter()
            .any(|(_, msg)| msg.data.is_close_port())
        {
            do_reuse = false;
        }

        debug!("'{}' reuse decision: {do_reuse}", self.name);
        Ok(do_reuse)
    }

    /// Receive the settings overlay for this iteration.
    ///
    /// Returns false iff the settings input delivered the close-port
    /// sentinel, meaning the submodel will not run again.
    fn receive_settings_(&mut self) -> Result<bool> {
        let default = Message::new(0.0, Data::Settings(Settings::new()))
            .with_settings(Settings::new());
        let msg = self
            .communicator
            .receive_message(SETTINGS_IN_PORT, None, Some(default))?;

        if msg.data.is_close_port() {
            return Ok(false);
        }
        let overlay = match msg.data {
            Data::Settings(settings) => settings,
            _ => {
                return Err(InstanceError::Logic(format!(
                    "'{}' received a message on {SETTINGS_IN_PORT} that is \
                     not a Settings value; the simulation is miswired or the \
                     sending instance is broken",
                    self.name,
                )));
            }
        };

        // The payload shadows the overlay the message travelled with.
        let mut settings = msg.settings.unwrap_or_default();
        for (key, value) in overlay.iter() {
            settings.set(key.clone(), value.clone());
        }
        self.settings_manager.overlay = settings;
        Ok(true)
    }

    /// Receive all initialization inputs into the cache.
    fn pre_receive_f_init_(&mut self, apply_overlay: bool) -> Result<()> {
        self.f_init_cache.clear();
        let ports = self.communicator.list_ports();
        let Some(f_init_ports) = ports.get(&Operator::FInit) else {
            return Ok(());
        };
        for port_name in f_init_ports {
            let (connected, vector) = {
                let port = self.communicator.get_port(port_name);
                (port.is_connected(), port.is_vector())
            };
            if !connected {
                continue;
            }
            if !vector {
                self.pre_receive_(port_name, None, apply_overlay)?;
            } else {
                // The slot 0 probe resolves the length of a resizable port,
                // so the length is read only after it.
                self.pre_receive_(port_name, Some(0), apply_overlay)?;
                let length = self.communicator.get_port(port_name).length()?;
                for slot in 0..length {
                    self.pre_receive_(port_name, Some(slot), apply_overlay)?;
                }
            }
        }
        Ok(())
    }

    /// Receive one initialization message and cache it.
    fn pre_receive_(
        &mut self,
        port_name: &str,
        slot: Option<usize>,
        apply_overlay: bool,
    ) -> Result<()> {
        let mut key: Reference = port_name.parse()?;
        if let Some(slot) = slot {
            key = key.with_index(slot);
        }
        let mut msg = self.communicator.receive_message(port_name, slot, None)?;
        if apply_overlay {
            self.apply_overlay_(&msg);
            self.check_compatibility_(port_name, msg.settings.as_ref())?;
            msg.settings = None;
        }
        self.f_init_cache.insert(key, msg);
        Ok(())
    }

    /// Adopt the message's overlay as ours, if we do not have one yet.
    fn apply_overlay_(&mut self, message: &Message) {
        if self.settings_manager.overlay.is_empty() {
            if let Some(settings) = &message.settings {
                self.settings_manager.overlay = settings.clone();
            }
        }
    }

    /// Fail if a received overlay differs from the local one.
    ///
    /// Every instance taking part in one reuse iteration must observe the
    /// same overlay; a mismatch means data from a parallel universe.
    fn check_compatibility_(
        &self,
        port_name: &str,
        overlay: Option<&Settings>,
    ) -> Result<()> {
        let Some(overlay) = overlay else {
            return Ok(());
        };
        if self.settings_manager.overlay != *overlay {
            return Err(InstanceError::Logic(format!(
                "'{}' unexpectedly received data from a parallel universe on \
                 port '{port_name}'; my settings are \
                 {} and I received from a universe with {overlay}",
                self.name, self.settings_manager.overlay,
            )));
        }
        Ok(())
    }

    // ── Send / receive dispatch ─────────────────────────────────────────

    fn send_(&mut self, port_name: &str, mut message: Message, slot: Option<usize>) -> Result<()> {
        self.check_port_(port_name)?;
        if message.settings.is_none() {
            message.settings = Some(self.settings_manager.overlay.clone());
        }
        self.communicator.send_message(port_name, message, slot)
    }

    fn receive_message_(
        &mut self,
        port_name: &str,
        slot: Option<usize>,
        default: Option<Message>,
        with_settings: bool,
    ) -> Result<Message> {
        self.check_port_(port_name)?;

        let mut port_ref: Reference = port_name.parse()?;
        if let Some(slot) = slot {
            port_ref = port_ref.with_index(slot);
        }
        let (oper, connected) = {
            let port = self.communicator.get_port(port_name);
            (port.operator(), port.is_connected())
        };

        if oper == Operator::FInit {
            match self.f_init_cache.take(&port_ref) {
                Some(msg) => {
                    if with_settings && !msg.has_settings() {
                        return Err(InstanceError::Logic(String::from(
                            "receiving with settings on an initialization \
                             port requires passing apply_overlay = false to \
                             reuse_instance(); with apply_overlay = true the \
                             settings have already been applied and stripped",
                        )));
                    }
                    Ok(msg)
                }
                None if connected => Err(InstanceError::Logic(format!(
                    "tried to receive twice on port '{port_ref}' within a \
                     single initialization phase, which is not possible; did \
                     you forget to call reuse_instance() in your reuse loop?",
                ))),
                None => default.ok_or_else(|| {
                    InstanceError::Logic(format!(
                        "tried to receive on port '{port_ref}', which is not \
                         connected, and no default value was given; please \
                         connect this port",
                    ))
                }),
            }
        } else {
            if connected && !self.communicator.get_port(port_name).is_open(slot) {
                // A closed slot delivers nothing further, so there is no
                // point blocking on it.
                return Err(InstanceError::PeerFault(format!(
                    "port '{port_ref}' is closed, but we are trying to \
                     receive on it; did the peer crash?",
                )));
            }
            let mut msg = self.communicator.receive_message(port_name, slot, default)?;
            if connected && !with_settings {
                self.check_compatibility_(port_name, msg.settings.as_ref())?;
            }
            if !with_settings {
                msg.settings = None;
            }
            Ok(msg)
        }
    }

    /// Fail if the named port was never declared.
    fn check_port_(&self, port_name: &str) -> Result<()> {
        if !self.communicator.port_exists(port_name) {
            return Err(InstanceError::Logic(format!(
                "port '{port_name}' does not exist on '{}'; please check the \
                 name and the list of ports you declared",
                self.name,
            )));
        }
        Ok(())
    }

    /// The declared ports as (name, operator) pairs, with the `[]` vector
    /// suffix stripped.
    fn list_declared_ports_(&self) -> Result<Vec<(Identifier, Operator)>> {
        let mut result = Vec::new();
        if let Some(declared) = &self.declared_ports {
            for (oper, names) in declared {
                for full_name in names {
                    let bare = full_name.strip_suffix("[]").unwrap_or(full_name);
                    let name = Identifier::new(bare)
                        .map_err(|e| InstanceError::Config(e.to_string()))?;
                    result.push((name, *oper));
                }
            }
        }
        Ok(result)
    }

    // ── Shutdown ────────────────────────────────────────────────────────

    /// Close and drain all ports, stop the transport, and deregister.
    ///
    /// Idempotent: the first call wins, later calls return immediately.
    /// Runs on every error path before the error propagates, so failures
    /// inside it are logged rather than raised.
    fn shutdown_(&mut self) {
        if self.is_shut_down {
            return;
        }
        if let Err(e) = self.close_outgoing_ports_() {
            warn!("'{}' failed to close outgoing ports: {e}", self.name);
        }
        if let Err(e) = self.close_incoming_ports_() {
            warn!("'{}' failed to drain incoming ports: {e}", self.name);
        }
        if let Err(e) = self.communicator.shutdown() {
            warn!("'{}' failed to stop its transport: {e}", self.name);
        }
        self.deregister_();
        self.is_shut_down = true;
        info!("'{}' shut down", self.name);
    }

    /// Send the close-port sentinel on every slot of every sending port.
    fn close_outgoing_ports_(&mut self) -> Result<()> {
        let ports = self.communicator.list_ports();
        for (oper, names) in &ports {
            if !oper.allows_sending() {
                continue;
            }
            for name in names {
                let slots = {
                    let port = self.communicator.get_port(name);
                    if port.is_vector() {
                        Some(port.length()?)
                    } else {
                        None
                    }
                };
                match slots {
                    Some(length) => {
                        for slot in 0..length {
                            self.communicator.close_port(name, Some(slot))?;
                        }
                    }
                    None => self.communicator.close_port(name, None)?,
                }
            }
        }
        Ok(())
    }

    /// Drain every connected receiving port until its close-port sentinel,
    /// so that the sending peer can finish its own shutdown.
    fn close_incoming_ports_(&mut self) -> Result<()> {
        let ports = self.communicator.list_ports();
        for (oper, names) in &ports {
            if !oper.allows_receiving() {
                continue;
            }
            for name in names {
                let (connected, vector) = {
                    let port = self.communicator.get_port(name);
                    (port.is_connected(), port.is_vector())
                };
                if !connected {
                    continue;
                }
                if vector {
                    self.drain_incoming_vector_port_(name)?;
                } else {
                    self.drain_incoming_port_(name)?;
                }
            }
        }
        Ok(())
    }

    /// Receive and discard until the port reports closed.
    fn drain_incoming_port_(&mut self, port_name: &str) -> Result<()> {
        while self.communicator.get_port(port_name).is_open(None) {
            self.communicator.receive_message(port_name, None, None)?;
        }
        Ok(())
    }

    /// Receive and discard on every open slot until all slots report
    /// closed.
    fn drain_incoming_vector_port_(&mut self, port_name: &str) -> Result<()> {
        loop {
            let length = self.communicator.get_port(port_name).length()?;
            let mut all_closed = true;
            for slot in 0..length {
                if self.communicator.get_port(port_name).is_open(Some(slot)) {
                    self.communicator.receive_message(port_name, Some(slot), None)?;
                }
                if self.communicator.get_port(port_name).is_open(Some(slot)) {
                    all_closed = false;
                }
            }
            if all_closed {
                return Ok(());
            }
        }
    }
}

impl<C: Communicator, M: ManagerClient> Drop for Instance<C, M> {
    fn drop(&mut self) {
        if !self.is_shut_down {
            self.shutdown_();
        }
    }
}
