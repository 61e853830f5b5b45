//! Test harness for driving an instance against in-memory collaborators.
//!
//! The harness does NOT spin up a manager or any network transport; it
//! assembles an [`Instance`] on top of the runtime's recording doubles and
//! hands the test a fixture with ledger handles for inspection, including
//! after the instance has been dropped.

use {
    mcf_coupling_model::{Identifier, Operator, SettingValue, Settings},
    mcf_instance_runtime::{
        testing::{CommLedger, ManagerLedger, MockCommunicator, MockManagerClient},
        Data, Instance, InstanceConfig, Message, Port, PortsDescription, SETTINGS_IN_PORT,
    },
    parking_lot::Mutex,
    std::{collections::HashMap, sync::Arc},
};

/// Time step used by the pretend submodels in these tests.
pub const DT: f64 = 0.1;

/// An instance under test, wired to recording doubles.
pub struct InstanceFixture {
    /// The instance, as the user's code sees it.
    pub instance: Instance<MockCommunicator, MockManagerClient>,
    /// Transport ledger: queued, sent, closed, shutdowns.
    pub comm: Arc<Mutex<CommLedger>>,
    /// Manager ledger: registrations, deregistrations, profile batches.
    pub manager: Arc<Mutex<ManagerLedger>>,
}

impl InstanceFixture {
    /// Queue a message for a later receive on (port, slot).
    pub fn queue(&self, port_name: &str, slot: Option<usize>, message: Message) {
        self.comm.lock().queue_message(port_name, slot, message);
    }

    /// Queue a settings overlay for the next reuse iteration.
    pub fn queue_overlay(&self, overlay: Settings) {
        self.queue(
            SETTINGS_IN_PORT,
            None,
            Message::new(0.0, Data::Settings(overlay)).with_settings(Settings::new()),
        );
    }

    /// Queue the close-port sentinel on (port, slot).
    pub fn queue_close(&self, port_name: &str, slot: Option<usize>) {
        self.queue(port_name, slot, Message::new(0.0, Data::ClosePort));
    }
}

/// Builder for an [`InstanceFixture`].
pub struct InstanceSetup {
    name: String,
    declared: PortsDescription,
    comm: MockCommunicator,
    base: Settings,
}

impl InstanceSetup {
    /// Start building an instance with the given fully qualified name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            declared: HashMap::new(),
            comm: MockCommunicator::new(),
            base: Settings::new(),
        }
    }

    /// Declare a scalar port and set up its runtime state.
    pub fn scalar_port(mut self, name: &str, oper: Operator, connected: bool) -> Self {
        self.declared
            .entry(oper)
            .or_default()
            .push(name.to_string());
        self.comm = self
            .comm
            .with_port(Port::scalar(ident(name), oper, connected));
        self
    }

    /// Declare a vector port and set up its runtime state.
    pub fn vector_port(
        mut self,
        name: &str,
        oper: Operator,
        connected: bool,
        length: usize,
        resizable: bool,
    ) -> Self {
        self.declared
            .entry(oper)
            .or_default()
            .push(format!("{name}[]"));
        self.comm = self
            .comm
            .with_port(Port::vector(ident(name), oper, connected, length, resizable));
        self
    }

    /// Connect the reserved settings input.
    pub fn with_settings_in(mut self) -> Self {
        self.comm = self.comm.with_settings_in(true);
        self
    }

    /// Set the base settings the manager hands out.
    pub fn with_base_setting(mut self, key: &str, value: SettingValue) -> Self {
        self.base.set(key.parse().unwrap(), value);
        self
    }

    /// Build the fixture: parse the command line, register, and connect.
    pub fn build(self) -> InstanceFixture {
        let comm_ledger = self.comm.ledger();
        let manager = MockManagerClient::new().with_settings(self.base);
        let manager_ledger = manager.ledger();

        let config = InstanceConfig::from_args(&[
            "submodel".to_string(),
            format!("--muscle-instance={}", self.name),
        ])
        .unwrap();
        let instance =
            Instance::new(config, Some(self.declared), self.comm, manager).unwrap();

        InstanceFixture {
            instance,
            comm: comm_ledger,
            manager: manager_ledger,
        }
    }
}

fn ident(name: &str) -> Identifier {
    Identifier::new(name).unwrap()
}

/// An overlay binding `dt` to the given value.
pub fn dt_overlay(dt: f64) -> Settings {
    let mut overlay = Settings::new();
    overlay.set("dt".parse().unwrap(), SettingValue::Float(dt));
    overlay
}
