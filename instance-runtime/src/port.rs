//! Runtime state of a single port.
//!
//! Where the model crate describes ports declaratively (a name and an
//! operator), this type tracks what the transport layer knows at run time:
//! whether the port resolved to a conduit, whether it is a vector port and of
//! what length, and which slots are still open. A slot transitions to closed
//! when the close-port sentinel is received on it, and never reopens.

use {
    crate::error::{InstanceError, Result},
    mcf_coupling_model::{Identifier, Operator},
};

/// Runtime state of a port, owned by the transport layer.
#[derive(Debug, Clone)]
pub struct Port {
    name: Identifier,
    oper: Operator,
    is_connected: bool,
    /// `Some(length)` for vector ports, `None` for scalar ports.
    length: Option<usize>,
    /// Open flag per slot; a single flag for scalar ports.
    slots_open: Vec<bool>,
    is_resizable: bool,
}

impl Port {
    /// Create a scalar port.
    pub fn scalar(name: Identifier, oper: Operator, is_connected: bool) -> Self {
        Self {
            name,
            oper,
            is_connected,
            length: None,
            slots_open: vec![true],
            is_resizable: false,
        }
    }

    /// Create a vector port with `length` connected slots, all open.
    pub fn vector(
        name: Identifier,
        oper: Operator,
        is_connected: bool,
        length: usize,
        is_resizable: bool,
    ) -> Self {
        Self {
            name,
            oper,
            is_connected,
            length: Some(length),
            slots_open: vec![true; length],
            is_resizable,
        }
    }

    /// The port's name.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// The lifecycle phase this port belongs to.
    pub fn operator(&self) -> Operator {
        self.oper
    }

    /// Whether a conduit is attached to this port.
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Whether this is a vector port.
    pub fn is_vector(&self) -> bool {
        self.length.is_some()
    }

    /// Whether the vector length may be set locally.
    pub fn is_resizable(&self) -> bool {
        self.is_resizable
    }

    /// The number of slots of a vector port.
    pub fn length(&self) -> Result<usize> {
        self.length.ok_or_else(|| {
            InstanceError::Logic(format!(
                "port '{}' is not a vector port and has no length",
                self.name
            ))
        })
    }

    /// Set the length of a resizable vector port.
    ///
    /// Slots kept from the old length retain their open state; new slots
    /// start open.
    pub fn set_length(&mut self, length: usize) -> Result<()> {
        if !self.is_resizable {
            return Err(InstanceError::Logic(format!(
                "port '{}' is not resizable; its length is fixed by the peer \
                 instance set",
                self.name
            )));
        }
        self.length = Some(length);
        self.slots_open.resize(length, true);
        Ok(())
    }

    /// Whether the given slot is still open.
    ///
    /// `None` addresses a scalar port (or slot 0). A slot beyond the current
    /// length reports closed.
    pub fn is_open(&self, slot: Option<usize>) -> bool {
        let index = slot.unwrap_or(0);
        self.slots_open.get(index).copied().unwrap_or(false)
    }

    /// Mark the given slot (or the scalar port) as closed.
    pub fn set_closed(&mut self, slot: Option<usize>) {
        let index = slot.unwrap_or(0);
        if let Some(flag) = self.slots_open.get_mut(index) {
            *flag = false;
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
