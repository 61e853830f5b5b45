//! Operators and conduits: the coupling topology vocabulary.
//!
//! Every port on a compute element belongs to a lifecycle phase, its
//! [`Operator`]. Conduits connect a port on one compute element to a port on
//! another; at run time the manager resolves them to concrete peer instances.

use {
    crate::reference::{Identifier, RefPart, Reference},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// The lifecycle phase a port belongs to.
///
/// The submodel execution loop visits the phases in order: initialization
/// (`F_INIT`), then repeatedly intermediate output (`O_I`) and state update
/// (`S`), and finally the last output (`O_F`). `B` marks boundary ports that
/// both send and receive. `NONE` tags the reserved settings input, which the
/// runtime manages on the user's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// No user-visible phase; used for the reserved settings input.
    #[serde(rename = "NONE")]
    None,
    /// Initialization input.
    #[serde(rename = "F_INIT")]
    FInit,
    /// Intermediate output, once per state update.
    #[serde(rename = "O_I")]
    OI,
    /// State input, once per state update.
    #[serde(rename = "S")]
    S,
    /// Boundary exchange.
    #[serde(rename = "B")]
    B,
    /// Final output.
    #[serde(rename = "O_F")]
    OF,
}

impl Operator {
    /// Whether ports with this operator send messages.
    pub fn allows_sending(&self) -> bool {
        matches!(self, Operator::OI | Operator::OF | Operator::B)
    }

    /// Whether ports with this operator receive messages.
    pub fn allows_receiving(&self) -> bool {
        matches!(self, Operator::FInit | Operator::S | Operator::B)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::None => "NONE",
            Operator::FInit => "F_INIT",
            Operator::OI => "O_I",
            Operator::S => "S",
            Operator::B => "B",
            Operator::OF => "O_F",
        };
        f.write_str(name)
    }
}

/// A channel in the coupling topology, connecting the sending port
/// `sender` to the receiving port `receiver`.
///
/// Both endpoints are references of the form `compute_element.port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conduit {
    /// The sending endpoint, `compute_element.port`.
    pub sender: Reference,
    /// The receiving endpoint, `compute_element.port`.
    pub receiver: Reference,
}

impl Conduit {
    /// Create a conduit between two endpoints.
    pub fn new(sender: Reference, receiver: Reference) -> Self {
        Self { sender, receiver }
    }

    /// The compute element the sending port belongs to.
    pub fn sending_compute_element(&self) -> Reference {
        self.sender.truncated(self.sender.len() - 1)
    }

    /// The name of the sending port, if the endpoint is well-formed.
    pub fn sending_port(&self) -> Option<&Identifier> {
        last_identifier(&self.sender)
    }

    /// The compute element the receiving port belongs to.
    pub fn receiving_compute_element(&self) -> Reference {
        self.receiver.truncated(self.receiver.len() - 1)
    }

    /// The name of the receiving port, if the endpoint is well-formed.
    pub fn receiving_port(&self) -> Option<&Identifier> {
        last_identifier(&self.receiver)
    }
}

impl fmt::Display for Conduit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.sender, self.receiver)
    }
}

fn last_identifier(endpoint: &Reference) -> Option<&Identifier> {
    match endpoint.parts().last() {
        Some(RefPart::Identifier(id)) => Some(id),
        _ => None,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_directions() {
        assert!(Operator::OI.allows_sending());
        assert!(Operator::OF.allows_sending());
        assert!(Operator::B.allows_sending());
        assert!(!Operator::FInit.allows_sending());
        assert!(!Operator::S.allows_sending());
        assert!(!Operator::None.allows_sending());

        assert!(Operator::FInit.allows_receiving());
        assert!(Operator::S.allows_receiving());
        assert!(Operator::B.allows_receiving());
        assert!(!Operator::OI.allows_receiving());
        assert!(!Operator::OF.allows_receiving());
        assert!(!Operator::None.allows_receiving());
    }

    #[test]
    fn test_conduit_endpoints() {
        let conduit = Conduit::new(
            "macro.state_out".parse().unwrap(),
            "micro.init_in".parse().unwrap(),
        );
        assert_eq!(conduit.sending_compute_element().to_string(), "macro");
        assert_eq!(conduit.sending_port().unwrap().as_str(), "state_out");
        assert_eq!(conduit.receiving_compute_element().to_string(), "micro");
        assert_eq!(conduit.receiving_port().unwrap().as_str(), "init_in");
        assert_eq!(conduit.to_string(), "macro.state_out -> micro.init_in");
    }
}
