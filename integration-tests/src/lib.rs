//! MCF Integration Tests
//!
//! Full-lifecycle tests for the instance runtime: each test wires a real
//! [`mcf_instance_runtime::Instance`] to in-memory transport and manager
//! doubles and drives it the way a user's submodel would, from bootstrap
//! through the reuse loop to graceful shutdown.
//!
//! # Scenarios
//!
//! 1. **Coupled submodel**: settings overlays and initialization inputs per
//!    iteration, sends carrying the active overlay, termination by the
//!    close-port sentinel on the settings input
//! 2. **Vector ports**: per-slot pre-receive, resizing, per-slot close
//!    sentinels at shutdown
//! 3. **Parallel universe detection**: mismatched overlays abort cleanly
//! 4. **Uncoupled submodel**: no upstream signals, runs exactly once

pub mod harness;

#[cfg(test)]
mod lifecycle_tests;
