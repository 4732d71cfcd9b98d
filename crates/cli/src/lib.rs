//! Demo agents hosted by the `agentloop` binary.
//!
//! Kept in a library target so the end-to-end tests can drive the same
//! agents against scripted gateways.

pub mod demos;
