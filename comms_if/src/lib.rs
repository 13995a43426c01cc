//! # Communications interface crate.
//!
//! Provides the command interfaces through which external collaborators (operators, scripts,
//! voice or keyboard front ends) talk to the line follower.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;
