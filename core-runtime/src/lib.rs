//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the sync engine crates:
//! - Logging and tracing setup
//! - Configuration management
//!
//! Nothing here knows about books, quotes or providers. The crate wires
//! host capabilities (HTTP, time, log sinks) into a validated [`config::CoreConfig`]
//! and installs the `tracing` subscriber every other crate logs through.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
