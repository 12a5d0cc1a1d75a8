//! Workspace placeholder crate.
//!
//! Exposes the feature flags that map onto the workspace crates so a host can
//! depend on `readspace-sync` and pick a provider set (e.g., `notion`) without
//! wiring `core-service` and the provider crates individually.

#[cfg(any(feature = "desktop-shims", feature = "notion"))]
pub use core_service::*;
