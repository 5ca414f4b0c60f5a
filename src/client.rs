//! Application bootstrap and navigation guard pipeline
//!
//! This module provides access to waypoint-client.
//!
//! ## Architecture
//!
//! - **Bootstrap**: one-time launch, initial redirect, mount and ready
//! - **Guards**: LOAD (lazy components, asset failures) and RENDER
//!   (shared context, validation, middleware) on every transition
//! - **Refresh**: data re-run for reused instances, stale error clearing
//! - **Bus**: current error and lifecycle events

// Re-export all waypoint-client functionality
pub use waypoint_client::*;
