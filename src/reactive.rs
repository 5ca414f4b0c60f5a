//! Signals, watchers and the cooperative tick queue
//!
//! This module provides access to waypoint-reactive, the single-threaded
//! runtime the navigation pipeline defers its work through.
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypoint::reactive::{Signal, flush_ticks, next_tick};
//!
//! let count = Signal::new(0);
//! let _watch = count.watch(|value| tracing::info!(value, "count changed"));
//!
//! next_tick({
//!     let count = count.clone();
//!     move || count.update(|n| *n += 1)
//! });
//! flush_ticks();
//! assert_eq!(count.get(), 1);
//! ```

// Re-export all waypoint-reactive functionality
pub use waypoint_reactive::*;
