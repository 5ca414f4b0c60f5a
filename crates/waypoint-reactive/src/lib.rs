//! Waypoint Reactive - single-threaded reactive primitives
//!
//! The navigation pipeline in `waypoint-client` never runs work in parallel.
//! Every deferred continuation goes through the cooperative tick queue kept by
//! the thread-local [`Runtime`], and every piece of observable state is a
//! [`Signal`].
//!
//! ## Modules
//!
//! - [`runtime`]: node ids, the tick queue and the optional host scheduler
//! - [`signal`]: `Signal<T>` with synchronous watchers
//! - [`completion`]: two-phase completion signal (state applied / render flushed)
//!
//! ## Example
//!
//! ```ignore
//! use waypoint_reactive::{Signal, flush_ticks, next_tick};
//!
//! let count = Signal::new(0);
//! let handle = count.watch(|value| tracing::info!(value, "count changed"));
//!
//! let deferred = count.clone();
//! next_tick(move || deferred.set(1));
//! assert_eq!(count.get(), 0);
//!
//! flush_ticks();
//! assert_eq!(count.get(), 1);
//! handle.unwatch();
//! ```

#![warn(missing_docs)]

pub mod completion;
pub mod runtime;
pub mod signal;

pub use completion::{Completion, Phase};
pub use runtime::{
	NodeId, Runtime, flush_ticks, next_tick, pending_ticks, set_scheduler, with_runtime,
};
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use runtime::install_microtask_scheduler;
pub use signal::{Signal, WatchHandle};
