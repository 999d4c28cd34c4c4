#![warn(missing_docs)]
//! # stalebox-core
//!
//! Core traits and types for the stalebox single-value cache.
//!
//! This crate defines the collaborators a `TimedCache` is assembled from, so
//! that alternative implementations can be plugged in without depending on
//! the cache itself:
//!
//! - **Compute** the cached value ([`Source`])
//! - **Measure** staleness ([`Clock`])
//! - **Execute** background refreshes ([`Offload`])
//! - **Report** how a read was served ([`CacheStatus`])

pub mod clock;
pub mod offload;
pub mod source;
pub mod status;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use offload::Offload;
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use source::Source;
pub use status::CacheStatus;
