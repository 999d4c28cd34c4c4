//! Worker pools for background refreshes.
//!
//! A `TimedCache` hands stale-value reloads to an [`Offload`] implementation
//! and never awaits them. Two implementations are provided:
//!
//! - [`OffloadManager`] - spawns onto the ambient tokio runtime and tracks
//!   outstanding tasks so the application can wait for or cancel them.
//! - [`tokio::runtime::Handle`] - spawns onto a specific runtime, fire-and-forget.
//!
//! # Example
//!
//! ```ignore
//! use stalebox::offload::{OffloadConfig, OffloadManager};
//! use std::time::Duration;
//!
//! let manager = OffloadManager::new(
//!     OffloadConfig::builder().warn_after(Duration::from_secs(5)).build(),
//! );
//!
//! manager.spawn("refresh", async {
//!     // Reload logic here
//! });
//! ```

mod manager;
mod policy;

pub use manager::{OffloadHandle, OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, OffloadConfigBuilder, TimeoutPolicy};
pub use smol_str::SmolStr;
pub use stalebox_core::Offload;
