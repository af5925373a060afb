//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (performance clock on web, virtual clock in tests and headless runs)
//! - Storage (LocalStorage on web, in-memory elsewhere)

pub mod storage;
pub mod time;

pub use storage::{KeyValueStore, MemoryStore};
pub use time::{Clock, VirtualClock};

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageStore;
#[cfg(target_arch = "wasm32")]
pub use time::BrowserClock;
