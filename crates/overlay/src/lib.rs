//! The Aria avatar window.
//!
//! Runs as its own process, launched by the plugin. Everything it knows about
//! the conversation comes from polling the plugin log and the chat-context
//! file; it closes itself once the log goes quiet.

pub mod accumulator;
pub mod app;
pub mod bubble;
pub mod config;
pub mod drag;
pub mod emotion;
pub mod liveness;
pub mod lock;
pub mod logging;
pub mod sprite;
pub mod state;
pub mod tail;

pub use app::OverlayApp;
pub use lock::{InstanceLock, LockError};
pub use state::{OverlayState, Step};
