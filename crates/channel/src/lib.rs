//! The file contract shared by the plugin and the overlay process.
//!
//! Neither process talks to the other directly. The plugin appends to its log
//! and overwrites the chat-context file; the overlay tails the log, watches the
//! context file, and holds a lock file while it runs.

mod paths;
mod settings;
mod signals;
mod snapshot;

pub use paths::{exe_directory, Paths};
pub use settings::{default_config_path, load_config};
pub use signals::{parse_signals, LogSignal, CHUNK_TAG, COMPLETION_TAG};
pub use snapshot::{read_snapshot, write_snapshot};
