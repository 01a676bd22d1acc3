//! Collector implementations

#[cfg(feature = "console")]
pub mod console;
#[cfg(feature = "file")]
pub mod file;
pub mod offload;

#[cfg(feature = "console")]
pub use console::ConsoleCollector;
#[cfg(feature = "file")]
pub use file::{FileCloseHandle, FileCollector, FileCollectorBuilder};
pub use offload::Offloaded;

pub use crate::core::{Collector, FnCollector};
