//! Pizzini - automated publication of short Italian texts
//!
//! This library provides the core of the pizzini publisher: a
//! platform-aware content formatter and a posting scheduler with
//! deduplication, plus the configuration, logging and entry-loading
//! plumbing the binaries share.

pub mod config;
pub mod coordinator;
pub mod entries;
pub mod error;
pub mod formatter;
pub mod logging;
pub mod scheduling;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use entries::EntryCatalog;
pub use error::{PizziniError, Result};
pub use formatter::ContentFormatter;
pub use scheduling::{PostCallback, PostScheduler};
pub use types::{ContentEntry, EntryId, FormattedPost};
