//! Role assignments on Markdown checklist lines, and an index of the tasks
//! that carry them.
//!
//! - [`codec`] reads, writes and strips `[🚗:: [[People/John|@John]]]` blocks
//! - [`metadata`] finds where a line's trailing metadata begins
//! - [`extract`] turns checklist lines into [`types::TaskRecord`]s
//! - [`index`] keeps those records current and persisted

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod index;
pub mod logging;
pub mod metadata;
pub mod roles;
pub mod store;
pub mod types;
pub mod watcher;
