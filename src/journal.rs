//! Write-ahead journal.
//!
//! Every mutation of the store is recorded here before the primary file
//! catches up, providing:
//! - Journal entry formatting (length-prefixed token protocol)
//! - Pending-entry buffering and batched flushing
//! - Ordered replay for startup recovery
//! - Retirement of the log once a snapshot supersedes it

pub mod manager;
pub mod record;

pub use manager::Journal;
pub use record::{Command, DELIMITER};
