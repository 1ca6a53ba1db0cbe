//! Element Watcher
//!
//! Resolves once a region matching one of a priority-ordered list of
//! selectors is present in the host document:
//! - Checks synchronously first and never registers an observer on a hit
//! - Otherwise watches structural changes only and re-checks per batch
//! - Detaches on first match; dropping the wait also detaches
//! - No timeout

pub mod errors;
mod watcher;

pub use errors::*;
pub use watcher::*;
