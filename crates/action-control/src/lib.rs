//! Review action control
//!
//! Mounts a single `button#ai-code-review-button` into a merge request page
//! and drives it through one review request per activation:
//! - `Unmounted → Armed → Submitting → (Succeeded | Failed) → Armed`
//! - Disabled for the whole in-flight window
//! - Blocking notification on failure
//! - Reset to `Armed` after a fixed delay on every exit path

mod controller;
pub mod errors;
mod guard;
mod notifier;
mod state;
mod subject;
mod theme;
mod transport;

pub use controller::*;
pub use errors::*;
pub use guard::*;
pub use notifier::*;
pub use state::*;
pub use subject::*;
pub use theme::*;
pub use transport::*;
