//! Control lifecycle states and transition events

use std::fmt;

use genie_core_types::ActivationId;
use tokio::time::Instant;

/// Reserved element id of the single review control in a document.
pub const CONTROL_ID: &str = "ai-code-review-button";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlState {
    Unmounted,
    Armed,
    Submitting,
    Succeeded,
    Failed,
}

impl ControlState {
    /// Presentational pauses that always lead back to `Armed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ControlState::Succeeded | ControlState::Failed)
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, ControlState::Armed)
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlState::Unmounted => "unmounted",
            ControlState::Armed => "armed",
            ControlState::Submitting => "submitting",
            ControlState::Succeeded => "succeeded",
            ControlState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Published on every state change of the control.
#[derive(Debug, Clone)]
pub struct ControlTransition {
    /// `None` for the mount transition.
    pub activation: Option<ActivationId>,
    pub from: ControlState,
    pub to: ControlState,
    pub label: String,
    pub background: String,
    pub enabled: bool,
    pub at: Instant,
}
