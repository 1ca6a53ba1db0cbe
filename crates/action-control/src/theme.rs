//! Labels and colours for each visible state

use crate::state::ControlState;

pub const CONTROL_CLASS: &str = "gl-button btn btn-confirm";
pub const FAILURE_PREFIX: &str = "⚠️ Error during review: ";

/// What the control looks like in one state. `None` leaves the property as
/// it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appearance {
    pub label: String,
    pub background: String,
    pub color: Option<String>,
    pub border: String,
}

impl Appearance {
    fn new(label: &str, background: &str, color: Option<&str>, border: &str) -> Self {
        Self {
            label: label.to_string(),
            background: background.to_string(),
            color: color.map(str::to_string),
            border: border.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTheme {
    pub armed: Appearance,
    pub submitting: Appearance,
    pub succeeded: Appearance,
    pub failed: Appearance,
}

impl Default for ControlTheme {
    fn default() -> Self {
        Self {
            armed: Appearance::new("🤖 Genie Review", "#007bff", None, "1px solid #007bff"),
            submitting: Appearance::new(
                "🔄 Analyzing...",
                "#dc3545",
                Some("white"),
                "1px solid #a71d2a",
            ),
            succeeded: Appearance::new("✅ Review Complete", "#28a745", None, "1px solid #1c7430"),
            failed: Appearance::new("❌ Failed", "#6c757d", None, "1px solid #5a6268"),
        }
    }
}

impl ControlTheme {
    pub fn appearance(&self, state: ControlState) -> Option<&Appearance> {
        match state {
            ControlState::Unmounted => None,
            ControlState::Armed => Some(&self.armed),
            ControlState::Submitting => Some(&self.submitting),
            ControlState::Succeeded => Some(&self.succeeded),
            ControlState::Failed => Some(&self.failed),
        }
    }
}

pub fn failure_notice(message: &str) -> String {
    format!("{FAILURE_PREFIX}{message}")
}
