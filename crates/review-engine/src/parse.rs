//! Review text parsing

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

static LINE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\[)?Line[s]*\s*(\d+(?:-\d+)?)(?:[\]:])?").expect("valid line marker regex")
});

static COMMENT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:Fix|Recommendation|Problem):\s*(.+)").expect("valid comment marker regex")
});

/// New-file line number to the comment anchored there.
pub type ReviewComments = BTreeMap<u32, String>;

/// Parses blank-line separated issue blocks.
///
/// A block counts only when it names a line (`[Line 12]`, `Line 10-14`) and
/// carries a `Fix:`, `Recommendation:` or `Problem:` line; whichever of those
/// comes first becomes the comment. Ranges anchor at their first line.
pub fn parse_plain_text_review(text: &str) -> ReviewComments {
    let mut comments = ReviewComments::new();

    for block in text.trim().split("\n\n") {
        let line = LINE_MARKER
            .captures(block)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().split('-').next())
            .and_then(|start| start.parse::<u32>().ok());
        let comment = COMMENT_MARKER
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());

        match (line, comment) {
            (Some(line), Some(comment)) => {
                comments.insert(line, comment);
            }
            _ => debug!("Skipped review block without line or comment marker"),
        }
    }

    if comments.is_empty() {
        debug!("No line-anchored comments in review text");
    }
    comments
}

/// Accepts `[{"line": 12, "comment": ".."}]`, `{"12": ".."}` or plain text.
pub fn parse_model_output(text: &str) -> ReviewComments {
    match serde_json::from_str::<JsonValue>(text.trim()) {
        Ok(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let line = json_line(item.get("line")?)?;
                let comment = item.get("comment")?.as_str()?;
                Some((line, comment.to_string()))
            })
            .collect(),
        Ok(JsonValue::Object(entries)) => entries
            .iter()
            .filter_map(|(key, value)| match (key.trim().parse::<u32>(), value.as_str()) {
                (Ok(line), Some(comment)) => Some((line, comment.to_string())),
                _ => {
                    warn!(key = %key, "Ignoring non line-keyed review entry");
                    None
                }
            })
            .collect(),
        _ => parse_plain_text_review(text),
    }
}

fn json_line(value: &JsonValue) -> Option<u32> {
    match value {
        JsonValue::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
