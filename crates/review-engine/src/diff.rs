//! Unified diff helpers

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,\d+)? \+(\d+)(?:,\d+)? @@").expect("valid hunk header regex")
});

/// New-file line number to the content of the added line.
pub type LineMapping = BTreeMap<u32, String>;

/// Maps every added line of `diff` to its line number in the new file.
///
/// Lines before the first hunk header are ignored. A header that does not
/// parse leaves the counters where they were. Line numbers never wrap.
pub fn extract_line_numbers(diff: &str) -> LineMapping {
    let mut mapping = LineMapping::new();
    let mut counters: Option<(u32, u32)> = None;

    for line in diff.split('\n') {
        if line.starts_with("@@") {
            if let Some(caps) = HUNK_HEADER.captures(line) {
                let old = caps[1].parse().ok();
                let new = caps[2].parse().ok();
                if let (Some(old), Some(new)) = (old, new) {
                    counters = Some((old, new));
                }
            }
            continue;
        }
        let Some((old, new)) = counters else {
            continue;
        };

        let added = line.strip_prefix('+').filter(|_| !line.starts_with("+++"));
        let next = if let Some(content) = added {
            mapping.insert(new, content.to_string());
            new.checked_add(1).map(|new| (old, new))
        } else if line.starts_with('-') && !line.starts_with("---") {
            old.checked_add(1).map(|old| (old, new))
        } else {
            old.checked_add(1).zip(new.checked_add(1))
        };
        // A counter past `u32::MAX` ends the hunk until the next header.
        counters = next;
    }
    mapping
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub header: String,
    /// Header line followed by the hunk body.
    pub lines: Vec<String>,
}

impl DiffHunk {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn split_hunks(diff: &str) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    let mut current: Option<DiffHunk> = None;

    for line in diff.lines() {
        if line.starts_with("@@") {
            if let Some(done) = current.take() {
                hunks.push(done);
            }
            current = Some(DiffHunk {
                header: line.to_string(),
                lines: Vec::new(),
            });
        }
        if let Some(hunk) = current.as_mut() {
            hunk.lines.push(line.to_string());
        }
    }
    hunks.extend(current);
    hunks
}

/// Several hunks or a newly created file are reviewed hunk by hunk.
pub fn review_by_hunks(diff: &str, hunks: &[DiffHunk]) -> bool {
    hunks.len() > 1 || diff.starts_with("@@ -0,0")
}

/// `line` itself when mapped, otherwise the closest mapped line (the lower
/// one on a tie).
pub fn nearest_line(mapping: &LineMapping, line: u32) -> Option<u32> {
    if mapping.contains_key(&line) {
        return Some(line);
    }
    mapping
        .keys()
        .copied()
        .min_by_key(|candidate| candidate.abs_diff(line))
}
