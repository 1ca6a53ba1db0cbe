//! Prompts for the reviewing model

use crate::diff::LineMapping;

/// Lower-cased extension of `path`, or `unknown`.
pub fn file_type(path: Option<&str>) -> String {
    path.and_then(|path| path.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

fn render_mapping(mapping: &LineMapping) -> String {
    let entries: Vec<String> = mapping
        .iter()
        .map(|(line, content)| format!("{line}: {content:?}"))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

pub fn system_prompt(path: Option<&str>, mapping: &LineMapping) -> String {
    format!(
        r#"
You are a senior software engineer with deep expertise in {file_type}.

Your task is to review Git diffs and provide highly focused, professional feedback on only the lines that changed.

Use a calm, helpful tone. Be brief, constructive, and actionable.

REVIEW FORMAT:
1. Start each issue with "Issue 1:", "Issue 2:", etc.
2. After the issue number, include the affected line number(s) in square brackets, like [Line 12] or [Line 22-26]
3. Each issue must include:
   - A one-line title
   - "Problem:" followed by a short explanation
   - "Fix:" followed by a clear recommendation
4. Leave one blank line between each issue
5. Use plain text only, do not include markdown, emojis, lists, or extra sections

IMPORTANT:
- Only comment on lines that are present in the following mapping of changed lines to their new file line numbers:
{mapping}
- When referencing a line, use ONLY the line numbers from this mapping.
- Do NOT reference or comment on any lines not present in this mapping.
- If you find no issues, return an empty string.
"#,
        file_type = file_type(path),
        mapping = render_mapping(mapping),
    )
}

pub fn user_prompt(path: Option<&str>, diff: &str) -> String {
    format!(
        r#"
Review this Git diff for the file: {path}

{diff}

Please use the line numbers from the mapping above when referencing issues.
If you find no issues or if the git diff is for binary files, return "".
"#,
        path = path.unwrap_or("Unknown File"),
    )
}
