//! CSS selector subset used to locate mount points

use std::fmt;
use std::str::FromStr;

use crate::errors::DomError;

/// A parsed selector list such as `.gl-button-group, .mr-state-container + div`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Vec<SelectorPart>>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let groups = split_groups(source)?
            .iter()
            .map(|group| parse_chain(group))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: source.trim().to_string(),
            groups,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn groups(&self) -> &[Vec<SelectorPart>] {
        &self.groups
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrCondition {
    pub(crate) name: String,
    pub(crate) value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrCondition>,
}

impl SelectorStep {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to the part on the left.
    pub(crate) combinator: Option<Combinator>,
}

fn unsupported(selector: &str) -> DomError {
    DomError::UnsupportedSelector(selector.to_string())
}

fn split_groups(selector: &str) -> Result<Vec<String>, DomError> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;

    for ch in selector.chars() {
        match ch {
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                bracket_depth = bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(selector))?;
                current.push(ch);
            }
            ',' if bracket_depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(unsupported(selector));
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let trimmed = current.trim();
    if bracket_depth != 0 || trimmed.is_empty() {
        return Err(unsupported(selector));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

fn tokenize(selector: &str) -> Result<Vec<String>, DomError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.trim().is_empty() {
            tokens.push(current.trim().to_string());
        }
        current.clear();
    };

    for ch in selector.chars() {
        match ch {
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                bracket_depth = bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(selector))?;
                current.push(ch);
            }
            '>' | '+' | '~' if bracket_depth == 0 => {
                flush(&mut current, &mut tokens);
                tokens.push(ch.to_string());
            }
            ch if ch.is_ascii_whitespace() && bracket_depth == 0 => {
                flush(&mut current, &mut tokens);
            }
            _ => current.push(ch),
        }
    }
    if bracket_depth != 0 {
        return Err(unsupported(selector));
    }
    flush(&mut current, &mut tokens);
    Ok(tokens)
}

fn parse_chain(selector: &str) -> Result<Vec<SelectorPart>, DomError> {
    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize(selector)? {
        let combinator = match token.as_str() {
            ">" => Some(Combinator::Child),
            "+" => Some(Combinator::AdjacentSibling),
            "~" => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            if pending.is_some() || parts.is_empty() {
                return Err(unsupported(selector));
            }
            pending = Some(combinator);
            continue;
        }

        let step = parse_step(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(SelectorPart { step, combinator });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(unsupported(selector));
    }
    Ok(parts)
}

fn parse_step(part: &str) -> Result<SelectorStep, DomError> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = SelectorStep::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() {
                    return Err(unsupported(part));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(part, i + 1).ok_or_else(|| unsupported(part))?;
                if step.id.replace(id).is_some() {
                    return Err(unsupported(part));
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(part, i + 1).ok_or_else(|| unsupported(part))?;
                step.classes.push(class);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_attr(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            _ => {
                if !step.is_empty() {
                    return Err(unsupported(part));
                }
                let (tag, next) = parse_ident(part, i).ok_or_else(|| unsupported(part))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    if step.is_empty() {
        return Err(unsupported(part));
    }
    Ok(step)
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    (end > start).then(|| (src[start..end].to_string(), end))
}

fn parse_attr(src: &str, start: usize) -> Result<(AttrCondition, usize), DomError> {
    let close = src[start..]
        .find(']')
        .map(|offset| start + offset)
        .ok_or_else(|| unsupported(src))?;
    let body = src[start + 1..close].trim();
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => {
            let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
            (name.trim(), Some(value.to_string()))
        }
        None => (body, None),
    };
    if name.is_empty() || !name.bytes().all(is_ident_char) {
        return Err(unsupported(src));
    }
    Ok((
        AttrCondition {
            name: name.to_ascii_lowercase(),
            value,
        },
        close + 1,
    ))
}
