//! Plain briefing text → speech markup
//!
//! Text is normalized and XML-escaped first; pause and emphasis tags are
//! injected afterwards so they are never escaped themselves. Compiling the
//! output a second time is not supported (escaping is not re-entrant).

use super::normalize::normalize;
use crate::providers::Section;
use crate::{CallieError, Result};
use std::fmt;

/// Pause between blank-line separated sections
pub const SECTION_PAUSE: &str = r#"<break time="800ms"/>"#;
/// Pause between lines of one section
pub const LINE_PAUSE: &str = r#"<break time="300ms"/>"#;
/// Pause after an emphasised section label
pub const LABEL_PAUSE: &str = r#"<break time="400ms"/>"#;
pub const EMPHASIS_OPEN: &str = r#"<emphasis level="moderate">"#;
pub const EMPHASIS_CLOSE: &str = "</emphasis>";

const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

/// Escaped, pause-annotated text ready for a speech voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDocument(String);

impl MarkupDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Length in characters, the unit the provider limits are expressed in
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MarkupDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MarkupDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Escape the five reserved XML characters
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn compile(briefing: &str) -> Result<MarkupDocument> {
    let normalized = normalize(briefing);

    let compiled: Vec<String> = split_sections(&normalized)
        .into_iter()
        .map(|lines| compile_section(&lines))
        .collect();
    let markup = compiled.join(&format!(" {} ", SECTION_PAUSE));

    validate(&markup)?;
    Ok(MarkupDocument(markup))
}

/// Group non-empty lines into blank-line separated sections
fn split_sections(text: &str) -> Vec<Vec<&str>> {
    let mut sections = Vec::new();
    let mut current = Vec::new();
    for line in text.split('\n').map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        sections.push(current);
    }
    sections
}

fn compile_section(lines: &[&str]) -> String {
    let mut escaped: Vec<String> = lines.iter().map(|l| escape_xml(l)).collect();
    let line_join = format!(" {} ", LINE_PAUSE);

    let heading = escaped
        .first()
        .and_then(|first| split_label(first))
        .map(|(label, rest)| (label, rest.to_string()));

    match heading {
        Some((label, rest)) if rest.is_empty() => {
            // Label on its own line: the items follow the label pause directly
            escaped.remove(0);
            if escaped.is_empty() {
                emphasize(label)
            } else {
                format!("{} {}", emphasize(label), escaped.join(&line_join))
            }
        }
        Some((label, rest)) => {
            escaped[0] = format!("{}{}", emphasize(label), rest);
            escaped.join(&line_join)
        }
        None => escaped.join(&line_join),
    }
}

/// Split a leading `"<Label>."` off a line, returning the label and the remainder
fn split_label(line: &str) -> Option<(&'static str, &str)> {
    Section::ALL.iter().find_map(|section| {
        let label = section.label();
        let rest = line.strip_prefix(label)?.strip_prefix('.')?;
        if rest.is_empty() || rest.starts_with(' ') {
            Some((label, rest))
        } else {
            None
        }
    })
}

fn emphasize(label: &str) -> String {
    format!("{}{}.{}{}", EMPHASIS_OPEN, label, EMPHASIS_CLOSE, LABEL_PAUSE)
}

/// Reject output that breaks the markup invariants: control characters,
/// reserved characters outside our own tags, or bare ampersands.
fn validate(markup: &str) -> Result<()> {
    if let Some(c) = markup.chars().find(|c| c.is_control()) {
        return Err(CallieError::Compilation(format!(
            "control character U+{:04X} in markup",
            c as u32
        )));
    }

    let mut text = markup.to_string();
    for tag in [SECTION_PAUSE, LINE_PAUSE, LABEL_PAUSE, EMPHASIS_OPEN, EMPHASIS_CLOSE] {
        text = text.replace(tag, "");
    }
    if let Some(c) = text.chars().find(|c| matches!(c, '<' | '>' | '"' | '\'')) {
        return Err(CallieError::Compilation(format!(
            "unescaped {:?} in markup",
            c
        )));
    }
    for (idx, _) in text.match_indices('&') {
        if !ENTITIES.iter().any(|e| text[idx..].starts_with(e)) {
            return Err(CallieError::Compilation(format!(
                "bare ampersand at byte {}",
                idx
            )));
        }
    }
    Ok(())
}
