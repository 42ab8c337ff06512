//! Call-instruction document assembly
//!
//! Wraps each chunk in a `<Say>` followed by a one-second `<Pause>`, all inside
//! one `<Response>`. Chunk text is used as is; it must already be escaped
//! markup. Documents that exceed the provider's limits are rejected rather
//! than truncated, and every document is parsed back before it is handed out.

use crate::speech::escape_xml;
use crate::{CallieError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;

/// Provider ceilings for a call document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLimits {
    /// Characters of text inside one `<Say>`
    pub max_say_chars: usize,
    /// Characters in the whole document. The document travels inline in the
    /// `Twiml` request parameter, which the provider caps at 4,000.
    pub max_document_chars: usize,
    /// Total number of verbs (`<Say>` and `<Pause>`)
    pub max_instructions: usize,
}

impl Default for DocumentLimits {
    fn default() -> Self {
        Self {
            max_say_chars: 4096,
            max_document_chars: 4_000,
            max_instructions: 100,
        }
    }
}

/// A complete call-instruction document, used for exactly one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDocument {
    xml: String,
    chunks: usize,
}

impl CallDocument {
    pub fn as_str(&self) -> &str {
        &self.xml
    }

    /// Number of `<Say>` instructions
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn char_len(&self) -> usize {
        self.xml.chars().count()
    }
}

impl fmt::Display for CallDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}

/// Build the document for `chunks`, spoken with `voice`
pub fn assemble<S: AsRef<str>>(
    chunks: &[S],
    voice: &str,
    limits: &DocumentLimits,
) -> Result<CallDocument> {
    if chunks.is_empty() {
        return Err(CallieError::Assembly("nothing to say".into()));
    }

    let instructions = chunks.len() * 2;
    if instructions > limits.max_instructions {
        return Err(CallieError::Assembly(format!(
            "{} instructions exceed the limit of {}",
            instructions, limits.max_instructions
        )));
    }

    let voice = escape_xml(voice);
    let mut verbs = Vec::with_capacity(chunks.len());
    for (idx, chunk) in chunks.iter().enumerate() {
        let text = chunk.as_ref();
        let len = text.chars().count();
        if len > limits.max_say_chars {
            return Err(CallieError::Assembly(format!(
                "chunk {} is {} characters, over the per-instruction limit of {}",
                idx, len, limits.max_say_chars
            )));
        }
        verbs.push(format!(
            r#"<Say voice="{}">{}</Say><Pause length="1"/>"#,
            voice, text
        ));
    }

    let xml = format!("<Response>\n{}\n</Response>", verbs.join("\n"));
    let total = xml.chars().count();
    if total > limits.max_document_chars {
        return Err(CallieError::Assembly(format!(
            "document is {} characters, over the limit of {}",
            total, limits.max_document_chars
        )));
    }

    check_well_formed(&xml)?;
    Ok(CallDocument {
        xml,
        chunks: chunks.len(),
    })
}

/// Parse `xml` and reject anything the provider would refuse: a root other
/// than one `<Response>`, unbalanced tags, unknown nesting, a `<Say>` without
/// a voice, or text and attribute values with bad entities.
pub fn check_well_formed(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<String> = Vec::new();
    let mut roots = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = check_element(&e, open.last().map(String::as_str))?;
                if open.is_empty() {
                    roots += 1;
                }
                open.push(name);
            }
            Ok(Event::Empty(e)) => {
                check_element(&e, open.last().map(String::as_str))?;
                if open.is_empty() {
                    roots += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if open.pop().as_deref() != Some(name.as_str()) {
                    return Err(malformed(format!("unexpected </{}>", name)));
                }
            }
            Ok(Event::Text(t)) => {
                if open.is_empty() {
                    return Err(malformed("text outside <Response>".to_string()));
                }
                t.unescape().map_err(|e| malformed(e.to_string()))?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(malformed(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if let Some(name) = open.last() {
        return Err(malformed(format!("<{}> is never closed", name)));
    }
    if roots != 1 {
        return Err(malformed(format!("expected one root element, found {}", roots)));
    }
    Ok(())
}

/// Validate one element against its parent; returns the element name
fn check_element(e: &BytesStart<'_>, parent: Option<&str>) -> Result<String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let allowed = match parent {
        None => name == "Response",
        Some("Response") => matches!(name.as_str(), "Say" | "Pause"),
        Some("Say") | Some("emphasis") => matches!(name.as_str(), "break" | "emphasis"),
        Some(_) => false,
    };
    if !allowed {
        return Err(malformed(format!(
            "<{}> not allowed inside <{}>",
            name,
            parent.unwrap_or("document")
        )));
    }

    let mut has_voice = false;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(err.to_string()))?;
        attr.unescape_value()
            .map_err(|err| malformed(err.to_string()))?;
        if attr.key.as_ref() == b"voice" {
            has_voice = true;
        }
    }
    if name == "Say" && !has_voice {
        return Err(malformed("<Say> without a voice".to_string()));
    }
    Ok(name)
}

fn malformed(detail: String) -> CallieError {
    CallieError::Assembly(format!("malformed document: {}", detail))
}
