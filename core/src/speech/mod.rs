//! Speech markup: normalization, escaping, pauses and chunking
//!
//! Plain briefing text → `normalize` → `compile` (escape, then inject markers)
//! → `chunk` into provider-sized pieces.

pub mod chunker;
pub mod compiler;
pub mod normalize;

pub use chunker::{chunk, sentences};
pub use compiler::{
    compile, escape_xml, MarkupDocument, EMPHASIS_CLOSE, EMPHASIS_OPEN, LABEL_PAUSE, LINE_PAUSE,
    SECTION_PAUSE,
};
pub use normalize::normalize;
