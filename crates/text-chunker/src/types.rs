use serde::{Deserialize, Serialize};

/// One window of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Position of this span in the chunk sequence (0-based)
    pub index: usize,

    /// First grapheme of the span (0-based, inclusive)
    pub start: usize,

    /// Grapheme after the last one of the span (exclusive)
    pub end: usize,

    /// The span text
    pub text: String,
}
