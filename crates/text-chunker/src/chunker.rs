use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::types::TextSpan;
use unicode_segmentation::UnicodeSegmentation;

/// Main chunker interface
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker, rejecting invalid configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `text` into overlapping windows.
    ///
    /// Blank text produces no spans. Text shorter than one window produces a single span.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<TextSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every grapheme start; `total` doubles as the end sentinel.
        let offsets: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
        let total = offsets.len();
        let byte_at = |grapheme: usize| offsets.get(grapheme).copied().unwrap_or(text.len());

        let size = self.config.chunk_size;
        let step = self.config.step();
        let mut spans = Vec::with_capacity(total / step + 1);
        let mut start = 0;

        loop {
            let end = (start + size).min(total);
            spans.push(TextSpan {
                index: spans.len(),
                start,
                end,
                text: text[byte_at(start)..byte_at(end)].to_string(),
            });
            if end == total {
                break;
            }
            start += step;
        }

        log::trace!("Chunked {total} graphemes into {} spans", spans.len());
        spans
    }
}
