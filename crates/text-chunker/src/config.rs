use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for sliding-window chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Window length in grapheme clusters
    pub chunk_size: usize,

    /// Graphemes shared by consecutive windows
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkerConfig {
    /// Distance between the starts of consecutive windows.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step(), 800);
    }

    #[test]
    fn test_invalid_configs() {
        let zero = ChunkerConfig {
            chunk_size: 0,
            chunk_overlap: 0,
        };
        assert!(zero.validate().is_err());

        let overlap_too_big = ChunkerConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        };
        assert!(overlap_too_big.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ChunkerConfig = serde_json::from_str(r#"{"chunk_size": 500}"#).unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 200);
    }
}
