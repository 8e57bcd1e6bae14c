//! Separator-based character splitter.
//!
//! Text is cut on a separator, then the pieces are merged greedily into chunks
//! no longer than `chunk_size` characters. When a chunk is emitted, the tail
//! of it (at most `chunk_overlap` characters worth of whole pieces) seeds the
//! next one. Pieces that alone exceed `chunk_size` are cut with a fixed
//! character window first, so every chunk respects the bound.

use std::collections::VecDeque;

use tracing::debug;

use super::types::{Chunk, Passage};
use crate::config::{CHUNK_OVERLAP, CHUNK_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separator: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            separator: "\n\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: SplitterConfig,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Splits each passage on its own, so a chunk never spans two passages
    /// and always inherits the metadata of the passage it was cut from.
    #[must_use]
    pub fn split_passages(&self, passages: &[Passage]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = passages
            .iter()
            .flat_map(|passage| {
                self.split_text(&passage.text)
                    .into_iter()
                    .map(|text| Chunk {
                        text,
                        metadata: passage.metadata.clone(),
                    })
            })
            .collect();

        debug!(
            passages = passages.len(),
            chunks = chunks.len(),
            "split passages"
        );
        chunks
    }

    /// Splits raw text into bounded, overlapping chunks.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for piece in text
            .split(self.config.separator.as_str())
            .filter(|s| !s.is_empty())
        {
            if char_len(piece) > self.config.chunk_size {
                pieces.extend(self.window_split(piece));
            } else {
                pieces.push(piece.to_string());
            }
        }

        self.merge(pieces)
    }

    /// Cuts an oversized piece with a sliding character window.
    fn window_split(&self, piece: &str) -> Vec<String> {
        let chars: Vec<char> = piece.chars().collect();
        let size = self.config.chunk_size.max(1);
        let step = size.saturating_sub(self.config.chunk_overlap).max(1);

        let mut windows = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        windows
    }

    fn join(&self, pieces: &VecDeque<String>) -> Option<String> {
        let joined = pieces
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&self.config.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(&self.config.separator);
        let sep_if = |current: &VecDeque<String>| if current.is_empty() { 0 } else { sep_len };

        let mut chunks = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&piece);

            if total + len + sep_if(&current) > size && !current.is_empty() {
                if let Some(chunk) = self.join(&current) {
                    chunks.push(chunk);
                }

                while total > overlap || (total > 0 && total + len + sep_if(&current) > size) {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    let removed = char_len(&first) + if current.is_empty() { 0 } else { sep_len };
                    total = total.saturating_sub(removed);
                }
                if current.is_empty() {
                    total = 0;
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(chunk) = self.join(&current) {
            chunks.push(chunk);
        }

        chunks
    }
}
