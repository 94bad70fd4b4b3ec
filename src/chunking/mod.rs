//! Fixed-size sliding-window chunking over extracted document text.
//!
//! Windows are measured in characters (Unicode scalar values). Each window
//! after the first starts `size - overlap` characters after the previous one,
//! and the last window always ends at the end of the text.

use crate::config::ConfigError;

/// A window of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan<'a> {
    /// Character offset of the window in the source text.
    pub start: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if size == 0 || overlap >= size {
            return Err(ConfigError::InvalidChunking { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }

    /// Lazily split `text` into overlapping windows. Calling this again
    /// restarts the sequence from the beginning.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            size: self.size,
            step: self.step(),
            byte_pos: 0,
            char_pos: 0,
            done: text.is_empty(),
        }
    }

    /// Number of windows `chunks` yields for a text of `len` characters.
    pub fn expected_count(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        if len <= self.size {
            return 1;
        }
        (len - self.overlap).div_ceil(self.step())
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    size: usize,
    step: usize,
    byte_pos: usize,
    char_pos: usize,
    done: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = TextSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = &self.text[self.byte_pos..];
        let end = byte_offset_after(rest, self.size);
        let span = TextSpan {
            start: self.char_pos,
            text: &rest[..end],
        };

        if end == rest.len() {
            self.done = true;
        } else {
            self.byte_pos += byte_offset_after(rest, self.step);
            self.char_pos += self.step;
        }

        Some(span)
    }
}

/// Byte length of the first `chars` characters of `s` (or all of `s`).
fn byte_offset_after(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}
