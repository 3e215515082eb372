// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

/// One contiguous slice of a submission file, produced by the chunk splitter.
///
/// Chunks never mix bytes from different sources. Concatenating the contents
/// of a source's chunks in `sequence_index` order reproduces the original
/// file byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Relative path of the originating file.
    pub source_id: String,
    /// Position of this chunk within its source, starting at 0.
    pub sequence_index: usize,
    pub content: String,
    /// Byte offsets `[start, end)` into the original file.
    pub byte_range: (usize, usize),
    /// Payload bin this chunk was packed into. Chunks sharing a bin are
    /// presented to the model as one payload.
    pub bin: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// True when the chunk carries anything beyond whitespace.
    pub fn has_code(&self) -> bool {
        !self.content.trim().is_empty()
    }
}
