// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use tracing::debug;

use crate::domain::{Chunk, SourceFile};

/// Per-chunk bin overhead reserved for the payload header line.
const HEADER_RESERVE: usize = 16;

/// Splits submission files into chunks no larger than the configured
/// budget and packs them into payload bins.
///
/// Chunks are per-source: a chunk never mixes bytes from two files, and
/// the chunks of one source concatenate back to the original content.
/// Bins are the packing layer on top: several small files share one bin,
/// while each piece of a split file gets a bin of its own.
pub struct ChunkSplitter {
    max_chunk_chars: usize,
}

impl ChunkSplitter {
    pub fn new(max_chunk_chars: usize) -> Self {
        Self { max_chunk_chars }
    }

    pub fn split(&self, sources: &[SourceFile]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        // Remaining capacity per open bin, indexed by bin id.
        let mut bins: Vec<usize> = Vec::new();

        for source in sources {
            if source.content.is_empty() {
                debug!(path = %source.path, "skipping empty source");
                continue;
            }

            if source.content.len() <= self.max_chunk_chars {
                self.pack_whole(source, &mut chunks, &mut bins);
            } else {
                self.split_source(source, &mut chunks, &mut bins);
            }
        }

        chunks
    }

    /// Place an unsplit file into the first bin with room, opening a new
    /// bin when none fits (first-fit).
    fn pack_whole(&self, source: &SourceFile, chunks: &mut Vec<Chunk>, bins: &mut Vec<usize>) {
        let cost = source.content.len() + source.path.len() + HEADER_RESERVE;

        let bin = match bins.iter().position(|remaining| *remaining >= cost) {
            Some(idx) => {
                bins[idx] -= cost;
                idx
            }
            None => {
                bins.push(self.max_chunk_chars.saturating_sub(cost));
                bins.len() - 1
            }
        };

        chunks.push(Chunk {
            source_id: source.path.clone(),
            sequence_index: 0,
            content: source.content.clone(),
            byte_range: (0, source.content.len()),
            bin,
        });
    }

    /// Split an oversized file on line boundaries. Each piece opens its
    /// own bin; small files may still first-fit into the leftover space.
    fn split_source(&self, source: &SourceFile, chunks: &mut Vec<Chunk>, bins: &mut Vec<usize>) {
        let content = &source.content;
        let total = content.len();
        let mut start = 0;
        let mut seq = 0;

        while start < total {
            let end = self.chunk_end(content, start);
            let piece = &content[start..end];

            if piece.len() > self.max_chunk_chars {
                debug!(
                    path = %source.path,
                    len = piece.len(),
                    "line exceeds chunk budget, emitting oversized chunk"
                );
            }

            let cost = piece.len() + source.path.len() + HEADER_RESERVE;
            bins.push(self.max_chunk_chars.saturating_sub(cost));

            chunks.push(Chunk {
                source_id: source.path.clone(),
                sequence_index: seq,
                content: piece.to_string(),
                byte_range: (start, end),
                bin: bins.len() - 1,
            });

            start = end;
            seq += 1;
        }
    }

    /// Byte offset where the chunk starting at `start` ends: the last
    /// line boundary within budget, or the end of an over-long line.
    fn chunk_end(&self, content: &str, start: usize) -> usize {
        let total = content.len();
        let mut window = (start + self.max_chunk_chars).min(total);

        if window == total {
            return total;
        }

        // Keep the window on a char boundary before slicing.
        while !content.is_char_boundary(window) {
            window -= 1;
        }

        match content[start..window].rfind('\n') {
            Some(pos) => start + pos + 1,
            // No newline in the window: the current line alone is larger
            // than the budget. Take it whole rather than cutting mid-line.
            None => content[start..]
                .find('\n')
                .map(|pos| start + pos + 1)
                .unwrap_or(total),
        }
    }

    /// Render bins as model-ready payload strings, one per bin, each
    /// chunk prefixed with a header naming its source.
    pub fn payloads(chunks: &[Chunk]) -> Vec<String> {
        let Some(bin_count) = chunks.iter().map(|c| c.bin + 1).max() else {
            return Vec::new();
        };

        let mut payloads = vec![String::new(); bin_count];

        for chunk in chunks {
            let payload = &mut payloads[chunk.bin];
            if !payload.is_empty() {
                payload.push('\n');
            }
            if chunk.sequence_index == 0 {
                payload.push_str(&format!("--- {} ---\n", chunk.source_id));
            } else {
                payload.push_str(&format!("--- {} (cont.) ---\n", chunk.source_id));
            }
            payload.push_str(&chunk.content);
        }

        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, content: &str) -> SourceFile {
        SourceFile::new(path, content)
    }

    #[test]
    fn small_file_is_never_split() {
        let splitter = ChunkSplitter::new(1000);
        let chunks = splitter.split(&[source("main.py", "print('hi')\n")]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[0].byte_range, (0, 12));
    }

    #[test]
    fn oversized_file_splits_on_line_boundaries() {
        let line = "x".repeat(40) + "\n";
        let content = line.repeat(20); // 820 bytes
        let splitter = ChunkSplitter::new(300);
        let chunks = splitter.split(&[source("big.py", &content)]);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 300);
            assert!(chunk.content.ends_with('\n'));
        }
    }

    #[test]
    fn split_chunks_reconstruct_source() {
        let content = (0..50)
            .map(|i| format!("line number {i}\n"))
            .collect::<String>();
        let splitter = ChunkSplitter::new(256);
        let chunks = splitter.split(&[source("a.rs", &content)]);

        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, content);

        // Ranges are contiguous and ordered.
        let mut expected_start = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
            assert_eq!(chunk.byte_range.0, expected_start);
            expected_start = chunk.byte_range.1;
        }
        assert_eq!(expected_start, content.len());
    }

    #[test]
    fn single_long_line_becomes_oversized_chunk() {
        let content = "y".repeat(900) + "\nshort\n";
        let splitter = ChunkSplitter::new(256);
        let chunks = splitter.split(&[source("minified.js", &content)]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 901);
        assert_eq!(chunks[1].content, "short\n");
        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn small_files_pack_into_shared_bin() {
        let splitter = ChunkSplitter::new(1000);
        let chunks = splitter.split(&[
            source("a.py", "a = 1\n"),
            source("b.py", "b = 2\n"),
            source("c.py", "c = 3\n"),
        ]);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.bin == 0));
        assert_eq!(ChunkSplitter::payloads(&chunks).len(), 1);
    }

    #[test]
    fn split_file_pieces_get_distinct_bins() {
        let content = "line\n".repeat(200); // 1000 bytes
        let splitter = ChunkSplitter::new(300);
        let chunks = splitter.split(&[source("big.rs", &content)]);

        let mut bins: Vec<usize> = chunks.iter().map(|c| c.bin).collect();
        let len_before = bins.len();
        bins.dedup();
        assert_eq!(bins.len(), len_before);
    }

    #[test]
    fn empty_sources_are_skipped() {
        let splitter = ChunkSplitter::new(100);
        let chunks = splitter.split(&[source("empty.py", ""), source("real.py", "x = 1\n")]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_id, "real.py");
    }

    #[test]
    fn multibyte_content_splits_on_char_boundary() {
        // Each line is 4-byte chars plus a newline; budget falls mid-char.
        let line = "\u{1F980}\u{1F980}\u{1F980}\n".repeat(40);
        let splitter = ChunkSplitter::new(258);
        let chunks = splitter.split(&[source("emoji.txt", &line)]);

        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, line);
        for chunk in &chunks {
            assert!(chunk.len() <= 258);
        }
    }

    #[test]
    fn payload_headers_name_sources() {
        let splitter = ChunkSplitter::new(1000);
        let chunks = splitter.split(&[source("app/main.py", "run()\n")]);
        let payloads = ChunkSplitter::payloads(&chunks);

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0], "--- app/main.py ---\nrun()\n");
    }

    #[test]
    fn continuation_chunks_are_marked() {
        let content = "line\n".repeat(100); // 500 bytes
        let splitter = ChunkSplitter::new(300);
        let chunks = splitter.split(&[source("big.go", &content)]);
        let payloads = ChunkSplitter::payloads(&chunks);

        assert!(payloads.len() >= 2);
        assert!(payloads[0].starts_with("--- big.go ---\n"));
        assert!(payloads[1].starts_with("--- big.go (cont.) ---\n"));
    }
}
