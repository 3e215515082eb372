// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;

use critiq::domain::SourceFile;
use critiq::services::chunker::ChunkSplitter;

// Splitting must be lossless for any content and any budget at or above
// the configured floor of 256 chars.
fuzz_target!(|input: (u16, String)| {
    let (budget, content) = input;
    let budget = 256 + usize::from(budget);

    let splitter = ChunkSplitter::new(budget);
    let chunks = splitter.split(&[SourceFile::new("fuzz.txt", content.clone())]);

    let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(rebuilt, content);

    let mut expected_start = 0;
    for chunk in &chunks {
        assert_eq!(chunk.byte_range.0, expected_start);
        assert!(content.is_char_boundary(chunk.byte_range.1));
        expected_start = chunk.byte_range.1;
    }
});
