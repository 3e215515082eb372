// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;

use critiq::services::response::ResponseExtractor;

// Model output is untrusted text; every extractor must return None
// rather than panic, whatever the bytes look like.
fuzz_target!(|data: &str| {
    let _ = ResponseExtractor::security_findings(data);
    let _ = ResponseExtractor::quality_metrics(data);
    let _ = ResponseExtractor::performance_metrics(data);
    let _ = ResponseExtractor::scorecard_answer(data);
    let _ = ResponseExtractor::languages(data);
});
