// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

pub mod aggregator;
pub mod chunker;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod llm;
pub mod loader;
pub mod response;
pub mod scorecard;
pub mod screening;
