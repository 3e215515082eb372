// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

mod chunk;
mod report;
mod scorecard;
mod screening;
mod submission;
mod task;

pub use chunk::*;
pub use report::*;
pub use scorecard::*;
pub use screening::*;
pub use submission::*;
pub use task::*;
