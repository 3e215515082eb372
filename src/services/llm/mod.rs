// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

pub mod anthropic;
pub mod ollama;
pub mod openai;

use crate::config::{Backend, Config};

/// One fully-specified model call. Cloneable so the dispatcher can replay
/// it across retry attempts.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Whether a failed call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeout, throttling, server-side error. Retried with backoff.
    Transient,
    /// Auth failure or permanent rejection. Never retried.
    Fatal,
}

/// Classified backend failure. The dispatcher's retry predicate keys off
/// `kind`; `status` is kept for the run log.
#[derive(Debug, Clone)]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
    pub status: Option<u16>,
}

impl BackendError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
            status: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Fatal,
            message: message.into(),
            status: None,
        }
    }

    /// 408, 429 and 5xx are retryable; everything else (auth, bad
    /// request) is permanent.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            408 | 429 | 500..=599 => FailureKind::Transient,
            _ => FailureKind::Fatal,
        };
        Self {
            kind,
            message: format!("HTTP {status}: {}", snippet(body)),
            status: Some(status),
        }
    }

    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() || e.is_connect() {
            FailureKind::Transient
        } else {
            FailureKind::Fatal
        };
        Self {
            kind,
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendError {}

/// First 300 bytes of an error body, newlines collapsed.
fn snippet(body: &str) -> String {
    let mut s: String = body.chars().take(300).collect();
    if body.len() > s.len() {
        s.push('…');
    }
    s.replace('\n', " ")
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A chat-completion backend. Implementations must tolerate many
/// concurrent calls; the dispatcher owns rate limiting and retries.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Issue one call and return the raw model text. Prompts instruct the
    /// model to answer with JSON; response extraction tolerates prose
    /// around it.
    async fn invoke(&self, task: &str, request: &ModelRequest) -> BackendResult<String>;

    /// Cheap reachability probe, run before a review burns its time
    /// budget on a backend that was never going to answer.
    async fn verify(&self) -> crate::error::Result<()>;

    fn name(&self) -> &'static str;
}

pub fn create_backend(config: &Config) -> Arc<dyn ModelBackend> {
    match config.backend {
        Backend::Ollama => Arc::new(ollama::OllamaBackend::new(config)),
        Backend::OpenAI => Arc::new(openai::OpenAiBackend::new(config)),
        Backend::Anthropic => Arc::new(anthropic::AnthropicBackend::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_status_is_transient() {
        assert!(BackendError::from_status(429, "slow down").is_transient());
        assert!(BackendError::from_status(503, "overloaded").is_transient());
        assert!(BackendError::from_status(408, "").is_transient());
    }

    #[test]
    fn auth_status_is_fatal() {
        assert!(!BackendError::from_status(401, "bad key").is_transient());
        assert!(!BackendError::from_status(403, "forbidden").is_transient());
        assert!(!BackendError::from_status(400, "bad request").is_transient());
    }

    #[test]
    fn snippet_bounds_error_bodies() {
        let body = "x".repeat(1000);
        let err = BackendError::from_status(500, &body);
        assert!(err.message.len() < 350);
        assert!(err.message.ends_with('…'));
    }
}
