// SPDX-FileCopyrightText: 2026 critiq contributors
//
// SPDX-License-Identifier: MIT

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendError, BackendResult, ModelBackend, ModelRequest};
use crate::config::Config;
use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    system: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl AnthropicBackend {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config
                .anthropic_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    async fn invoke(&self, task: &str, request: &ModelRequest) -> BackendResult<String> {
        let url = format!("{}/messages", self.base_url);
        debug!(task, model = %request.model, "anthropic messages request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&MessagesRequest {
                model: request.model.clone(),
                system: request.system.clone(),
                messages: vec![Message {
                    role: "user".into(),
                    content: request.user.clone(),
                }],
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            })
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, &body));
        }

        let messages: MessagesResponse = response
            .json()
            .await
            .map_err(|e| BackendError::transient(format!("malformed response body: {e}")))?;

        let content = messages
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }

    async fn verify(&self) -> Result<()> {
        // No lightweight endpoint for verification; just check that a key
        // is configured at all.
        if self.api_key.is_empty() {
            return Err(Error::Backend {
                backend: "anthropic".into(),
                message: "API key not configured".into(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
