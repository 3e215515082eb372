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

pub struct OllamaBackend {
    client: Client,
    host: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaBackend {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            // Sanitize: remove trailing slashes to avoid //api/chat
            host: config.ollama_host.trim_end_matches('/').to_string(),
        }
    }

    /// List locally available models. Used by `doctor` to verify the
    /// server is reachable and the configured models are pulled.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.host);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| Error::OllamaNotRunning {
                host: self.host.clone(),
            })?;

        if !response.status().is_success() {
            return Err(Error::OllamaNotRunning {
                host: self.host.clone(),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(Error::Http)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn invoke(&self, task: &str, request: &ModelRequest) -> BackendResult<String> {
        let url = format!("{}/api/chat", self.host);
        debug!(task, model = %request.model, "ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: request.model.clone(),
                messages: vec![
                    Message {
                        role: "system".into(),
                        content: request.system.clone(),
                    },
                    Message {
                        role: "user".into(),
                        content: request.user.clone(),
                    },
                ],
                stream: false,
                options: ChatOptions {
                    temperature: request.temperature,
                    num_predict: request.max_tokens,
                },
            })
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, &body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::transient(format!("malformed response body: {e}")))?;

        Ok(chat.message.content.trim().to_string())
    }

    async fn verify(&self) -> Result<()> {
        self.list_models().await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
