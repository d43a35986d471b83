use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use viral_monitor::config::ReplyConfig;
use viral_monitor::persona::{parse_replies, ReplyStyle};
use viral_monitor::report::REPLY_FAILURE_SENTINEL;
use viral_monitor::runner::ReplyGenerator;
use viral_monitor::{MonitorError, Post, Result};

#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: String, config: &ReplyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| MonitorError::Config(format!("failed to build xAI client: {}", err)))?;
        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub async fn suggest_replies(&self, post: &Post, style: ReplyStyle) -> Result<Vec<String>> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: style.temperature(),
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: style.system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: style.render_prompt(post),
                },
            ],
        };

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| MonitorError::Generation(format!("xAI request failed: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = error_body.trim();
            if detail.is_empty() {
                return Err(MonitorError::Generation(format!("xAI API error: {}", status)));
            }
            return Err(MonitorError::Generation(format!("xAI API error: {} {}", status, detail)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| MonitorError::Generation(format!("xAI response parse failed: {}", err)))?;

        let content = body
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        Ok(parse_replies(&content, style.rules()))
    }
}

#[async_trait]
impl ReplyGenerator for LlmClient {
    async fn generate_replies(&self, post: &Post, style: ReplyStyle) -> Vec<String> {
        match self.suggest_replies(post, style).await {
            Ok(replies) => replies,
            Err(err) => {
                tracing::error!(post_id = %post.id, error = %err, "reply generation failed");
                vec![REPLY_FAILURE_SENTINEL.to_string()]
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: String,
}
