use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Shown when a successful reply carries neither `markdown` nor `response`.
pub const NO_ANSWER_TEXT: &str = "Sorry, I'm not sure how to respond.";

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub base_url: String,
    pub chat_path: String,
    pub track_path: String,
    pub timeout_seconds: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            chat_path: "/api/chat".to_string(),
            track_path: "/api/track_view".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// Failure of a single request. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("chat endpoint answered HTTP {status}")]
    Http { status: u16 },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unreadable reply body: {0}")]
    Decode(String),
}

impl ChatError {
    /// True for failures that happened before or while reading a reply,
    /// as opposed to a server that answered with an error status.
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::Http { .. })
    }
}

#[derive(Serialize, Clone, Debug)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatReply {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub buttons: Option<Vec<String>>,
}

impl ChatReply {
    /// First non-empty of `markdown`, `response`, then [`NO_ANSWER_TEXT`].
    pub fn renderable_markdown(&self) -> &str {
        [self.markdown.as_deref(), self.response.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
            .unwrap_or(NO_ANSWER_TEXT)
    }

    pub fn quick_replies(&self) -> &[String] {
        self.buttons.as_deref().unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| ChatError::Transport(format!("cannot build HTTP client: {err}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub async fn chat(&self, query: &str) -> Result<ChatReply, ChatError> {
        let resp = self
            .client
            .post(self.url(&self.config.chat_path))
            .header(CONTENT_TYPE, "application/json")
            .json(&ChatRequest { query })
            .send()
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
            });
        }

        resp.json::<ChatReply>()
            .await
            .map_err(|err| ChatError::Decode(err.to_string()))
    }

    /// The reply body is never read.
    pub async fn track_view(&self) -> Result<(), ChatError> {
        let resp = self
            .client
            .post(self.url(&self.config.track_path))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;

        if !resp.status().is_success() {
            return Err(ChatError::Http {
                status: resp.status().as_u16(),
            });
        }

        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}
