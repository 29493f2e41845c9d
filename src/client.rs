use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded::byte_serialize;

use crate::message::Message;

/// Base address of the MAX bot API.
pub const API_URL: &str = "https://platform-api.max.ru";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Markup understood by the `messages` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Html,
    Markdown,
}

impl TextFormat {
    /// Only the exact names `html` and `markdown` are accepted.
    pub fn parse(format: &str) -> Option<Self> {
        match format {
            "html" => Some(TextFormat::Html),
            "markdown" => Some(TextFormat::Markdown),
            _ => None,
        }
    }
}

/// Body of a `POST /messages` request.
#[derive(Debug, Serialize)]
pub struct NewMessage<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TextFormat>,
}

/// Method path (with query) that addresses a reply to `message`:
/// the chat when known, else the sender.
pub fn message_target(message: &Message) -> String {
    let mut target = String::from("messages?");
    if !message.chat_id.is_empty() {
        target.push_str("chat_id=");
        target.extend(byte_serialize(message.chat_id.as_bytes()));
    } else if !message.sender_id.is_empty() {
        target.push_str("user_id=");
        target.extend(byte_serialize(message.sender_id.as_bytes()));
    }
    target
}

/// MAX platform REST client. Cheap to clone; handlers receive their own copy.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

// Keeps the token out of debug logs.
impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, API_URL)
    }

    /// Client against a different API host, used to point tests at a mock server.
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            token: token.into(),
            base_url: base_url.into(),
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method.trim_start_matches('/'))
    }

    /// POST `body` to `method` and return the decoded JSON response.
    ///
    /// Anything but a `200 OK` with a JSON body is an error; the error text
    /// carries the status and response body.
    pub async fn send<B>(&self, method: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let url = self.method_url(method);

        debug!("Sending request to MAX API: {}", url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to MAX API method {}", method))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("MAX API error ({}): {}", status, error_body);
        }

        response
            .json()
            .await
            .context("Failed to parse MAX API response")
    }

    /// Reply to `message`. `format` other than `html`/`markdown` is ignored.
    pub async fn send_message(
        &self,
        message: &Message,
        text: &str,
        format: Option<&str>,
    ) -> Result<Value> {
        let body = NewMessage {
            text,
            format: format.and_then(TextFormat::parse),
        };
        self.send(&message_target(message), &body).await
    }

    /// Plain-text reply to the chat (or user) `message` came from.
    pub async fn send_message_to_chat(&self, message: &Message, text: &str) -> Result<Value> {
        self.send_message(message, text, None).await
    }

    /// Information about the bot owning the token.
    pub async fn get_me(&self) -> Result<Value> {
        self.send("me", &serde_json::json!({})).await
    }
}
