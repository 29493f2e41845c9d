use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::config::ServerConfig;
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::message::Message;

/// Why a webhook body was refused. Answered with `400 Bad Request`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateRejection {
    #[error("empty request body")]
    EmptyBody,

    #[error("request body is not a JSON object")]
    NotAnObject,
}

/// The bot: API client plus handler registries.
pub struct Bot {
    client: Client,
    dispatcher: Dispatcher,
}

impl Bot {
    pub fn new(client: Client) -> Self {
        Self::with_dispatcher(client, Dispatcher::new())
    }

    pub fn with_dispatcher(client: Client, dispatcher: Dispatcher) -> Self {
        Self { client, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// See [`Dispatcher::on_command`].
    pub fn on_command<F, Fut>(&mut self, command: &str, handler: F)
    where
        F: Fn(Message, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.dispatcher.on_command(command, handler);
    }

    /// See [`Dispatcher::on_message`].
    pub fn on_message<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Message, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.dispatcher.on_message(handler);
    }

    /// Decode a raw webhook body and dispatch it.
    ///
    /// `Ok(None)` means the update was valid JSON but not a kind the bot handles.
    pub async fn handle_update(&self, body: &str) -> Result<Option<Dispatch>, UpdateRejection> {
        if body.trim().is_empty() {
            return Err(UpdateRejection::EmptyBody);
        }

        let update = match serde_json::from_str::<Value>(body) {
            Ok(update @ Value::Object(_)) => update,
            _ => return Err(UpdateRejection::NotAnObject),
        };

        let kind = update_kind(&update).to_string();
        let message = match Message::from_update(update) {
            Some(message) => message,
            None => {
                debug!("Ignoring update of type '{}'", kind);
                return Ok(None);
            }
        };

        info!(
            "Update from user '{}' in chat '{}'",
            message.sender_id, message.chat_id
        );
        debug!("Update text: {}", message.text);

        Ok(Some(self.dispatcher.dispatch(&message, &self.client).await))
    }
}

/// `update_type` of an update, for logs.
fn update_kind(update: &Value) -> &str {
    update
        .get("update_type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// Webhook route plus a liveness probe.
pub fn router(bot: Arc<Bot>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(webhook))
        .route("/health", get(health))
        .with_state(bot)
}

/// Serve the webhook until Ctrl-C.
pub async fn run(bot: Arc<Bot>, server: &ServerConfig) -> Result<()> {
    let app = router(bot, &server.webhook_path);

    let listener = tokio::net::TcpListener::bind(&server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server.listen_addr))?;

    info!(
        "Listening for webhooks on http://{}{}",
        server.listen_addr, server.webhook_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
        .context("Server error")?;

    Ok(())
}

/// Resolves once `signal` fires. If the listener itself fails, never resolves,
/// so the server keeps running until the process is killed.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for Ctrl-C, serving until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

/// The platform retries any update not answered with 200, so everything
/// past body validation is acknowledged, including handler failures.
async fn webhook(State(bot): State<Arc<Bot>>, body: String) -> Response {
    match bot.handle_update(&body).await {
        Err(rejection) => {
            warn!("Rejected webhook request: {}", rejection);
            StatusCode::BAD_REQUEST.into_response()
        }
        Ok(outcome) => {
            if let Some(dispatch) = outcome {
                debug!("Dispatch result: {:?}", dispatch);
            }
            acknowledge()
        }
    }
}

async fn health() -> Response {
    acknowledge()
}

fn acknowledge() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "OK",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot() -> Bot {
        Bot::new(Client::with_base_url("test-token", "http://127.0.0.1:1").unwrap())
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        assert_eq!(bot().handle_update("").await, Err(UpdateRejection::EmptyBody));
        assert_eq!(bot().handle_update(" \n").await, Err(UpdateRejection::EmptyBody));
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        let bot = bot();
        assert_eq!(bot.handle_update("not json").await, Err(UpdateRejection::NotAnObject));
        assert_eq!(bot.handle_update("[1, 2]").await, Err(UpdateRejection::NotAnObject));
        assert_eq!(bot.handle_update("\"text\"").await, Err(UpdateRejection::NotAnObject));
    }

    #[tokio::test]
    async fn test_unknown_update_is_ignored() {
        let outcome = bot()
            .handle_update(r#"{"update_type": "message_callback"}"#)
            .await;
        assert_eq!(outcome, Ok(None));
    }

    #[test]
    fn test_update_kind() {
        assert_eq!(
            update_kind(&serde_json::json!({"update_type": "message_created"})),
            "message_created"
        );
        assert_eq!(update_kind(&serde_json::json!({"message": {}})), "unknown");
        assert_eq!(update_kind(&serde_json::json!({"update_type": 3})), "unknown");
    }

    #[tokio::test]
    async fn test_shutdown_on_signal() {
        let done = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            shutdown_on(async { Ok(()) }),
        )
        .await;
        assert!(done.is_ok());
    }

    #[tokio::test]
    async fn test_failed_signal_listener_keeps_serving() {
        let done = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            shutdown_on(async { Err(std::io::Error::other("no signal handler")) }),
        )
        .await;
        assert!(done.is_err());
    }

    #[tokio::test]
    async fn test_message_is_dispatched() {
        let mut bot = bot();
        bot.on_message(|_message, _client| async { Ok::<(), anyhow::Error>(()) });

        let outcome = bot
            .handle_update(r#"{"message": {"body": {"text": "hi"}}}"#)
            .await;

        assert_eq!(outcome, Ok(Some(Dispatch::Generic { invoked: 1, failed: 0 })));
    }
}
