use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error};

use crate::client::Client;
use crate::message::Message;

/// A registered handler: receives its own copy of the message and the client.
pub type Handler = Arc<dyn Fn(Message, Client) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// What a dispatch did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A command handler ran; `ok` is false if it failed.
    Command { name: String, ok: bool },
    /// Generic handlers ran (possibly none).
    Generic { invoked: usize, failed: usize },
}

/// Command and generic handler registries.
///
/// Filled once at startup, read-only while serving.
#[derive(Default)]
pub struct Dispatcher {
    commands: HashMap<String, Handler>,
    generic: Vec<Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `command` (with or without the leading `/`).
    /// A later registration for the same command replaces the earlier one.
    pub fn on_command<F, Fut>(&mut self, command: &str, handler: F)
    where
        F: Fn(Message, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = command.trim_start_matches('/').to_string();
        debug!("Registered command handler: /{}", name);
        self.commands.insert(name, boxed(handler));
    }

    /// Append a handler run for every message no command handler claimed.
    pub fn on_message<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Message, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.generic.push(boxed(handler));
    }

    pub fn has_command(&self, command: &str) -> bool {
        self.commands.contains_key(command.trim_start_matches('/'))
    }

    pub fn message_handler_count(&self) -> usize {
        self.generic.len()
    }

    /// Route `message` to its command handler, or to every generic handler
    /// in registration order. A failing or panicking handler is logged and
    /// does not stop the handlers after it.
    pub async fn dispatch(&self, message: &Message, client: &Client) -> Dispatch {
        if let Some(name) = message.command() {
            if let Some(handler) = self.commands.get(name) {
                debug!("Dispatching command /{}", name);
                let ok = run_handler(handler, message, client, &format!("/{}", name)).await;
                return Dispatch::Command {
                    name: name.to_string(),
                    ok,
                };
            }
        }

        let mut failed = 0;
        for (index, handler) in self.generic.iter().enumerate() {
            let label = format!("message handler #{}", index);
            if !run_handler(handler, message, client, &label).await {
                failed += 1;
            }
        }

        Dispatch::Generic {
            invoked: self.generic.len(),
            failed,
        }
    }
}

fn boxed<F, Fut>(handler: F) -> Handler
where
    F: Fn(Message, Client) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |message, client| handler(message, client).boxed())
}

async fn run_handler(handler: &Handler, message: &Message, client: &Client, label: &str) -> bool {
    let call = async { handler(message.clone(), client.clone()).await };

    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("Handler {} failed: {:#}", label, e);
            false
        }
        Err(_) => {
            error!("Handler {} panicked", label);
            false
        }
    }
}
