//! Handlers installed by the `maxbot` binary: a `/start` greeting that
//! echoes deep-link payloads, and an HTML echo of every other message.

use anyhow::Result;
use tracing::info;

use crate::bot::Bot;
use crate::client::Client;
use crate::message::Message;

const WELCOME: &str = "👋 Welcome! Send me anything and I'll repeat it.";

pub fn register_defaults(bot: &mut Bot) {
    bot.on_command("start", start);
    bot.on_message(echo);
}

async fn start(message: Message, client: Client) -> Result<()> {
    let reply = start_reply(message.payload());
    client.send_message_to_chat(&message, &reply).await?;
    Ok(())
}

async fn echo(message: Message, client: Client) -> Result<()> {
    let Some(reply) = echo_reply(&message.text) else {
        return Ok(());
    };

    info!("Echoing to chat '{}'", message.chat_id);
    client.send_message(&message, &reply, Some("html")).await?;
    Ok(())
}

fn start_reply(payload: Option<&str>) -> String {
    match payload {
        Some(payload) if !payload.is_empty() => {
            format!("🚀 Started with payload: {}", payload)
        }
        _ => WELCOME.to_string(),
    }
}

/// Single characters (and blank text) get no echo.
fn echo_reply(text: &str) -> Option<String> {
    let text = text.trim();
    if text.len() <= 1 {
        return None;
    }
    Some(format!("📝 You wrote: <b>{}</b>", escape_html(text)))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
