//! maxbot setup wizard.
//!
//! Prompts for the bot token and webhook server settings in the terminal and
//! writes `config.toml` to `$MAXBOT_ROOT` (default: current directory).

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    bot_token: &'a str,
    listen_addr: &'a str,
    webhook_path: &'a str,
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let webhook_path = if p.webhook_path.starts_with('/') {
        p.webhook_path.to_owned()
    } else {
        format!("/{}", p.webhook_path)
    };

    let bot_token = toml_string(p.bot_token);
    let listen_addr = toml_string(p.listen_addr);
    let webhook_path = toml_string(&webhook_path);

    format!(
        r#"[max]
bot_token = {bot_token}

[server]
listen_addr = {listen_addr}
webhook_path = {webhook_path}
"#
    )
}

/// Quoted and escaped TOML string literal.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_owned()).to_string()
}

// ── CLI ────────────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== maxbot setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let bot_token = read_line("MAX bot token: ")?;
    if bot_token.is_empty() {
        anyhow::bail!("A bot token is required");
    }
    let listen_addr = or_default(
        read_line(&format!("Listen address [{DEFAULT_LISTEN_ADDR}]: "))?,
        DEFAULT_LISTEN_ADDR,
    );
    let webhook_path = or_default(
        read_line(&format!("Webhook path [{DEFAULT_WEBHOOK_PATH}]: "))?,
        DEFAULT_WEBHOOK_PATH,
    );

    let config = format_config(&ConfigParams {
        bot_token: &bot_token,
        listen_addr: &listen_addr,
        webhook_path: &webhook_path,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run");
    Ok(())
}

fn main() -> Result<()> {
    let project_root =
        PathBuf::from(std::env::var("MAXBOT_ROOT").unwrap_or_else(|_| ".".to_string()));

    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
