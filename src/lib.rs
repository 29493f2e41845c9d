//! Webhook bot client for the MAX messaging platform.
//!
//! Inbound updates are parsed into [`Message`]s and routed by a
//! [`Dispatcher`] to command or generic handlers, which reply through the
//! REST [`Client`].

pub mod bot;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod message;

pub use bot::{Bot, UpdateRejection};
pub use client::{Client, TextFormat};
pub use config::Config;
pub use dispatcher::{Dispatch, Dispatcher};
pub use message::Message;
