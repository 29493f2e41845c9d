use serde_json::Value;

/// `update_type` of the event sent when a user opens a conversation with the bot.
const BOT_STARTED: &str = "bot_started";

/// Text synthesized for conversation-started events.
pub const START_COMMAND: &str = "/start";

/// A normalized inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Sender user id, empty when unknown
    pub sender_id: String,
    /// Recipient chat id, empty when the event targets a user directly
    pub chat_id: String,
    /// Recipient chat type (e.g. "dialog", "chat")
    pub chat_type: String,
    /// Message text; `/start` for conversation-started events
    pub text: String,
    /// Deep-link payload attached to a conversation-started event
    pub payload: Option<String>,
    /// The update as received
    pub raw: Value,
}

impl Message {
    /// Build a message from a decoded webhook update.
    ///
    /// Returns `None` for update types the bot does not handle
    /// (delivery receipts, edits, callbacks and so on).
    pub fn from_update(update: Value) -> Option<Self> {
        if update.get("update_type").and_then(Value::as_str) == Some(BOT_STARTED) {
            return Some(Self {
                sender_id: string_at(&update, "/user/user_id"),
                chat_id: string_at(&update, "/chat_id"),
                chat_type: String::new(),
                text: START_COMMAND.to_string(),
                payload: payload_of(&update),
                raw: update,
            });
        }

        let message = update.get("message").filter(|m| !m.is_null())?;

        Some(Self {
            sender_id: string_at(message, "/sender/user_id"),
            chat_id: string_at(message, "/recipient/chat_id"),
            chat_type: string_at(message, "/recipient/chat_type"),
            text: string_at(message, "/body/text"),
            payload: None,
            raw: update,
        })
    }

    pub fn is_command(&self) -> bool {
        self.text.trim().starts_with('/')
    }

    /// Command name without the leading slash, e.g. `start` for `/start foo`.
    pub fn command(&self) -> Option<&str> {
        if !self.is_command() {
            return None;
        }

        let text = self.text.trim();
        let head = match text.find(' ') {
            Some(pos) => &text[..pos],
            None => text,
        };
        Some(&head[1..])
    }

    /// Everything after the first space of a command, trimmed.
    pub fn command_args(&self) -> &str {
        if !self.is_command() {
            return "";
        }

        let text = self.text.trim();
        match text.find(' ') {
            Some(pos) => text[pos + 1..].trim(),
            None => "",
        }
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

/// Read a string or number at `pointer`; anything else counts as absent.
fn string_at(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn payload_of(update: &Value) -> Option<String> {
    match update.get("payload")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_message(text: &str) -> Message {
        Message::from_update(json!({
            "update_type": "message_created",
            "message": {
                "sender": {"user_id": 7},
                "recipient": {"chat_id": 42, "chat_type": "dialog"},
                "body": {"text": text}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_bot_started_with_payload() {
        let msg = Message::from_update(json!({
            "update_type": "bot_started",
            "chat_id": "42",
            "user": {"user_id": "7"},
            "payload": "ref-campaign"
        }))
        .unwrap();

        assert_eq!(msg.text, "/start");
        assert_eq!(msg.chat_id, "42");
        assert_eq!(msg.sender_id, "7");
        assert!(msg.has_payload());
        assert_eq!(msg.payload(), Some("ref-campaign"));
        assert_eq!(msg.command(), Some("start"));
    }

    #[test]
    fn test_bot_started_without_payload() {
        let msg = Message::from_update(json!({
            "update_type": "bot_started",
            "chat_id": 42
        }))
        .unwrap();

        assert!(!msg.has_payload());
        assert_eq!(msg.payload(), None);
        assert_eq!(msg.chat_id, "42");
        assert_eq!(msg.sender_id, "");
    }

    #[test]
    fn test_bot_started_empty_and_null_payload_differ() {
        let empty = Message::from_update(json!({
            "update_type": "bot_started", "chat_id": "1", "payload": ""
        }))
        .unwrap();
        let null = Message::from_update(json!({
            "update_type": "bot_started", "chat_id": "1", "payload": null
        }))
        .unwrap();

        assert_eq!(empty.payload(), Some(""));
        assert!(empty.has_payload());
        assert!(!null.has_payload());
    }

    #[test]
    fn test_bot_started_structured_payload_kept_as_json() {
        let msg = Message::from_update(json!({
            "update_type": "bot_started",
            "chat_id": 1,
            "payload": {"ref": 1}
        }))
        .unwrap();

        assert_eq!(msg.payload(), Some("{\"ref\":1}"));
        assert_eq!(msg.chat_id, "1");
    }

    #[test]
    fn test_non_scalar_ids_are_absent() {
        let msg = Message::from_update(json!({
            "message": {
                "sender": {"user_id": null},
                "recipient": {"chat_id": {"id": 42}, "chat_type": ["dialog"]},
                "body": {"text": "hi"}
            }
        }))
        .unwrap();

        assert_eq!(msg.chat_id, "");
        assert_eq!(msg.chat_type, "");
        assert_eq!(msg.sender_id, "");
    }

    #[test]
    fn test_boolean_fields_are_absent() {
        let msg = Message::from_update(json!({
            "message": {
                "sender": {"user_id": true},
                "body": {"text": false}
            }
        }))
        .unwrap();

        assert_eq!(msg.sender_id, "");
        assert_eq!(msg.text, "");
    }

    #[test]
    fn test_bot_started_missing_chat_id_defaults_to_empty() {
        let msg = Message::from_update(json!({"update_type": "bot_started"})).unwrap();
        assert_eq!(msg.chat_id, "");
        assert_eq!(msg.text, "/start");
    }

    #[test]
    fn test_generic_message_fields() {
        let msg = text_message("hello");
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.sender_id, "7");
        assert_eq!(msg.chat_id, "42");
        assert_eq!(msg.chat_type, "dialog");
        assert!(!msg.has_payload());
        assert_eq!(msg.raw["update_type"], "message_created");
    }

    #[test]
    fn test_generic_message_missing_fields_default_to_empty() {
        let msg = Message::from_update(json!({"message": {}})).unwrap();
        assert_eq!(msg.text, "");
        assert_eq!(msg.sender_id, "");
        assert_eq!(msg.chat_id, "");
        assert_eq!(msg.chat_type, "");
    }

    #[test]
    fn test_unrecognized_update_is_ignored() {
        assert!(Message::from_update(json!({"update_type": "message_removed"})).is_none());
        assert!(Message::from_update(json!({"message": null})).is_none());
        assert!(Message::from_update(json!({})).is_none());
    }

    #[test]
    fn test_command_with_args() {
        let msg = text_message("/start foo");
        assert!(msg.is_command());
        assert_eq!(msg.command(), Some("start"));
        assert_eq!(msg.command_args(), "foo");
    }

    #[test]
    fn test_command_args_are_trimmed() {
        let msg = text_message("  /echo   one two  ");
        assert_eq!(msg.command(), Some("echo"));
        assert_eq!(msg.command_args(), "one two");
    }

    #[test]
    fn test_command_without_args() {
        let msg = text_message("/help");
        assert_eq!(msg.command(), Some("help"));
        assert_eq!(msg.command_args(), "");
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        let msg = text_message("hello");
        assert!(!msg.is_command());
        assert_eq!(msg.command(), None);
        assert_eq!(msg.command_args(), "");
    }

    #[test]
    fn test_blank_text_is_not_a_command() {
        let msg = text_message("   ");
        assert!(!msg.is_command());
        assert_eq!(msg.command(), None);
    }
}
