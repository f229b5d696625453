//! Server bot protocol model.
//!
//! These are the request and response values exchanged with the hosting
//! platform. The wire transport itself lives outside this crate; the types
//! only carry serde derives matching the platform's JSON field names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Messages
// ============================================================================

/// Author of a [`ProtocolMessage`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Bot,
}

/// A file attached to an inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub url: String,
    pub content_type: String,
    pub name: String,
    #[serde(default)]
    pub parsed_content: Option<String>,
}

/// One message of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub role: Role,
    pub content: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
}

fn default_content_type() -> String {
    "text/markdown".to_string()
}

impl ProtocolMessage {
    /// Creates a message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            content_type: default_content_type(),
            timestamp: 0,
            message_id: String::new(),
            attachments: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// A request to produce a response for a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: Vec<ProtocolMessage>,
    pub version: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub user_id: String,
    pub conversation_id: String,
    pub message_id: String,
    #[serde(default)]
    pub access_key: String,
}

impl QueryRequest {
    /// Creates a query request with freshly generated identifiers.
    pub fn new(query: Vec<ProtocolMessage>) -> Self {
        Self {
            query,
            version: "1.0".to_string(),
            request_type: "query".to_string(),
            user_id: new_id(),
            conversation_id: new_id(),
            message_id: new_id(),
            access_key: String::new(),
        }
    }

    /// Returns a request for `query` that keeps every other field of `self`.
    pub fn with_query(&self, query: Vec<ProtocolMessage>) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    /// The content of the last message, if any.
    pub fn last_content(&self) -> Option<&str> {
        self.query.last().map(|m| m.content.as_str())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A request for a bot's settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRequest {
    pub version: String,
    #[serde(rename = "type")]
    pub request_type: String,
}

impl Default for SettingsRequest {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            request_type: "settings".to_string(),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// The canonical settings of a bot.
///
/// Missing keys take their documented defaults when deserializing, so a
/// partial JSON object is a valid description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsResponse {
    pub allow_attachments: bool,
    pub enable_image_comprehension: bool,
    pub expand_text_attachments: bool,
    pub server_bot_dependencies: HashMap<String, u32>,
    pub introduction_message: String,
    pub allow_user_context_clear: bool,
    pub enforce_author_role_alternation: bool,
    pub enable_multi_bot_chat_prompting: bool,
    pub context_clear_window_secs: Option<u64>,
    pub custom_rate_limit: Option<u32>,
}

impl Default for SettingsResponse {
    fn default() -> Self {
        Self {
            allow_attachments: false,
            enable_image_comprehension: false,
            expand_text_attachments: true,
            server_bot_dependencies: HashMap::new(),
            introduction_message: String::new(),
            allow_user_context_clear: true,
            enforce_author_role_alternation: false,
            enable_multi_bot_chat_prompting: false,
            context_clear_window_secs: None,
            custom_rate_limit: None,
        }
    }
}

// ============================================================================
// Response items
// ============================================================================

/// An error reported to the user. It ends the response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub text: String,
    #[serde(default)]
    pub allow_retry: bool,
    #[serde(default)]
    pub error_type: Option<String>,
}

impl ErrorResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            allow_retry: false,
            error_type: None,
        }
    }

    /// Lets the platform offer a retry to the user.
    pub fn retryable(mut self) -> Self {
        self.allow_retry = true;
        self
    }
}

/// A raw server-sent event forwarded to the transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSentEvent {
    #[serde(default)]
    pub event: Option<String>,
    pub data: String,
}

impl ServerSentEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }
}

/// One canonical item of a response stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseItem {
    /// Text appended to the response.
    Text { text: String },
    /// Text replacing the whole response so far.
    Replace { text: String },
    /// A reply the user can pick for the next turn.
    SuggestedReply { text: String },
    /// An error. Nothing follows it.
    Error(ErrorResponse),
    /// A passthrough event.
    Event(ServerSentEvent),
}

impl ResponseItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn replace(text: impl Into<String>) -> Self {
        Self::Replace { text: text.into() }
    }

    pub fn suggested_reply(text: impl Into<String>) -> Self {
        Self::SuggestedReply { text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(ErrorResponse::new(text))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The text carried by the item, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Replace { text } | Self::SuggestedReply { text } => {
                Some(text)
            }
            Self::Error(err) => Some(&err.text),
            Self::Event(_) => None,
        }
    }
}

impl From<ErrorResponse> for ResponseItem {
    fn from(err: ErrorResponse) -> Self {
        Self::Error(err)
    }
}

impl From<ServerSentEvent> for ResponseItem {
    fn from(event: ServerSentEvent) -> Self {
        Self::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults() {
        let settings = SettingsResponse::default();

        assert!(!settings.allow_attachments);
        assert!(settings.expand_text_attachments);
        assert!(settings.allow_user_context_clear);
        assert!(settings.server_bot_dependencies.is_empty());
        assert_eq!(settings.context_clear_window_secs, None);
    }

    #[test]
    fn test_partial_settings_object() {
        let settings: SettingsResponse =
            serde_json::from_value(json!({ "allow_attachments": true })).unwrap();

        assert_eq!(
            settings,
            SettingsResponse {
                allow_attachments: true,
                ..SettingsResponse::default()
            }
        );
    }

    #[test]
    fn test_query_request_wire_names() {
        let request: QueryRequest = serde_json::from_value(json!({
            "query": [{ "role": "user", "content": "hi" }],
            "version": "1.0",
            "type": "query",
            "user_id": "u",
            "conversation_id": "c",
            "message_id": "m",
        }))
        .unwrap();

        assert_eq!(request.request_type, "query");
        assert_eq!(request.access_key, "");
        assert_eq!(request.query[0].content_type, "text/markdown");
        assert_eq!(request.last_content(), Some("hi"));
    }

    #[test]
    fn test_with_query_keeps_metadata() {
        let mut original = QueryRequest::new(vec![ProtocolMessage::user("first")]);
        original.access_key = "key".to_string();

        let derived = original.with_query(vec![ProtocolMessage::user("second")]);

        assert_eq!(derived.message_id, original.message_id);
        assert_eq!(derived.access_key, "key");
        assert_eq!(derived.last_content(), Some("second"));
    }

    #[test]
    fn test_response_item_tagging() {
        let value = serde_json::to_value(ResponseItem::suggested_reply("Tell me more")).unwrap();

        assert_eq!(value, json!({ "kind": "suggested_reply", "text": "Tell me more" }));
    }
}
