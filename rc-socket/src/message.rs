//! Chat message types and inbound frame normalization.
//!
//! Inbound frames are untyped JSON records whose fields may be missing or
//! malformed. [`parse_frame`] turns a raw frame into a fully populated
//! [`InboundMessage`], substituting fallbacks for every optional field, or
//! reports a [`FrameError`] when nothing usable can be recovered.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use rc_core::constants::{fallback, message_type};

lazy_static! {
    /// Greedy `{...}` span: from the first opening brace to the last closing one.
    static ref EMBEDDED_RECORD: Regex = Regex::new(r"(?s)\{.*\}").expect("valid regex");
}

/// Kind of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Broadcast to the support channel.
    #[default]
    Text,
    /// Delivered only to a target user.
    Private,
}

impl MessageKind {
    /// Parse a wire value. Anything unrecognized is plain text.
    pub fn from_wire(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case(message_type::PRIVATE) {
            Self::Private
        } else {
            Self::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => message_type::TEXT,
            Self::Private => message_type::PRIVATE,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized chat event. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Server id, or the receive time in milliseconds when the server sent none.
    pub id: i64,
    pub text: String,
    pub sender_email: String,
    pub sender_username: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    pub message_type: MessageKind,
}

/// Why a frame could not be turned into an [`InboundMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Neither the frame nor any embedded `{...}` span is a JSON object.
    #[error("no structured record found in frame")]
    Unstructured,
    /// The record carries no usable message text.
    #[error("record has no message text")]
    MissingText,
}

/// Parse a raw inbound frame into a normalized message.
///
/// Tries the whole frame first, then the widest embedded `{...}` span.
pub fn parse_frame(raw: &str) -> Result<InboundMessage, FrameError> {
    parse_frame_at(raw, Utc::now())
}

/// [`parse_frame`] with an explicit clock for the fallback id and timestamp.
pub fn parse_frame_at(raw: &str, now: DateTime<Utc>) -> Result<InboundMessage, FrameError> {
    if let Some(record) = parse_record(raw) {
        return normalize_value_at(&record, now);
    }

    let span = EMBEDDED_RECORD
        .find(raw)
        .ok_or(FrameError::Unstructured)?;
    let record = parse_record(span.as_str()).ok_or(FrameError::Unstructured)?;
    normalize_value_at(&record, now)
}

/// Normalize an already-parsed JSON record.
pub fn normalize_value(value: &Value) -> Result<InboundMessage, FrameError> {
    normalize_value_at(value, Utc::now())
}

/// [`normalize_value`] with an explicit clock.
pub fn normalize_value_at(value: &Value, now: DateTime<Utc>) -> Result<InboundMessage, FrameError> {
    if !value.is_object() {
        return Err(FrameError::Unstructured);
    }

    let text = value
        .get("text")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(FrameError::MissingText)?
        .to_string();

    let id = value
        .get("id")
        .and_then(numeric_id)
        .unwrap_or_else(|| now.timestamp_millis());

    let timestamp = non_empty_str(value, "timestamp")
        .filter(|s| is_iso_timestamp(s))
        .map(str::to_string)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

    let message_type = value
        .get("message_type")
        .and_then(Value::as_str)
        .map(MessageKind::from_wire)
        .unwrap_or_default();

    Ok(InboundMessage {
        id,
        text,
        sender_email: non_empty_str(value, "sender_email")
            .unwrap_or(fallback::SENDER_EMAIL)
            .to_string(),
        sender_username: non_empty_str(value, "sender_username")
            .unwrap_or(fallback::SENDER_USERNAME)
            .to_string(),
        timestamp,
        message_type,
    })
}

fn parse_record(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(Value::is_object)
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_iso_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Structured outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    pub message_type: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user: Option<String>,
}

/// A payload handed to [`ConnectionManager::send`](crate::ConnectionManager::send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Sent verbatim.
    Text(String),
    /// Serialized to JSON before sending.
    Structured(ChatRequest),
}

impl OutboundMessage {
    /// A bare text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A structured broadcast message: `{"text": ..., "message_type": "text"}`.
    pub fn structured(text: impl Into<String>) -> Self {
        Self::Structured(ChatRequest {
            text: text.into(),
            message_type: MessageKind::Text,
            target_user: None,
        })
    }

    /// A private message delivered only to `target_user`.
    pub fn private(text: impl Into<String>, target_user: impl Into<String>) -> Self {
        Self::Structured(ChatRequest {
            text: text.into(),
            message_type: MessageKind::Private,
            target_user: Some(target_user.into()),
        })
    }

    /// Encode to the text frame written to the transport.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Structured(request) => serde_json::to_string(request),
        }
    }
}

impl From<&str> for OutboundMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for OutboundMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<ChatRequest> for OutboundMessage {
    fn from(request: ChatRequest) -> Self {
        Self::Structured(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    #[test]
    fn test_complete_frame_is_kept_verbatim() {
        let raw = r#"{"id":42,"text":"Try the risotto","sender_email":"chef@example.com","sender_username":"Chef","timestamp":"2024-01-01T12:00:00Z","message_type":"private"}"#;
        let msg = parse_frame_at(raw, clock()).unwrap();
        assert_eq!(msg.id, 42);
        assert_eq!(msg.text, "Try the risotto");
        assert_eq!(msg.sender_email, "chef@example.com");
        assert_eq!(msg.sender_username, "Chef");
        assert_eq!(msg.timestamp, "2024-01-01T12:00:00Z");
        assert_eq!(msg.message_type, MessageKind::Private);
    }

    #[test]
    fn test_missing_fields_get_fallbacks() {
        let raw = r#"{"text":"hi","sender_email":"a@b.com","timestamp":"2024-01-01T00:00:00Z"}"#;
        let msg = parse_frame_at(raw, clock()).unwrap();
        assert_eq!(msg.id, clock().timestamp_millis());
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.sender_email, "a@b.com");
        assert_eq!(msg.sender_username, "Unknown");
        assert_eq!(msg.timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(msg.message_type, MessageKind::Text);
    }

    #[test]
    fn test_only_text_present() {
        let msg = parse_frame_at(r#"{"text":"hello"}"#, clock()).unwrap();
        assert_eq!(msg.sender_email, "unknown");
        assert_eq!(msg.sender_username, "Unknown");
        assert_eq!(msg.timestamp, "2024-05-06T07:08:09.000Z");
        assert_eq!(msg.message_type, MessageKind::Text);
    }

    #[test]
    fn test_null_and_empty_fields_use_fallbacks() {
        let raw = r#"{"id":null,"text":"x","sender_email":"","sender_username":"   ","timestamp":null,"message_type":null}"#;
        let msg = parse_frame_at(raw, clock()).unwrap();
        assert_eq!(msg.id, clock().timestamp_millis());
        assert_eq!(msg.sender_email, "unknown");
        assert_eq!(msg.sender_username, "Unknown");
        assert_eq!(msg.timestamp, "2024-05-06T07:08:09.000Z");
    }

    #[test]
    fn test_malformed_field_values_use_fallbacks() {
        let raw = r#"{"id":"abc","text":"x","timestamp":"yesterday","message_type":"shout"}"#;
        let msg = parse_frame_at(raw, clock()).unwrap();
        assert_eq!(msg.id, clock().timestamp_millis());
        assert_eq!(msg.timestamp, "2024-05-06T07:08:09.000Z");
        assert_eq!(msg.message_type, MessageKind::Text);
    }

    #[test]
    fn test_numeric_string_id_and_naive_timestamp() {
        let raw = r#"{"id":"17","text":"x","timestamp":"2024-03-01T10:00:00.123456"}"#;
        let msg = parse_frame_at(raw, clock()).unwrap();
        assert_eq!(msg.id, 17);
        assert_eq!(msg.timestamp, "2024-03-01T10:00:00.123456");
    }

    #[test]
    fn test_embedded_record_is_recovered() {
        let raw = r#"event: message data={"id":7,"text":"recovered"} trailing"#;
        let msg = parse_frame_at(raw, clock()).unwrap();
        assert_eq!(msg.id, 7);
        assert_eq!(msg.text, "recovered");
    }

    #[test]
    fn test_garbage_is_unstructured() {
        assert_eq!(parse_frame("not json at all"), Err(FrameError::Unstructured));
        assert_eq!(parse_frame(""), Err(FrameError::Unstructured));
        assert_eq!(parse_frame("[1,2,3]"), Err(FrameError::Unstructured));
    }

    #[test]
    fn test_truncated_json_is_unstructured() {
        assert_eq!(
            parse_frame(r#"{"text":"hi","sender_email":"a@b"#),
            Err(FrameError::Unstructured)
        );
        assert_eq!(
            parse_frame(r#"prefix {"text": } suffix"#),
            Err(FrameError::Unstructured)
        );
    }

    #[test]
    fn test_record_without_text_is_rejected() {
        assert_eq!(parse_frame(r#"{"id":1}"#), Err(FrameError::MissingText));
        assert_eq!(parse_frame(r#"{"text":""}"#), Err(FrameError::MissingText));
        assert_eq!(parse_frame(r#"{"text":5}"#), Err(FrameError::MissingText));
    }

    #[test]
    fn test_outbound_text_is_sent_verbatim() {
        assert_eq!(OutboundMessage::from("hello").encode().unwrap(), "hello");
    }

    #[test]
    fn test_outbound_private_serialization() {
        let frame = OutboundMessage::private("psst", "bob@example.com").encode().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"text": "psst", "message_type": "private", "target_user": "bob@example.com"})
        );
    }

    #[test]
    fn test_outbound_structured_omits_target() {
        let frame = OutboundMessage::structured("hey").encode().unwrap();
        assert_eq!(frame, r#"{"text":"hey","message_type":"text"}"#);
    }

    #[test]
    fn test_message_kind_wire_values() {
        assert_eq!(MessageKind::from_wire("PRIVATE"), MessageKind::Private);
        assert_eq!(MessageKind::from_wire("text"), MessageKind::Text);
        assert_eq!(MessageKind::Private.to_string(), "private");
    }
}
