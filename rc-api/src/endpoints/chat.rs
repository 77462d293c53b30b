//! Chat history endpoint.

use rc_core::error::{RcError, RcResult};
use rc_socket::message::{normalize_value, InboundMessage};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ApiClient;

impl ApiClient {
    /// Fetch previously exchanged chat messages, oldest first.
    ///
    /// Records are normalized like live frames; records without text are
    /// skipped.
    pub async fn chat_history(&self) -> RcResult<Vec<InboundMessage>> {
        let path = self.history_path().to_string();
        let body: Value = self.get_json(&path, None).await?;
        let messages = history_from_value(&body)?;
        debug!("loaded {} history message(s)", messages.len());
        Ok(messages)
    }
}

/// Normalize a history response body. Accepts a bare array or an object
/// wrapping one under `messages` or `data`.
pub fn history_from_value(body: &Value) -> RcResult<Vec<InboundMessage>> {
    let records = match body {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("messages").or_else(|| map.get("data")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RcError::Serialization(
                    "history response has no message list".into(),
                ))
            }
        },
        _ => {
            return Err(RcError::Serialization(
                "history response is not a list".into(),
            ))
        }
    };

    Ok(records
        .iter()
        .filter_map(|record| match normalize_value(record) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("skipping history record ({e})");
                None
            }
        })
        .collect())
}
