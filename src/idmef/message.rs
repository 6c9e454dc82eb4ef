//! IDMEF messages as stored and returned by the database layer.
//!
//! The message body is kept as an opaque JSON document; the storage layer
//! only looks at the analyzer identifier, the message identifier and the
//! creation time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::db::MessageIdent;

/// The two IDMEF message classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Alert,
    Heartbeat,
}

impl MessageKind {
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Alert => "alert",
            MessageKind::Heartbeat => "heartbeat",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            MessageKind::Alert => "alerts",
            MessageKind::Heartbeat => "heartbeats",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alert" | "alerts" => Ok(MessageKind::Alert),
            "heartbeat" | "heartbeats" => Ok(MessageKind::Heartbeat),
            other => Err(format!("unknown message kind '{}'", other)),
        }
    }
}

/// Truncate to the microsecond precision the database stores.
fn to_micros(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(time.timestamp_micros()).unwrap_or(time)
}

/// An alert or heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub analyzerid: u64,
    pub ident: u64,
    pub create_time: DateTime<Utc>,
    #[serde(default)]
    pub content: JsonValue,
}

impl Message {
    /// Create an empty message of the given kind, created now.
    pub fn new(kind: MessageKind, analyzerid: u64, ident: u64) -> Self {
        Self {
            kind,
            analyzerid,
            ident,
            create_time: to_micros(Utc::now()),
            content: JsonValue::Object(Map::new()),
        }
    }

    pub fn alert(analyzerid: u64, ident: u64) -> Self {
        Self::new(MessageKind::Alert, analyzerid, ident)
    }

    pub fn heartbeat(analyzerid: u64, ident: u64) -> Self {
        Self::new(MessageKind::Heartbeat, analyzerid, ident)
    }

    pub fn with_create_time(mut self, create_time: DateTime<Utc>) -> Self {
        self.create_time = to_micros(create_time);
        self
    }

    pub fn with_content(mut self, content: JsonValue) -> Self {
        self.content = content;
        self
    }

    /// Set the field at a dotted path below the message root, creating
    /// intermediate objects as needed.
    ///
    /// ```
    /// use idmef_db::idmef::Message;
    ///
    /// let alert = Message::alert(1, 2).with("classification.text", "Ping sweep");
    /// assert_eq!(alert.get("classification.text").unwrap(), "Ping sweep");
    /// ```
    pub fn with(mut self, path: &str, value: impl Into<JsonValue>) -> Self {
        self.set(path, value.into());
        self
    }

    pub fn set(&mut self, path: &str, value: JsonValue) {
        let mut node = &mut self.content;
        for key in path.split('.') {
            if !node.is_object() {
                *node = JsonValue::Object(Map::new());
            }
            let JsonValue::Object(map) = node else {
                return;
            };
            node = map.entry(key.to_string()).or_insert(JsonValue::Null);
        }
        *node = value;
    }

    /// Field at a dotted path below the message root.
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        path.split('.')
            .try_fold(&self.content, |node, key| node.get(key))
    }

    pub fn ident(&self) -> MessageIdent {
        MessageIdent::new(self.analyzerid, self.ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("alert", MessageKind::Alert)]
    #[case("Alerts", MessageKind::Alert)]
    #[case("heartbeats", MessageKind::Heartbeat)]
    fn test_kind_from_str(#[case] input: &str, #[case] expected: MessageKind) {
        assert_eq!(input.parse::<MessageKind>().unwrap(), expected);
    }

    #[rstest]
    fn test_kind_from_str_unknown() {
        assert!("event".parse::<MessageKind>().is_err());
    }

    #[rstest]
    fn test_with_builds_nested_objects() {
        let alert = Message::alert(1, 2)
            .with("classification.text", "A")
            .with("assessment.impact.severity", "high");
        assert_eq!(
            alert.content,
            json!({
                "classification": { "text": "A" },
                "assessment": { "impact": { "severity": "high" } }
            })
        );
    }

    #[rstest]
    fn test_with_replaces_scalar_intermediate() {
        let alert = Message::alert(1, 2).with("a", 1).with("a.b", 2);
        assert_eq!(alert.content, json!({ "a": { "b": 2 } }));
    }

    #[rstest]
    fn test_get_missing_path() {
        let alert = Message::alert(1, 2).with("a.b", 1);
        assert_eq!(alert.get("a.c"), None);
        assert_eq!(alert.get("a.b.c"), None);
    }

    #[rstest]
    fn test_create_time_truncated_to_micros() {
        let time = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let alert = Message::alert(1, 2).with_create_time(time);
        assert_eq!(alert.create_time.timestamp_subsec_nanos(), 123_456_000);
    }

    #[rstest]
    fn test_ident() {
        assert_eq!(Message::heartbeat(7, 42).ident(), MessageIdent::new(7, 42));
    }

    #[rstest]
    fn test_serde_round_trip() {
        let alert = Message::alert(u64::MAX, 3).with("classification.text", "A");
        let json = serde_json::to_string(&alert).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, alert);
    }
}
