//! Value types for a single log entry and a branch's persisted state.
//!
//! See [`LogEntry`] and [`BranchData`] for details.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::id::BranchId;
use crate::validate::ValidationError;

/// The kind of a log entry.
///
/// Serializes and parses as its lowercase name (`"system"`, `"error"`, `"user"`),
/// case-insensitively and with surrounding whitespace trimmed on parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    System,
    Error,
    User,
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::User
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::System => "system",
            MessageType::Error => "error",
            MessageType::User => "user",
        };
        f.write_str(s)
    }
}

impl FromStr for MessageType {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(MessageType::System),
            "error" => Ok(MessageType::Error),
            "user" => Ok(MessageType::User),
            other => Err(ValidationError::UnknownMessageType(other.to_string())),
        }
    }
}

/// A scalar metadata value: text, integer, floating point, or boolean.
///
/// The type system enforces this union, so unlike the source implementation
/// this system was distilled from, no runtime check is needed for metadata
/// *values* — only for message types parsed from strings (see [`FromStr`]
/// above) and for `apply`'s "at least one source" rule (see [`crate::validate`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

pub type Metadata = HashMap<String, Scalar>;

/// An immutable log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub timestamp: f64,
    pub message_type: MessageType,
    pub entry_metadata: Option<Metadata>,
}

impl LogEntry {
    /// Builds a new entry, timestamped at the moment of construction
    /// (enqueue time, per the batching contract).
    pub fn new(message: String, message_type: MessageType, entry_metadata: Option<Metadata>) -> Self {
        LogEntry {
            message,
            timestamp: now_as_secs_f64(),
            message_type,
            entry_metadata,
        }
    }
}

pub(crate) fn now_as_secs_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// A branch's persisted state, as returned by a [`Reader`][crate::backend::Reader].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchData {
    pub messages: Vec<LogEntry>,
    pub metadata: Metadata,
    pub tags: Vec<String>,
    pub parent: Option<BranchId>,
    pub children: Vec<BranchId>,
}

/// A tree edge: a branch's parent and children, as stored by the backend.
pub type TreeEdge = (Option<BranchId>, Vec<BranchId>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_roundtrips_through_lowercase_string() {
        for mt in [MessageType::System, MessageType::Error, MessageType::User] {
            let s = mt.to_string();
            assert_eq!(mt, s.parse::<MessageType>().unwrap());
        }
    }

    #[test]
    fn message_type_parsing_is_case_insensitive_and_trims() {
        assert_eq!(" SYSTEM \n".parse::<MessageType>().unwrap(), MessageType::System);
        assert_eq!("Error".parse::<MessageType>().unwrap(), MessageType::Error);
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        assert!("fatal".parse::<MessageType>().is_err());
    }

    #[test]
    fn scalar_serializes_untagged() {
        let v = Scalar::Int(3);
        assert_eq!(serde_json::to_string(&v).unwrap(), "3");
        let v = Scalar::Text("hi".into());
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"hi\"");
    }
}
