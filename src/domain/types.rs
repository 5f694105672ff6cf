use serde::{Deserialize, Serialize};
use std::fmt;

/// Display-only location shown in the archive header. Not a real path.
pub const ARCHIVE_LOCATION_LABEL: &str = "/var/logs/chat_history/";

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionId {
    Number(i64),
    Text(String),
}

impl SessionId {
    /// Compares against a user-typed id, accepting either representation.
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            Self::Number(value) => raw.trim().parse::<i64>().is_ok_and(|parsed| parsed == *value),
            Self::Text(value) => value == raw,
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for SessionId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One archived exchange: a user message, the AI response, and who/when.
///
/// Records are read-only once loaded; views clone them instead of borrowing mutably.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub ai_name: String,
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub ai_response: String,
}

impl SessionRecord {
    pub fn display_name(&self) -> String {
        format!("log_{}_session.txt", self.id)
    }

    /// Character count of both messages. Shown with a `B` unit, but it is not a byte size.
    pub fn size_metric(&self) -> usize {
        self.user_message.chars().count() + self.ai_response.chars().count()
    }
}

pub fn find_record<'a>(records: &'a [SessionRecord], raw_id: &str) -> Option<&'a SessionRecord> {
    records.iter().find(|record| record.id.matches(raw_id))
}
