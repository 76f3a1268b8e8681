use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const UNKNOWN_MODEL: &str = "unknown";

/// One conversation as it appears in a day listing or a search result.
///
/// Day listings carry `message_count`; search hits carry `create_time` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "crate::models::deserializers::deserialize_non_empty_string"
    )]
    pub model: Option<String>,
    #[serde(default)]
    pub message_count: Option<u32>,
    #[serde(
        default,
        deserialize_with = "crate::models::deserializers::deserialize_optional_timestamp"
    )]
    pub create_time: Option<DateTime<Utc>>,
}

impl ConversationSummary {
    pub fn model_label(&self) -> &str {
        self.model.as_deref().unwrap_or(UNKNOWN_MODEL)
    }
}

/// Conversations started on a single day, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayConversations {
    #[serde(default, deserialize_with = "crate::models::deserializers::deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

/// Ranked search hits for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<ConversationSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(
        default,
        deserialize_with = "crate::models::deserializers::deserialize_optional_timestamp"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Messages with blank content are never displayed or exported.
    pub fn is_visible(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Capitalized role, e.g. `"Assistant"`.
    pub fn role_label(&self) -> String {
        let role = self.role.as_deref().filter(|r| !r.is_empty()).unwrap_or("unknown");
        let mut chars = role.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// A full conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "crate::models::deserializers::deserialize_optional_timestamp"
    )]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "crate::models::deserializers::deserialize_optional_timestamp"
    )]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "crate::models::deserializers::deserialize_non_empty_string"
    )]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub is_archived: bool,
}

impl ConversationDetail {
    pub fn model_label(&self) -> &str {
        self.model.as_deref().unwrap_or(UNKNOWN_MODEL)
    }

    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_visible())
    }
}
