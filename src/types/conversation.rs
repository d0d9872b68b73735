//! Question-answering conversations and their messages

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    /// Metric definition questions
    #[default]
    Caliber,
    Data,
    Sql,
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConversationType::Caliber => "caliber",
            ConversationType::Data => "data",
            ConversationType::Sql => "sql",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub group_name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub conversation_type: ConversationType,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    /// text, table, code, chart or error
    #[serde(default)]
    pub content_type: String,
    /// Chart config, table rows or code block, depending on `content_type`
    #[serde(default)]
    pub message_metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub conversation_type: ConversationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
}

/// `group_id: Some(None)` moves the conversation out of its group.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<ConversationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// `-1` selects ungrouped conversations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<ConversationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// The stored question and the assistant's answer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageExchange {
    pub user_message: ConversationMessage,
    pub assistant_message: ConversationMessage,
}
