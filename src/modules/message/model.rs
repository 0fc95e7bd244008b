use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::modules::message::schema::MessageKind;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageModel {
    pub recipient_id: Uuid,
    #[serde(default)]
    pub kind: MessageKind,
    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: Option<String>,
    #[validate(url(message = "Media must be a valid URL"))]
    pub media_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReactionModel {
    pub message_id: Uuid,
    #[validate(length(min = 1, max = 16, message = "Emoji must be 1-16 characters"))]
    pub emoji: String,
}

pub struct InsertMessage {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub kind: MessageKind,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One step of a call handshake between two friends.
#[derive(Debug, Clone)]
pub enum CallSignal {
    Offer(serde_json::Value),
    Answer(serde_json::Value),
    Candidate(serde_json::Value),
    End,
}
