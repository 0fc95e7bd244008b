use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "anonymous_chat_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParticipant {
    pub user_id: Uuid,
    pub pseudonym: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLine {
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AnonymousChatEntity {
    pub id: Uuid,
    pub status: ChatStatus,
    pub participants: Json<Vec<ChatParticipant>>,
    pub messages: Json<Vec<ChatLine>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AnonymousChatEntity {
    /// An active chat past `ends_at` has timed out and reads as ended.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ChatStatus {
        match (self.status, self.ends_at) {
            (ChatStatus::Active, Some(ends_at)) if now >= ends_at => ChatStatus::Ended,
            (status, _) => status,
        }
    }

    /// Chats are destroyed an hour after creation, whatever their state.
    pub fn is_retained(&self, now: DateTime<Utc>) -> bool {
        self.created_at > crate::modules::expiry::policy::chat_retention_cutoff(now)
    }

    pub fn participant(&self, user_id: Uuid) -> Option<&ChatParticipant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn partner_of(&self, user_id: Uuid) -> Option<&ChatParticipant> {
        self.participants.iter().find(|p| p.user_id != user_id)
    }

    /// True while the user is waiting in, or actively chatting through, this chat.
    pub fn holds(&self, user_id: Uuid, now: DateTime<Utc>) -> bool {
        self.is_retained(now)
            && self.participant(user_id).is_some()
            && matches!(self.effective_status(now), ChatStatus::Waiting | ChatStatus::Active)
    }
}
