use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize, Default)]
#[sqlx(type_name = "message_kind", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    #[default]
    Text,
    Snap,
    VideoSnap,
    Audio,
    Sticker,
}

impl MessageKind {
    pub fn is_snap(self) -> bool {
        matches!(self, MessageKind::Snap | MessageKind::VideoSnap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntity {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub kind: MessageKind,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub is_snap: bool,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reactions: Json<Vec<Reaction>>,
    pub created_at: DateTime<Utc>,
}

impl MessageEntity {
    /// Non-snap messages never expire; a snap is deliverable strictly before
    /// its `expires_at`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        crate::modules::expiry::policy::is_live(self.expires_at, now)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}
