use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::anonymous::schema::{AnonymousChatEntity, ChatLine, ChatStatus};

pub const WAITING_PARTNER_NAME: &str = "Waiting...";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousMessageModel {
    pub chat_id: Uuid,
    #[validate(length(min = 1, max = 1000, message = "Message must be 1-1000 characters"))]
    pub content: String,
}

/// A chat as seen by one participant. Real user ids are never exposed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub id: Uuid,
    pub status: ChatStatus,
    pub self_name: String,
    pub partner_name: String,
    pub messages: Vec<ChatLineView>,
    pub started_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLineView {
    pub sender_name: String,
    pub content: String,
    pub is_own: bool,
    pub sent_at: DateTime<Utc>,
}

impl ChatView {
    pub fn for_user(chat: &AnonymousChatEntity, user_id: Uuid, now: DateTime<Utc>) -> Self {
        let self_name = chat.participant(user_id).map(|p| p.pseudonym.clone()).unwrap_or_default();
        let partner_name = chat
            .partner_of(user_id)
            .map(|p| p.pseudonym.clone())
            .unwrap_or_else(|| WAITING_PARTNER_NAME.to_string());

        ChatView {
            id: chat.id,
            status: chat.effective_status(now),
            self_name,
            partner_name,
            messages: chat.messages.iter().map(|line| ChatLineView::for_user(line, user_id)).collect(),
            started_at: chat.started_at,
            ends_at: chat.ends_at,
            ended_at: chat.ended_at,
        }
    }
}

impl ChatLineView {
    fn for_user(line: &ChatLine, user_id: Uuid) -> Self {
        ChatLineView {
            sender_name: line.sender_name.clone(),
            content: line.content.clone(),
            is_own: line.sender_id == user_id,
            sent_at: line.sent_at,
        }
    }
}

/// Result of joining the queue: either a fresh waiting chat or a match.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub chat: AnonymousChatEntity,
    pub matched: bool,
}
