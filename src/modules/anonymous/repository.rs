use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::error;
use crate::modules::anonymous::{
    model::JoinOutcome,
    schema::{AnonymousChatEntity, ChatLine},
};

/// Picks a pseudonym not present in the given list.
pub type Namer = fn(&[String]) -> String;

#[async_trait::async_trait]
pub trait AnonymousChatRepository {
    /// Find-or-create as one atomic step: fails with `AlreadyInChat` if the
    /// user holds a waiting or active chat, otherwise claims the oldest
    /// waiting chat or opens a new one.
    async fn join_queue_atomic(
        &self,
        user_id: &Uuid,
        now: DateTime<Utc>,
        namer: Namer,
    ) -> Result<JoinOutcome, error::SystemError>;

    /// Deletes the user's chat only while it is still waiting alone.
    async fn leave_queue(&self, user_id: &Uuid) -> Result<bool, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<AnonymousChatEntity>, error::SystemError>;

    async fn end_chat(
        &self,
        id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AnonymousChatEntity>, error::SystemError>;

    /// Appends to the log of an active chat. `None` once the chat is not active.
    async fn append_message(
        &self,
        id: &Uuid,
        line: &ChatLine,
    ) -> Result<Option<AnonymousChatEntity>, error::SystemError>;
}
