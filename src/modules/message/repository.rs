use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::error;
use crate::modules::message::{
    model::InsertMessage,
    schema::{MessageEntity, Reaction},
};

#[async_trait::async_trait]
pub trait MessageRepository {
    /// Persists the message. A snap also credits the sender's score in the
    /// same write.
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Marks the message read. For a snap this also stamps `viewed_at` and
    /// moves `expires_at` to `view_expires_at`, but only on the first view;
    /// `None` means the snap had already been viewed. The first view of a snap
    /// credits the reader's score in the same write.
    async fn mark_read(
        &self,
        id: &Uuid,
        read_at: DateTime<Utc>,
        view_expires_at: DateTime<Utc>,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Most recent `limit` live messages between the two users, oldest first.
    async fn find_conversation(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    /// Replaces the reacting user's previous reaction, if any.
    async fn upsert_reaction(
        &self,
        id: &Uuid,
        reaction: &Reaction,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError>;
}
