use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::{model::FriendRequestView, schema::FriendRequestEntity};
use crate::modules::user::model::UserProfile;

#[async_trait::async_trait]
pub trait FriendRepository {
    async fn are_friends(&self, user_a: &Uuid, user_b: &Uuid) -> Result<bool, error::SystemError>;

    async fn find_friend_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError>;

    async fn find_friends(&self, user_id: &Uuid) -> Result<Vec<UserProfile>, error::SystemError>;

    /// Drops the friendship and the request that created it. Returns false when
    /// the two users were not friends.
    async fn delete_friendship(&self, user_a: &Uuid, user_b: &Uuid)
    -> Result<bool, error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRequestRepository {
    async fn find_request_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_incoming_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError>;

    async fn find_outgoing_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError>;

    /// Creates a pending request, or revives a rejected one for the same pair.
    /// Returns `None` while a pending or accepted request already exists.
    async fn upsert_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
        message: &Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    /// Moves a pending request to rejected. `None` if it is no longer pending.
    async fn reject_request(
        &self,
        request_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRepo: FriendRepository + FriendRequestRepository + Send + Sync {
    /// Accepts the request and creates the friendship in one transaction.
    /// Accepting an already accepted request is a no-op.
    async fn accept_request_atomic(
        &self,
        request_id: &Uuid,
        user_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<FriendRequestEntity, error::SystemError>;
}
