use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friend::{
            model::{FriendRequestModel, FriendRequestsResponse, FriendshipStatus},
            repository::{FriendRepo, FriendRepository},
            schema::{FriendRequestEntity, FriendRequestStatus},
        },
        user::{model::UserProfile, repository::UserRepository},
        websocket::{message::ServerMessage, registry::PresenceRegistry},
    },
    utils::Clock,
};

/// Fails with `Unauthorized` unless the two users are friends.
pub async fn require_friendship<R: FriendRepository + ?Sized>(
    repo: &R,
    user_id: Uuid,
    other_id: Uuid,
    message: &'static str,
) -> Result<(), error::SystemError> {
    if user_id != other_id && repo.are_friends(&user_id, &other_id).await? {
        Ok(())
    } else {
        Err(error::SystemError::unauthorized(message))
    }
}

#[derive(Clone)]
pub struct FriendService {
    friend_repo: Arc<dyn FriendRepo>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    registry: PresenceRegistry,
    clock: Arc<dyn Clock>,
}

impl FriendService {
    pub fn with_dependencies(
        friend_repo: Arc<dyn FriendRepo>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        registry: PresenceRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        FriendService { friend_repo, user_repo, registry, clock }
    }

    async fn profile(&self, user_id: Uuid) -> Result<UserProfile, error::SystemError> {
        self.user_repo
            .find_by_id(&user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    pub async fn get_friends(&self, user_id: Uuid) -> Result<Vec<UserProfile>, error::SystemError> {
        self.friend_repo.find_friends(&user_id).await
    }

    pub async fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<(), error::SystemError> {
        if !self.friend_repo.delete_friendship(&user_id, &friend_id).await? {
            return Err(error::SystemError::not_found("You are not friends with this user"));
        }
        tracing::debug!(user = %user_id, friend = %friend_id, "Friendship removed");
        Ok(())
    }

    pub async fn send_friend_request(
        &self,
        sender_id: Uuid,
        body: FriendRequestModel,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let receiver_id = body.recipient_id;
        if receiver_id == sender_id {
            return Err(error::SystemError::bad_request("Cannot send friend request to yourself"));
        }

        let (sender, _receiver) = tokio::try_join!(self.profile(sender_id), self.profile(receiver_id))?;

        let (are_friends, existing) = tokio::try_join!(
            self.friend_repo.are_friends(&sender_id, &receiver_id),
            self.friend_repo.find_request_between(&sender_id, &receiver_id),
        )?;

        if are_friends {
            return Err(error::SystemError::already_exists("Users are already friends"));
        }

        if let Some(request) = existing {
            if request.status == FriendRequestStatus::Pending {
                return Err(error::SystemError::already_exists("Friend request already exists"));
            }
        }

        let request = self
            .friend_repo
            .upsert_request(&sender_id, &receiver_id, &body.message, self.clock.now())
            .await?
            .ok_or_else(|| error::SystemError::already_exists("Friend request already exists"))?;

        self.registry.emit(
            receiver_id,
            &ServerMessage::FriendRequestReceived { request: request.clone(), from: sender },
        );

        Ok(request)
    }

    /// Accepting twice is a no-op: the friendship row is unique per pair.
    pub async fn accept_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<UserProfile, error::SystemError> {
        let request =
            self.friend_repo.accept_request_atomic(&request_id, &user_id, self.clock.now()).await?;

        let (requester, accepter) =
            tokio::try_join!(self.profile(request.from_user_id), self.profile(user_id))?;

        self.registry.emit(
            request.from_user_id,
            &ServerMessage::FriendRequestAccepted { request_id, friend: accepter },
        );

        Ok(requester)
    }

    pub async fn reject_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let request = self
            .friend_repo
            .find_request_by_id(&request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if request.to_user_id != user_id {
            return Err(error::SystemError::unauthorized(
                "You are not allowed to reject this friend request",
            ));
        }

        self.friend_repo
            .reject_request(&request_id, self.clock.now())
            .await?
            .ok_or_else(|| error::SystemError::invalid_state("Friend request is no longer pending"))
    }

    pub async fn get_friend_requests(
        &self,
        user_id: Uuid,
    ) -> Result<FriendRequestsResponse, error::SystemError> {
        let (incoming, outgoing) = tokio::try_join!(
            self.friend_repo.find_incoming_requests(&user_id),
            self.friend_repo.find_outgoing_requests(&user_id),
        )?;
        Ok(FriendRequestsResponse { incoming, outgoing })
    }

    pub async fn friendship_status(
        &self,
        user_id: Uuid,
        other_id: Uuid,
    ) -> Result<FriendshipStatus, error::SystemError> {
        if self.friend_repo.are_friends(&user_id, &other_id).await? {
            return Ok(FriendshipStatus::Friends);
        }

        let status = match self.friend_repo.find_request_between(&user_id, &other_id).await? {
            Some(r) if r.status == FriendRequestStatus::Pending && r.from_user_id == user_id => {
                FriendshipStatus::RequestSent
            }
            Some(r) if r.status == FriendRequestStatus::Pending => FriendshipStatus::RequestReceived,
            _ => FriendshipStatus::None,
        };
        Ok(status)
    }
}
