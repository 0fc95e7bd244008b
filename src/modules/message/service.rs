use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        expiry::policy,
        friend::{repository::FriendRepo, service::require_friendship},
        message::{
            celebration,
            model::{CallSignal, InsertMessage, ReactionModel, SendMessageModel},
            repository::MessageRepository,
            schema::{MessageEntity, MessageKind, Reaction},
        },
        streak::service::StreakService,
        user::{model::UserProfile, repository::UserRepository},
        websocket::{message::ServerMessage, registry::PresenceRegistry},
    },
    utils::Clock,
};

const CONVERSATION_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository + Send + Sync>,
    friend_repo: Arc<dyn FriendRepo>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    streaks: StreakService,
    registry: PresenceRegistry,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn with_dependencies(
        message_repo: Arc<dyn MessageRepository + Send + Sync>,
        friend_repo: Arc<dyn FriendRepo>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        streaks: StreakService,
        registry: PresenceRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        MessageService { message_repo, friend_repo, user_repo, streaks, registry, clock }
    }

    async fn find_live(&self, message_id: Uuid) -> Result<MessageEntity, error::SystemError> {
        let now = self.clock.now();
        self.message_repo
            .find_by_id(&message_id)
            .await?
            .filter(|m| m.is_live(now))
            .ok_or_else(|| error::SystemError::not_found("Message not found"))
    }

    pub async fn send_message(
        &self,
        sender_id: Uuid,
        body: SendMessageModel,
    ) -> Result<MessageEntity, error::SystemError> {
        let recipient_id = body.recipient_id;
        require_friendship(
            &*self.friend_repo,
            sender_id,
            recipient_id,
            "You can only message your friends",
        )
        .await?;

        if body.kind.is_snap() && body.media_url.is_none() {
            return Err(error::SystemError::bad_request("Snaps need a media URL"));
        }
        if body.content.is_none() && body.media_url.is_none() {
            return Err(error::SystemError::bad_request("Message needs content or media"));
        }

        let now = self.clock.now();
        let is_snap = body.kind.is_snap();

        // Idempotent within a day; must precede the insert.
        if is_snap {
            self.streaks.record_snap(sender_id, recipient_id).await?;
        }

        let message = self
            .message_repo
            .create(&InsertMessage {
                sender_id,
                recipient_id,
                kind: body.kind,
                content: body.content,
                media_url: body.media_url,
                expires_at: is_snap.then(|| policy::snap_expiry(now)),
                created_at: now,
            })
            .await?;

        let delivered =
            self.registry.emit(recipient_id, &ServerMessage::NewMessage { message: message.clone() });
        if delivered {
            self.registry.emit(
                sender_id,
                &ServerMessage::MessageDelivered { message_id: message.id, delivered_at: now },
            );
        }
        self.registry.emit(sender_id, &ServerMessage::MessageSent { message: message.clone() });

        let celebrate = message.kind == MessageKind::Text
            && message.content.as_deref().is_some_and(celebration::is_celebratory);
        if celebrate {
            self.registry.emit(sender_id, &ServerMessage::CelebrationTrigger);
            self.registry.emit(recipient_id, &ServerMessage::CelebrationTrigger);
        }

        Ok(message)
    }

    /// Opening a snap starts its short countdown. A snap already opened is
    /// returned as stored.
    pub async fn mark_read(
        &self,
        message_id: Uuid,
        reader_id: Uuid,
    ) -> Result<MessageEntity, error::SystemError> {
        let message = self.find_live(message_id).await?;
        if message.recipient_id != reader_id {
            return Err(error::SystemError::unauthorized("Only the recipient can read this message"));
        }

        let now = self.clock.now();
        let updated = match self
            .message_repo
            .mark_read(&message_id, now, policy::viewed_snap_expiry(now))
            .await?
        {
            Some(updated) => updated,
            None => return Ok(message),
        };

        self.registry.emit(
            updated.sender_id,
            &ServerMessage::MessageReadReceipt {
                message_id,
                read_at: updated.read_at.unwrap_or(now),
            },
        );

        Ok(updated)
    }

    pub async fn list_conversation(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        require_friendship(
            &*self.friend_repo,
            user_id,
            partner_id,
            "You can only read conversations with friends",
        )
        .await?;

        self.message_repo
            .find_conversation(&user_id, &partner_id, self.clock.now(), CONVERSATION_LIMIT)
            .await
    }

    pub async fn add_reaction(
        &self,
        user_id: Uuid,
        body: ReactionModel,
    ) -> Result<MessageEntity, error::SystemError> {
        let message = self.find_live(body.message_id).await?;
        if !message.involves(user_id) {
            return Err(error::SystemError::unauthorized("You cannot react to this message"));
        }

        let reaction = Reaction { user_id, emoji: body.emoji, created_at: self.clock.now() };
        let updated = self
            .message_repo
            .upsert_reaction(&message.id, &reaction)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        let other = if updated.sender_id == user_id { updated.recipient_id } else { updated.sender_id };
        self.registry.emit(
            other,
            &ServerMessage::ReactionAdded {
                message_id: updated.id,
                user_id,
                emoji: reaction.emoji,
                reactions: updated.reactions.0.clone(),
            },
        );
        self.registry.emit(
            user_id,
            &ServerMessage::ReactionConfirmed {
                message_id: updated.id,
                reactions: updated.reactions.0.clone(),
            },
        );

        Ok(updated)
    }

    pub async fn delete_message(&self, message_id: Uuid, user_id: Uuid) -> Result<(), error::SystemError> {
        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if message.sender_id != user_id {
            return Err(error::SystemError::unauthorized("Only the sender can delete this message"));
        }

        if self.message_repo.delete(&message_id).await? {
            self.registry.emit(message.recipient_id, &ServerMessage::MessageDeleted { message_id });
        }
        Ok(())
    }

    /// Typing indicators are relayed only, never stored.
    pub async fn typing(
        &self,
        user_id: Uuid,
        recipient_id: Uuid,
        started: bool,
    ) -> Result<(), error::SystemError> {
        require_friendship(&*self.friend_repo, user_id, recipient_id, "You can only message your friends")
            .await?;

        let event = if started {
            ServerMessage::UserTyping { user_id }
        } else {
            ServerMessage::UserStoppedTyping { user_id }
        };
        self.registry.emit(recipient_id, &event);
        Ok(())
    }

    pub async fn poke(&self, user_id: Uuid, recipient_id: Uuid) -> Result<(), error::SystemError> {
        require_friendship(&*self.friend_repo, user_id, recipient_id, "You can only poke friends")
            .await?;

        let from_name = self
            .user_repo
            .find_by_id(&user_id)
            .await?
            .map(|u| u.display_name)
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let event =
            ServerMessage::ReceivePoke { from: user_id, from_name, timestamp: self.clock.now() };
        if !self.registry.emit(recipient_id, &event) {
            return Err(error::SystemError::invalid_state("User is offline"));
        }
        Ok(())
    }

    pub async fn screenshot_taken(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> Result<(), error::SystemError> {
        require_friendship(&*self.friend_repo, user_id, partner_id, "You can only message your friends")
            .await?;

        self.registry.emit(
            partner_id,
            &ServerMessage::PartnerScreenshot {
                user_id,
                timestamp: self.clock.now(),
                message: "Your partner took a screenshot".to_string(),
            },
        );
        Ok(())
    }

    /// Relays one call-signalling step to a friend. The payloads are opaque
    /// to the server. Returns whether the friend was connected.
    pub async fn relay_call(
        &self,
        user_id: Uuid,
        recipient_id: Uuid,
        signal: CallSignal,
    ) -> Result<bool, error::SystemError> {
        require_friendship(&*self.friend_repo, user_id, recipient_id, "You can only call your friends")
            .await?;

        let event = match signal {
            CallSignal::Offer(offer) => {
                let from_data = self
                    .user_repo
                    .find_by_id(&user_id)
                    .await?
                    .map(UserProfile::from)
                    .ok_or_else(|| error::SystemError::not_found("User not found"))?;
                ServerMessage::IncomingCall { from: user_id, from_data, offer }
            }
            CallSignal::Answer(answer) => ServerMessage::CallAnswered { from: user_id, answer },
            CallSignal::Candidate(candidate) => {
                ServerMessage::IceCandidate { from: user_id, candidate }
            }
            CallSignal::End => ServerMessage::CallEnded { from: user_id },
        };

        let delivered = self.registry.emit(recipient_id, &event);
        if !delivered {
            tracing::debug!(from = %user_id, to = %recipient_id, "Call signal dropped, recipient offline");
        }
        Ok(delivered)
    }
}
