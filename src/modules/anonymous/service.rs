use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        anonymous::{
            model::{AnonymousMessageModel, ChatView},
            pseudonym,
            repository::AnonymousChatRepository,
            schema::{AnonymousChatEntity, ChatLine, ChatStatus},
        },
        websocket::{message::ServerMessage, registry::PresenceRegistry},
    },
    utils::Clock,
};

#[derive(Clone)]
pub struct AnonymousChatService {
    chat_repo: Arc<dyn AnonymousChatRepository + Send + Sync>,
    registry: PresenceRegistry,
    clock: Arc<dyn Clock>,
}

impl AnonymousChatService {
    pub fn with_dependencies(
        chat_repo: Arc<dyn AnonymousChatRepository + Send + Sync>,
        registry: PresenceRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AnonymousChatService { chat_repo, registry, clock }
    }

    /// Loads a chat the user takes part in. Chats past their retention window
    /// are treated as gone.
    async fn find_for_participant(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<AnonymousChatEntity, error::SystemError> {
        let now = self.clock.now();
        let chat = self
            .chat_repo
            .find_by_id(&chat_id)
            .await?
            .filter(|c| c.is_retained(now))
            .ok_or_else(|| error::SystemError::not_found("Chat not found"))?;

        if chat.participant(user_id).is_none() {
            return Err(error::SystemError::unauthorized("You are not part of this chat"));
        }
        Ok(chat)
    }

    pub async fn join_queue(&self, user_id: Uuid) -> Result<ChatView, error::SystemError> {
        let now = self.clock.now();
        let outcome = self.chat_repo.join_queue_atomic(&user_id, now, pseudonym::generate_unique).await?;
        let chat = outcome.chat;

        if outcome.matched {
            let joiner_name =
                chat.participant(user_id).map(|p| p.pseudonym.clone()).unwrap_or_default();
            if let Some(waiting) = chat.partner_of(user_id) {
                self.registry.emit(
                    waiting.user_id,
                    &ServerMessage::ChatMatched {
                        chat_id: chat.id,
                        partner_name: joiner_name,
                        ends_at: chat.ends_at,
                    },
                );
            }
            log::info!("Anonymous chat {} matched", chat.id);
        }

        Ok(ChatView::for_user(&chat, user_id, now))
    }

    /// No-op unless the user is still waiting alone.
    pub async fn leave_queue(&self, user_id: Uuid) -> Result<bool, error::SystemError> {
        self.chat_repo.leave_queue(&user_id).await
    }

    pub async fn get_chat(&self, chat_id: Uuid, user_id: Uuid) -> Result<ChatView, error::SystemError> {
        let chat = self.find_for_participant(chat_id, user_id).await?;
        Ok(ChatView::for_user(&chat, user_id, self.clock.now()))
    }

    pub async fn end_chat(&self, chat_id: Uuid, user_id: Uuid) -> Result<ChatView, error::SystemError> {
        self.find_for_participant(chat_id, user_id).await?;

        let now = self.clock.now();
        let chat = self
            .chat_repo
            .end_chat(&chat_id, now)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Chat not found"))?;

        if let Some(partner) = chat.partner_of(user_id) {
            self.registry.emit(partner.user_id, &ServerMessage::ChatEnded { chat_id });
        }

        Ok(ChatView::for_user(&chat, user_id, now))
    }

    pub async fn send_message(
        &self,
        user_id: Uuid,
        body: AnonymousMessageModel,
    ) -> Result<ChatView, error::SystemError> {
        let chat = self.find_for_participant(body.chat_id, user_id).await?;
        let now = self.clock.now();

        if chat.effective_status(now) != ChatStatus::Active {
            return Err(error::SystemError::invalid_state("Chat is not active"));
        }

        let sender_name = chat.participant(user_id).map(|p| p.pseudonym.clone()).unwrap_or_default();
        let line = ChatLine { sender_id: user_id, sender_name, content: body.content, sent_at: now };

        let chat = self
            .chat_repo
            .append_message(&chat.id, &line)
            .await?
            .ok_or_else(|| error::SystemError::invalid_state("Chat is not active"))?;

        if let Some(partner) = chat.partner_of(user_id) {
            self.registry.emit(
                partner.user_id,
                &ServerMessage::AnonymousMessage {
                    chat_id: chat.id,
                    sender_name: line.sender_name,
                    content: line.content,
                    timestamp: now,
                },
            );
        }

        Ok(ChatView::for_user(&chat, user_id, now))
    }

    pub fn conversation_starters(&self) -> Vec<String> {
        pseudonym::conversation_starters()
    }
}
