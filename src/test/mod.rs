#![allow(dead_code)]
//! In-memory repositories and a controllable clock for service tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::types::Json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        anonymous::{
            model::JoinOutcome,
            repository::{AnonymousChatRepository, Namer},
            schema::{AnonymousChatEntity, ChatLine, ChatParticipant, ChatStatus},
            service::AnonymousChatService,
        },
        expiry::{
            policy::{chat_ends_at, chat_retention_cutoff},
            reaper::ExpirySweep,
        },
        friend::{
            model::FriendRequestView,
            repository::{FriendRepo, FriendRepository, FriendRequestRepository},
            schema::{FriendRequestEntity, FriendRequestStatus},
            service::FriendService,
        },
        message::{
            model::InsertMessage,
            repository::MessageRepository,
            schema::{MessageEntity, Reaction},
            service::MessageService,
        },
        quiz::{
            model::{AnswerOutcome, InsertQuiz},
            repository::QuizRepository,
            schema::{CompatibilityScoreEntity, QuizAnswer, QuizEntity, QuizStatus},
            service::QuizService,
        },
        story::{
            model::InsertStory,
            repository::StoryRepository,
            schema::{StoryEntity, StoryView},
            service::StoryService,
        },
        streak::{
            repository::StreakRepository,
            schema::StreakEntity,
            service::StreakService,
            state::{self, SnapOutcome},
        },
        user::{model::UserProfile, repository::UserRepository, schema::UserEntity},
        websocket::{
            presence::PresenceService,
            registry::{ConnectionHandle, PresenceRegistry},
            state::AppState,
        },
    },
    utils::{Clock, UserPair},
};

/// Clock frozen at a known instant until a test moves it.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserEntity>,
    presence_writes: HashMap<Uuid, (bool, DateTime<Utc>)>,
    friends: HashSet<UserPair>,
    requests: Vec<FriendRequestEntity>,
    messages: Vec<MessageEntity>,
    stories: Vec<StoryEntity>,
    streaks: HashMap<UserPair, StreakEntity>,
    chats: Vec<AnonymousChatEntity>,
    quizzes: Vec<QuizEntity>,
    scores: HashMap<UserPair, CompatibilityScoreEntity>,
}

/// Every repository trait over one set of mutex-guarded tables. Each call
/// holds the lock for its whole body, which stands in for the row locks and
/// transactions of the Postgres adapters.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn insert_user(&self, username: &str, now: DateTime<Utc>) -> Uuid {
        let id = Uuid::now_v7();
        self.tables.lock().unwrap().users.insert(
            id,
            UserEntity {
                id,
                username: username.to_string(),
                display_name: username.to_string(),
                avatar_url: None,
                is_online: false,
                last_seen: None,
                snap_score: 0,
                created_at: now,
            },
        );
        id
    }

    pub fn insert_friendship(&self, a: Uuid, b: Uuid) {
        self.tables.lock().unwrap().friends.insert(UserPair::new(a, b));
    }

    pub fn profile(&self, id: Uuid) -> Option<UserProfile> {
        self.tables.lock().unwrap().users.get(&id).cloned().map(UserProfile::from)
    }

    pub fn message_count(&self) -> usize {
        self.tables.lock().unwrap().messages.len()
    }

    pub fn snap_score(&self, id: Uuid) -> i64 {
        self.tables.lock().unwrap().users.get(&id).map(|u| u.snap_score).unwrap_or_default()
    }

    /// Last presence write for the user, if any.
    pub fn presence(&self, id: Uuid) -> Option<(bool, DateTime<Utc>)> {
        self.tables.lock().unwrap().presence_writes.get(&id).copied()
    }

    pub fn chat_count(&self) -> usize {
        self.tables.lock().unwrap().chats.len()
    }

    pub fn quiz_count(&self) -> usize {
        self.tables.lock().unwrap().quizzes.len()
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().users.get(id).cloned())
    }

    async fn set_presence(
        &self,
        id: &Uuid,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<(), error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.get_mut(id) {
            user.is_online = is_online;
            user.last_seen = Some(last_seen);
        }
        tables.presence_writes.insert(*id, (is_online, last_seen));
        Ok(())
    }
}

#[async_trait::async_trait]
impl FriendRepository for MemoryStore {
    async fn are_friends(&self, user_a: &Uuid, user_b: &Uuid) -> Result<bool, error::SystemError> {
        Ok(self.tables.lock().unwrap().friends.contains(&UserPair::new(*user_a, *user_b)))
    }

    async fn find_friend_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .friends
            .iter()
            .filter(|pair| pair.low == *user_id || pair.high == *user_id)
            .map(|pair| if pair.low == *user_id { pair.high } else { pair.low })
            .collect())
    }

    async fn find_friends(&self, user_id: &Uuid) -> Result<Vec<UserProfile>, error::SystemError> {
        let ids = self.find_friend_ids(user_id).await?;
        let tables = self.tables.lock().unwrap();
        let mut friends: Vec<UserProfile> =
            ids.iter().filter_map(|id| tables.users.get(id).cloned().map(UserProfile::from)).collect();
        friends.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(friends)
    }

    async fn delete_friendship(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let pair = UserPair::new(*user_a, *user_b);
        let mut tables = self.tables.lock().unwrap();
        let removed = tables.friends.remove(&pair);
        tables.requests.retain(|r| UserPair::new(r.from_user_id, r.to_user_id) != pair);
        Ok(removed)
    }
}

impl MemoryStore {
    fn request_views(&self, user_id: Uuid, incoming: bool) -> Vec<FriendRequestView> {
        let tables = self.tables.lock().unwrap();
        let mut views: Vec<FriendRequestView> = tables
            .requests
            .iter()
            .filter(|r| r.status == FriendRequestStatus::Pending)
            .filter(|r| if incoming { r.to_user_id == user_id } else { r.from_user_id == user_id })
            .filter_map(|r| {
                let other = if incoming { r.from_user_id } else { r.to_user_id };
                let user = tables.users.get(&other).cloned().map(UserProfile::from)?;
                Some(FriendRequestView { request: r.clone(), user })
            })
            .collect();
        views.sort_by(|a, b| b.request.created_at.cmp(&a.request.created_at));
        views
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for MemoryStore {
    async fn find_request_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let pair = UserPair::new(*user_a, *user_b);
        let tables = self.tables.lock().unwrap();
        Ok(tables.requests.iter().find(|r| UserPair::new(r.from_user_id, r.to_user_id) == pair).cloned())
    }

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().requests.iter().find(|r| r.id == *request_id).cloned())
    }

    async fn find_incoming_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError> {
        Ok(self.request_views(*user_id, true))
    }

    async fn find_outgoing_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError> {
        Ok(self.request_views(*user_id, false))
    }

    async fn upsert_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
        message: &Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let pair = UserPair::new(*sender_id, *receiver_id);
        let mut tables = self.tables.lock().unwrap();

        match tables.requests.iter_mut().find(|r| UserPair::new(r.from_user_id, r.to_user_id) == pair) {
            Some(existing) if existing.status == FriendRequestStatus::Rejected => {
                existing.from_user_id = *sender_id;
                existing.to_user_id = *receiver_id;
                existing.message = message.clone();
                existing.status = FriendRequestStatus::Pending;
                existing.created_at = now;
                existing.responded_at = None;
                Ok(Some(existing.clone()))
            }
            Some(_) => Ok(None),
            None => {
                let request = FriendRequestEntity {
                    id: Uuid::now_v7(),
                    from_user_id: *sender_id,
                    to_user_id: *receiver_id,
                    message: message.clone(),
                    status: FriendRequestStatus::Pending,
                    created_at: now,
                    responded_at: None,
                };
                tables.requests.push(request.clone());
                Ok(Some(request))
            }
        }
    }

    async fn reject_request(
        &self,
        request_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let request = tables
            .requests
            .iter_mut()
            .find(|r| r.id == *request_id && r.status == FriendRequestStatus::Pending)
            .map(|r| {
                r.status = FriendRequestStatus::Rejected;
                r.responded_at = Some(now);
                r.clone()
            });
        Ok(request)
    }
}

#[async_trait::async_trait]
impl FriendRepo for MemoryStore {
    async fn accept_request_atomic(
        &self,
        request_id: &Uuid,
        user_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let request = tables
            .requests
            .iter_mut()
            .find(|r| r.id == *request_id)
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if request.to_user_id != *user_id {
            return Err(error::SystemError::unauthorized(
                "You are not allowed to accept this friend request",
            ));
        }
        if request.status == FriendRequestStatus::Rejected {
            return Err(error::SystemError::invalid_state("Friend request was rejected"));
        }

        request.status = FriendRequestStatus::Accepted;
        request.responded_at.get_or_insert(now);
        let request = request.clone();

        tables.friends.insert(UserPair::new(request.from_user_id, request.to_user_id));
        Ok(request)
    }
}

#[async_trait::async_trait]
impl MessageRepository for MemoryStore {
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, error::SystemError> {
        let entity = MessageEntity {
            id: Uuid::now_v7(),
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            kind: message.kind,
            content: message.content.clone(),
            media_url: message.media_url.clone(),
            is_snap: message.kind.is_snap(),
            is_read: false,
            read_at: None,
            viewed_at: None,
            expires_at: message.expires_at,
            reactions: Json(vec![]),
            created_at: message.created_at,
        };
        let mut tables = self.tables.lock().unwrap();
        if entity.is_snap {
            if let Some(user) = tables.users.get_mut(&entity.sender_id) {
                user.snap_score += 1;
            }
        }
        tables.messages.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().messages.iter().find(|m| m.id == *id).cloned())
    }

    async fn mark_read(
        &self,
        id: &Uuid,
        read_at: DateTime<Utc>,
        view_expires_at: DateTime<Utc>,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(message) = tables.messages.iter_mut().find(|m| m.id == *id) else {
            return Ok(None);
        };
        if message.is_snap && message.viewed_at.is_some() {
            return Ok(None);
        }

        message.is_read = true;
        message.read_at.get_or_insert(read_at);
        if message.is_snap {
            message.viewed_at = Some(read_at);
            message.expires_at = Some(view_expires_at);
        }
        let message = message.clone();
        if message.is_snap {
            if let Some(user) = tables.users.get_mut(&message.recipient_id) {
                user.snap_score += 1;
            }
        }
        Ok(Some(message))
    }

    async fn find_conversation(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        let tables = self.tables.lock().unwrap();
        let mut messages: Vec<MessageEntity> = tables
            .messages
            .iter()
            .filter(|m| m.involves(*user_a) && m.involves(*user_b))
            .filter(|m| !m.is_snap || m.is_live(now))
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));

        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn upsert_reaction(
        &self,
        id: &Uuid,
        reaction: &Reaction,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let message = tables.messages.iter_mut().find(|m| m.id == *id).map(|m| {
            m.reactions.retain(|r| r.user_id != reaction.user_id);
            m.reactions.push(reaction.clone());
            m.clone()
        });
        Ok(message)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.messages.len();
        tables.messages.retain(|m| m.id != *id);
        Ok(tables.messages.len() < before)
    }
}

#[async_trait::async_trait]
impl StoryRepository for MemoryStore {
    async fn create(&self, story: &InsertStory) -> Result<StoryEntity, error::SystemError> {
        let entity = StoryEntity {
            id: Uuid::now_v7(),
            user_id: story.user_id,
            media_url: story.media_url.clone(),
            kind: story.kind,
            caption: story.caption.clone(),
            views: Json(vec![]),
            expires_at: story.expires_at,
            created_at: story.created_at,
        };
        self.tables.lock().unwrap().stories.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<StoryEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().stories.iter().find(|s| s.id == *id).cloned())
    }

    async fn find_live_by_owners(
        &self,
        owner_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<StoryEntity>, error::SystemError> {
        let tables = self.tables.lock().unwrap();
        let mut stories: Vec<StoryEntity> = tables
            .stories
            .iter()
            .filter(|s| owner_ids.contains(&s.user_id) && s.is_live(now))
            .cloned()
            .collect();
        stories.sort_by_key(|s| std::cmp::Reverse((s.created_at, s.id)));
        Ok(stories)
    }

    async fn add_view(
        &self,
        id: &Uuid,
        view: &StoryView,
    ) -> Result<Option<StoryEntity>, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let story = tables.stories.iter_mut().find(|s| s.id == *id).map(|s| {
            if !s.viewed_by(view.viewer_id) {
                s.views.push(view.clone());
            }
            s.clone()
        });
        Ok(story)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.stories.len();
        tables.stories.retain(|s| s.id != *id);
        Ok(tables.stories.len() < before)
    }
}

#[async_trait::async_trait]
impl StreakRepository for MemoryStore {
    async fn find(&self, pair: &UserPair) -> Result<Option<StreakEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().streaks.get(pair).cloned())
    }

    async fn record_snap_atomic(
        &self,
        caller: &Uuid,
        partner: &Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(StreakEntity, SnapOutcome), error::SystemError> {
        let pair = UserPair::new(*caller, *partner);
        let mut tables = self.tables.lock().unwrap();
        let streak = tables.streaks.entry(pair).or_insert_with(|| StreakEntity::empty(pair, now));
        let outcome = state::record_snap(streak, *caller, *partner, today, now);
        Ok((streak.clone(), outcome))
    }
}

#[async_trait::async_trait]
impl AnonymousChatRepository for MemoryStore {
    async fn join_queue_atomic(
        &self,
        user_id: &Uuid,
        now: DateTime<Utc>,
        namer: Namer,
    ) -> Result<JoinOutcome, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.chats.iter().any(|c| c.holds(*user_id, now)) {
            return Err(error::SystemError::already_in_chat("You are already in a chat"));
        }

        let waiting = tables
            .chats
            .iter_mut()
            .filter(|c| {
                c.status == ChatStatus::Waiting && c.is_retained(now) && c.participants.len() == 1
            })
            .min_by_key(|c| c.created_at);

        if let Some(chat) = waiting {
            let taken: Vec<String> = chat.participants.iter().map(|p| p.pseudonym.clone()).collect();
            chat.participants.push(ChatParticipant { user_id: *user_id, pseudonym: namer(&taken) });
            chat.status = ChatStatus::Active;
            chat.started_at = Some(now);
            chat.ends_at = Some(chat_ends_at(now));
            return Ok(JoinOutcome { chat: chat.clone(), matched: true });
        }

        let chat = AnonymousChatEntity {
            id: Uuid::now_v7(),
            status: ChatStatus::Waiting,
            participants: Json(vec![ChatParticipant { user_id: *user_id, pseudonym: namer(&[]) }]),
            messages: Json(vec![]),
            started_at: None,
            ends_at: None,
            ended_at: None,
            created_at: now,
        };
        tables.chats.push(chat.clone());
        Ok(JoinOutcome { chat, matched: false })
    }

    async fn leave_queue(&self, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.chats.len();
        tables.chats.retain(|c| {
            !(c.status == ChatStatus::Waiting
                && c.participants.len() == 1
                && c.participants[0].user_id == *user_id)
        });
        Ok(tables.chats.len() < before)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<AnonymousChatEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().chats.iter().find(|c| c.id == *id).cloned())
    }

    async fn end_chat(
        &self,
        id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AnonymousChatEntity>, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let chat = tables.chats.iter_mut().find(|c| c.id == *id).map(|c| {
            c.status = ChatStatus::Ended;
            c.ended_at.get_or_insert(now);
            c.clone()
        });
        Ok(chat)
    }

    async fn append_message(
        &self,
        id: &Uuid,
        line: &ChatLine,
    ) -> Result<Option<AnonymousChatEntity>, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let chat = tables
            .chats
            .iter_mut()
            .find(|c| {
                c.id == *id
                    && c.status == ChatStatus::Active
                    && c.ends_at.is_some_and(|ends_at| ends_at > line.sent_at)
            })
            .map(|c| {
                c.messages.push(line.clone());
                c.clone()
            });
        Ok(chat)
    }
}

#[async_trait::async_trait]
impl QuizRepository for MemoryStore {
    async fn create(&self, quiz: &InsertQuiz) -> Result<QuizEntity, error::SystemError> {
        let entity = QuizEntity {
            id: Uuid::now_v7(),
            creator_id: quiz.creator_id,
            partner_id: quiz.partner_id,
            kind: quiz.kind,
            question: quiz.question.clone(),
            options: Json(quiz.options.clone()),
            answers: Json(vec![]),
            status: QuizStatus::Waiting,
            is_random: quiz.is_random,
            truth_or_dare_choice: quiz.truth_or_dare_choice,
            revealed_at: None,
            expires_at: Some(quiz.expires_at),
            created_at: quiz.created_at,
        };
        self.tables.lock().unwrap().quizzes.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<QuizEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().quizzes.iter().find(|q| q.id == *id).cloned())
    }

    async fn answer_atomic(
        &self,
        quiz_id: &Uuid,
        answer: QuizAnswer,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, error::SystemError> {
        let mut tables = self.tables.lock().unwrap();
        let quiz = tables
            .quizzes
            .iter_mut()
            .find(|q| q.id == *quiz_id)
            .ok_or_else(|| error::SystemError::not_found("Quiz not found"))?;

        let revealed = quiz.apply_answer(answer, now)?;
        let quiz = quiz.clone();

        let score = if revealed {
            let pair = quiz.pair();
            let score = tables
                .scores
                .entry(pair)
                .or_insert_with(|| CompatibilityScoreEntity::empty(pair, now));
            score.record(quiz.kind.category(), quiz.answers_match().unwrap_or(false), now);
            Some(score.clone())
        } else {
            None
        };

        Ok(AnswerOutcome { quiz, revealed, score })
    }

    async fn find_score(
        &self,
        pair: &UserPair,
    ) -> Result<Option<CompatibilityScoreEntity>, error::SystemError> {
        Ok(self.tables.lock().unwrap().scores.get(pair).cloned())
    }

    async fn find_revealed(
        &self,
        pair: &UserPair,
        limit: i64,
    ) -> Result<Vec<QuizEntity>, error::SystemError> {
        let tables = self.tables.lock().unwrap();
        let mut quizzes: Vec<QuizEntity> = tables
            .quizzes
            .iter()
            .filter(|q| q.status == QuizStatus::Revealed && q.pair() == *pair)
            .cloned()
            .collect();
        quizzes.sort_by_key(|q| std::cmp::Reverse(q.revealed_at));
        quizzes.truncate(limit as usize);
        Ok(quizzes)
    }
}

#[async_trait::async_trait]
impl ExpirySweep for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, error::SystemError> {
        let cutoff = chat_retention_cutoff(now);
        let mut tables = self.tables.lock().unwrap();
        let before = tables.messages.len() + tables.stories.len() + tables.chats.len() + tables.quizzes.len();

        tables.messages.retain(|m| !m.is_snap || m.is_live(now));
        tables.stories.retain(|s| s.is_live(now));
        tables.chats.retain(|c| c.created_at > cutoff);
        tables.quizzes.retain(|q| q.effective_status(now) != QuizStatus::Expired);

        let after = tables.messages.len() + tables.stories.len() + tables.chats.len() + tables.quizzes.len();
        Ok((before - after) as u64)
    }
}

/// Services wired to one [`MemoryStore`] and one [`FixedClock`].
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub registry: PresenceRegistry,
    pub presence: PresenceService,
    pub friends: FriendService,
    pub messages: MessageService,
    pub stories: StoryService,
    pub streaks: StreakService,
    pub anonymous: AnonymousChatService,
    pub quizzes: QuizService,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(FixedClock::default());
        let registry = PresenceRegistry::new();

        let streaks = StreakService::with_dependencies(
            store.clone(),
            store.clone(),
            clock.clone(),
            chrono::FixedOffset::east_opt(0).unwrap(),
        );

        TestApp {
            presence: PresenceService::with_dependencies(registry.clone(), store.clone(), clock.clone()),
            friends: FriendService::with_dependencies(
                store.clone(),
                store.clone(),
                registry.clone(),
                clock.clone(),
            ),
            messages: MessageService::with_dependencies(
                store.clone(),
                store.clone(),
                store.clone(),
                streaks.clone(),
                registry.clone(),
                clock.clone(),
            ),
            stories: StoryService::with_dependencies(store.clone(), store.clone(), clock.clone()),
            anonymous: AnonymousChatService::with_dependencies(store.clone(), registry.clone(), clock.clone()),
            quizzes: QuizService::with_dependencies(
                store.clone(),
                store.clone(),
                store.clone(),
                registry.clone(),
                clock.clone(),
            ),
            streaks,
            store,
            clock,
            registry,
        }
    }

    pub fn user(&self, username: &str) -> Uuid {
        self.store.insert_user(username, self.clock.now())
    }

    pub fn profile(&self, id: Uuid) -> UserProfile {
        self.store.profile(id).unwrap()
    }

    pub async fn befriend(&self, a: Uuid, b: Uuid) {
        self.store.insert_friendship(a, b);
    }

    /// Registers a bare connection, skipping the presence broadcast.
    pub fn connect(&self, user_id: Uuid) -> (ConnectionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);
        self.registry.register(user_id, handle.clone());
        (handle, rx)
    }

    pub fn state(&self) -> AppState {
        AppState {
            presence: self.presence.clone(),
            friends: self.friends.clone(),
            messages: self.messages.clone(),
            stories: self.stories.clone(),
            streaks: self.streaks.clone(),
            anonymous: self.anonymous.clone(),
            quizzes: self.quizzes.clone(),
        }
    }
}

/// Drains everything queued on the connection and returns the `type` of each event.
pub fn event_types(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut types = Vec::new();
    while let Ok(raw) = rx.try_recv() {
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        types.push(value["type"].as_str().unwrap_or_default().to_string());
    }
    types
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::modules::expiry::reaper::ExpiryReaper;
    use crate::modules::message::{model::SendMessageModel, schema::MessageKind};

    #[tokio::test]
    async fn test_reaper_purges_only_expired_records() {
        let app = TestApp::new();
        let a = app.user("alice");
        let b = app.user("bob");
        app.befriend(a, b).await;

        let snap = SendMessageModel {
            recipient_id: b,
            kind: MessageKind::Snap,
            content: None,
            media_url: Some("https://cdn.example.com/s.jpg".to_string()),
        };
        let text = SendMessageModel {
            recipient_id: b,
            kind: MessageKind::Text,
            content: Some("kept forever".to_string()),
            media_url: None,
        };
        let viewed = app.messages.send_message(a, snap.clone()).await.unwrap();
        app.messages.send_message(a, snap).await.unwrap();
        app.messages.send_message(a, text).await.unwrap();
        app.messages.mark_read(viewed.id, b).await.unwrap();
        app.anonymous.join_queue(a).await.unwrap();
        app.quizzes.send_random_quiz(a, b).await.unwrap();

        let reaper = ExpiryReaper::new(
            vec![app.store.clone() as Arc<dyn ExpirySweep>],
            app.clock.clone(),
            std::time::Duration::from_secs(60),
        );

        app.clock.advance(Duration::seconds(10));
        assert_eq!(reaper.sweep_once().await, 1);
        assert_eq!(app.store.message_count(), 2);

        app.clock.advance(Duration::hours(24));
        assert_eq!(reaper.sweep_once().await, 3);
        assert_eq!(app.store.message_count(), 1);
        assert_eq!(app.store.chat_count(), 0);
        assert_eq!(app.store.quiz_count(), 0);
    }
}
