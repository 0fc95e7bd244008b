use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        expiry::policy,
        friend::{repository::FriendRepo, service::require_friendship},
        quiz::{
            model::{AnswerQuizModel, CreateQuizModel, InsertQuiz, TruthOrDareModel},
            prompts::{self, QuizPrompt},
            repository::QuizRepository,
            schema::{CompatibilityScoreEntity, QuizAnswer, QuizEntity, TruthOrDare},
        },
        user::repository::UserRepository,
        websocket::{message::ServerMessage, registry::PresenceRegistry},
    },
    utils::{Clock, UserPair},
};

const REVEALED_HISTORY_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct QuizService {
    quiz_repo: Arc<dyn QuizRepository + Send + Sync>,
    friend_repo: Arc<dyn FriendRepo>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    registry: PresenceRegistry,
    clock: Arc<dyn Clock>,
}

impl QuizService {
    pub fn with_dependencies(
        quiz_repo: Arc<dyn QuizRepository + Send + Sync>,
        friend_repo: Arc<dyn FriendRepo>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        registry: PresenceRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        QuizService { quiz_repo, friend_repo, user_repo, registry, clock }
    }

    async fn send(
        &self,
        creator_id: Uuid,
        partner_id: Uuid,
        prompt: QuizPrompt,
        is_random: bool,
        truth_or_dare_choice: Option<TruthOrDare>,
    ) -> Result<QuizEntity, error::SystemError> {
        require_friendship(
            &*self.friend_repo,
            creator_id,
            partner_id,
            "You can only send quizzes to friends",
        )
        .await?;

        let now = self.clock.now();
        let quiz = self
            .quiz_repo
            .create(&InsertQuiz {
                creator_id,
                partner_id,
                kind: prompt.kind,
                question: prompt.question,
                options: prompt.options,
                is_random,
                truth_or_dare_choice,
                expires_at: policy::quiz_expiry(now),
                created_at: now,
            })
            .await?;

        self.registry.emit(partner_id, &ServerMessage::NewQuiz { quiz: quiz.clone() });
        Ok(quiz)
    }

    pub async fn create_quiz(
        &self,
        creator_id: Uuid,
        body: CreateQuizModel,
    ) -> Result<QuizEntity, error::SystemError> {
        if body.question.trim().is_empty() {
            return Err(error::SystemError::bad_request("Question cannot be empty"));
        }
        let prompt = QuizPrompt { kind: body.kind, question: body.question, options: body.options };
        self.send(creator_id, body.partner_id, prompt, false, None).await
    }

    pub async fn send_random_quiz(
        &self,
        creator_id: Uuid,
        partner_id: Uuid,
    ) -> Result<QuizEntity, error::SystemError> {
        self.send(creator_id, partner_id, prompts::random_quiz(), true, None).await
    }

    pub async fn send_truth_or_dare(
        &self,
        creator_id: Uuid,
        body: TruthOrDareModel,
    ) -> Result<QuizEntity, error::SystemError> {
        let prompt = prompts::truth_or_dare(body.choice);
        self.send(creator_id, body.partner_id, prompt, false, Some(body.choice)).await
    }

    pub async fn answer_quiz(
        &self,
        user_id: Uuid,
        body: AnswerQuizModel,
    ) -> Result<QuizEntity, error::SystemError> {
        let quiz = self
            .quiz_repo
            .find_by_id(&body.quiz_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Quiz not found"))?;

        if !quiz.involves(user_id) {
            return Err(error::SystemError::unauthorized("You are not part of this quiz"));
        }

        let now = self.clock.now();
        let answer = QuizAnswer { user_id, answer: body.answer, answered_at: now };
        let outcome = self.quiz_repo.answer_atomic(&quiz.id, answer, now).await?;
        let quiz = outcome.quiz;
        let other = quiz.other_participant(user_id);

        if outcome.revealed {
            let reveal = ServerMessage::QuizReveal {
                quiz_id: quiz.id,
                question: quiz.question.clone(),
                answers: quiz.answers.0.clone(),
                matched: quiz.answers_match().unwrap_or(false),
            };
            self.registry.emit(user_id, &reveal);
            self.registry.emit(other, &reveal);

            if let Some(score) = &outcome.score {
                log::debug!("Compatibility for quiz {} is now {}", quiz.id, score.score);
            }
        } else {
            let partner_name = self
                .user_repo
                .find_by_id(&user_id)
                .await?
                .map(|u| u.display_name)
                .unwrap_or_default();
            self.registry.emit(
                other,
                &ServerMessage::QuizPartnerAnswered { quiz_id: quiz.id, partner_name },
            );
        }

        Ok(quiz)
    }

    pub async fn get_quiz(&self, quiz_id: Uuid, user_id: Uuid) -> Result<QuizEntity, error::SystemError> {
        let now = self.clock.now();
        let mut quiz = self
            .quiz_repo
            .find_by_id(&quiz_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Quiz not found"))?;

        if !quiz.involves(user_id) {
            return Err(error::SystemError::unauthorized("You are not part of this quiz"));
        }

        quiz.status = quiz.effective_status(now);
        Ok(quiz)
    }

    /// Zeroed score when the pair has not revealed any quiz yet.
    pub async fn get_compatibility(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> Result<CompatibilityScoreEntity, error::SystemError> {
        require_friendship(&*self.friend_repo, user_id, partner_id, "You can only compare with friends")
            .await?;

        let pair = UserPair::new(user_id, partner_id);
        let score = self.quiz_repo.find_score(&pair).await?;
        Ok(score.unwrap_or_else(|| CompatibilityScoreEntity::empty(pair, self.clock.now())))
    }

    pub async fn list_revealed_quizzes(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> Result<Vec<QuizEntity>, error::SystemError> {
        require_friendship(
            &*self.friend_repo,
            user_id,
            partner_id,
            "You can only read quizzes with friends",
        )
        .await?;

        let pair = UserPair::new(user_id, partner_id);
        self.quiz_repo.find_revealed(&pair, REVEALED_HISTORY_LIMIT).await
    }
}
