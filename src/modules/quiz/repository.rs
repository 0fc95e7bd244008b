use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::error;
use crate::modules::quiz::{
    model::{AnswerOutcome, InsertQuiz},
    schema::{CompatibilityScoreEntity, QuizAnswer, QuizEntity},
};
use crate::utils::UserPair;

#[async_trait::async_trait]
pub trait QuizRepository {
    async fn create(&self, quiz: &InsertQuiz) -> Result<QuizEntity, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<QuizEntity>, error::SystemError>;

    /// Applies the answer under lock; when it reveals the quiz the pair's
    /// compatibility score is updated in the same transaction.
    async fn answer_atomic(
        &self,
        quiz_id: &Uuid,
        answer: QuizAnswer,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, error::SystemError>;

    async fn find_score(
        &self,
        pair: &UserPair,
    ) -> Result<Option<CompatibilityScoreEntity>, error::SystemError>;

    /// Revealed quizzes of the pair, most recently revealed first.
    async fn find_revealed(
        &self,
        pair: &UserPair,
        limit: i64,
    ) -> Result<Vec<QuizEntity>, error::SystemError>;
}
