use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        expiry::reaper::ExpirySweep,
        quiz::{
            model::{AnswerOutcome, InsertQuiz},
            repository::QuizRepository,
            schema::{CompatibilityScoreEntity, QuizAnswer, QuizEntity},
        },
    },
    utils::UserPair,
};

#[derive(Clone)]
pub struct QuizRepositoryPg {
    pool: sqlx::PgPool,
}

impl QuizRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuizRepository for QuizRepositoryPg {
    async fn create(&self, quiz: &InsertQuiz) -> Result<QuizEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, QuizEntity>(
            r#"
            INSERT INTO quizzes
                (id, creator_id, partner_id, kind, question, options, status, is_random,
                 truth_or_dare_choice, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'waiting', $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(quiz.creator_id)
        .bind(quiz.partner_id)
        .bind(quiz.kind)
        .bind(&quiz.question)
        .bind(Json(&quiz.options))
        .bind(quiz.is_random)
        .bind(quiz.truth_or_dare_choice)
        .bind(quiz.expires_at)
        .bind(quiz.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<QuizEntity>, error::SystemError> {
        let quiz = sqlx::query_as::<_, QuizEntity>("SELECT * FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quiz)
    }

    async fn answer_atomic(
        &self,
        quiz_id: &Uuid,
        answer: QuizAnswer,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let mut quiz =
            sqlx::query_as::<_, QuizEntity>("SELECT * FROM quizzes WHERE id = $1 FOR UPDATE")
                .bind(quiz_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| error::SystemError::not_found("Quiz not found"))?;

        let revealed = match quiz.apply_answer(answer, now) {
            Ok(revealed) => revealed,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };

        sqlx::query(
            r#"
            UPDATE quizzes
            SET answers = $2, status = $3, revealed_at = $4, expires_at = $5
            WHERE id = $1
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.answers)
        .bind(quiz.status)
        .bind(quiz.revealed_at)
        .bind(quiz.expires_at)
        .execute(&mut *tx)
        .await?;

        let mut score = None;
        if revealed {
            let pair = quiz.pair();
            sqlx::query(
                "INSERT INTO compatibility_scores (user_a, user_b, last_updated) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            )
            .bind(pair.low)
            .bind(pair.high)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            let mut current = sqlx::query_as::<_, CompatibilityScoreEntity>(
                "SELECT * FROM compatibility_scores WHERE user_a = $1 AND user_b = $2 FOR UPDATE",
            )
            .bind(pair.low)
            .bind(pair.high)
            .fetch_one(&mut *tx)
            .await?;

            current.record(quiz.kind.category(), quiz.answers_match().unwrap_or(false), now);

            sqlx::query(
                r#"
                UPDATE compatibility_scores
                SET total_quizzes = $3, matched_answers = $4, score = $5, categories = $6, last_updated = $7
                WHERE user_a = $1 AND user_b = $2
                "#,
            )
            .bind(pair.low)
            .bind(pair.high)
            .bind(current.total_quizzes)
            .bind(current.matched_answers)
            .bind(current.score)
            .bind(&current.categories)
            .bind(current.last_updated)
            .execute(&mut *tx)
            .await?;

            score = Some(current);
        }

        tx.commit().await?;

        Ok(AnswerOutcome { quiz, revealed, score })
    }

    async fn find_score(
        &self,
        pair: &UserPair,
    ) -> Result<Option<CompatibilityScoreEntity>, error::SystemError> {
        let score = sqlx::query_as::<_, CompatibilityScoreEntity>(
            "SELECT * FROM compatibility_scores WHERE user_a = $1 AND user_b = $2",
        )
        .bind(pair.low)
        .bind(pair.high)
        .fetch_optional(&self.pool)
        .await?;
        Ok(score)
    }

    async fn find_revealed(
        &self,
        pair: &UserPair,
        limit: i64,
    ) -> Result<Vec<QuizEntity>, error::SystemError> {
        let quizzes = sqlx::query_as::<_, QuizEntity>(
            r#"
            SELECT *
            FROM quizzes
            WHERE status = 'revealed'
              AND ((creator_id = $1 AND partner_id = $2) OR (creator_id = $2 AND partner_id = $1))
            ORDER BY revealed_at DESC
            LIMIT $3
            "#,
        )
        .bind(pair.low)
        .bind(pair.high)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }
}

#[async_trait::async_trait]
impl ExpirySweep for QuizRepositoryPg {
    fn name(&self) -> &'static str {
        "quizzes"
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, error::SystemError> {
        let rows = sqlx::query("DELETE FROM quizzes WHERE status = 'waiting' AND expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows)
    }
}
