use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        anonymous::{
            model::JoinOutcome,
            repository::{AnonymousChatRepository, Namer},
            schema::{AnonymousChatEntity, ChatLine, ChatParticipant},
        },
        expiry::{
            policy::{chat_ends_at, chat_retention_cutoff},
            reaper::ExpirySweep,
        },
    },
};

/// Advisory lock serializing every matchmaking transaction.
const MATCHMAKING_LOCK_KEY: i64 = 0x616e_6f6e;

#[derive(Clone)]
pub struct AnonymousChatRepositoryPg {
    pool: sqlx::PgPool,
}

impl AnonymousChatRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn member_filter(user_id: &Uuid) -> Json<serde_json::Value> {
    Json(json!([{ "userId": user_id }]))
}

#[async_trait::async_trait]
impl AnonymousChatRepository for AnonymousChatRepositoryPg {
    async fn join_queue_atomic(
        &self,
        user_id: &Uuid,
        now: DateTime<Utc>,
        namer: Namer,
    ) -> Result<JoinOutcome, error::SystemError> {
        let cutoff = chat_retention_cutoff(now);
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MATCHMAKING_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let already_in_chat = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM anonymous_chats
                WHERE participants @> $1
                  AND created_at > $2
                  AND (status = 'waiting' OR (status = 'active' AND ends_at > $3))
            )
            "#,
        )
        .bind(member_filter(user_id))
        .bind(cutoff)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if already_in_chat {
            tx.rollback().await?;
            return Err(error::SystemError::already_in_chat("You are already in a chat"));
        }

        let waiting = sqlx::query_as::<_, AnonymousChatEntity>(
            r#"
            SELECT * FROM anonymous_chats
            WHERE status = 'waiting'
              AND created_at > $1
              AND jsonb_array_length(participants) = 1
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(cutoff)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match waiting {
            Some(mut chat) => {
                let taken: Vec<String> = chat.participants.iter().map(|p| p.pseudonym.clone()).collect();
                chat.participants.push(ChatParticipant { user_id: *user_id, pseudonym: namer(&taken) });

                let chat = sqlx::query_as::<_, AnonymousChatEntity>(
                    r#"
                    UPDATE anonymous_chats
                    SET participants = $2, status = 'active', started_at = $3, ends_at = $4
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(chat.id)
                .bind(&chat.participants)
                .bind(now)
                .bind(chat_ends_at(now))
                .fetch_one(&mut *tx)
                .await?;

                JoinOutcome { chat, matched: true }
            }
            None => {
                let participants =
                    Json(vec![ChatParticipant { user_id: *user_id, pseudonym: namer(&[]) }]);

                let chat = sqlx::query_as::<_, AnonymousChatEntity>(
                    r#"
                    INSERT INTO anonymous_chats (id, status, participants, created_at)
                    VALUES ($1, 'waiting', $2, $3)
                    RETURNING *
                    "#,
                )
                .bind(Uuid::now_v7())
                .bind(&participants)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                JoinOutcome { chat, matched: false }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn leave_queue(&self, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query(
            r#"
            DELETE FROM anonymous_chats
            WHERE status = 'waiting'
              AND jsonb_array_length(participants) = 1
              AND participants @> $1
            "#,
        )
        .bind(member_filter(user_id))
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<AnonymousChatEntity>, error::SystemError> {
        let chat =
            sqlx::query_as::<_, AnonymousChatEntity>("SELECT * FROM anonymous_chats WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(chat)
    }

    async fn end_chat(
        &self,
        id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<AnonymousChatEntity>, error::SystemError> {
        let chat = sqlx::query_as::<_, AnonymousChatEntity>(
            r#"
            UPDATE anonymous_chats
            SET status = 'ended', ended_at = COALESCE(ended_at, $2)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(chat)
    }

    async fn append_message(
        &self,
        id: &Uuid,
        line: &ChatLine,
    ) -> Result<Option<AnonymousChatEntity>, error::SystemError> {
        let chat = sqlx::query_as::<_, AnonymousChatEntity>(
            r#"
            UPDATE anonymous_chats
            SET messages = messages || jsonb_build_array($2::jsonb)
            WHERE id = $1 AND status = 'active' AND ends_at > $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(line))
        .bind(line.sent_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(chat)
    }
}

#[async_trait::async_trait]
impl ExpirySweep for AnonymousChatRepositoryPg {
    fn name(&self) -> &'static str {
        "anonymous_chats"
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, error::SystemError> {
        let rows = sqlx::query("DELETE FROM anonymous_chats WHERE created_at <= $1")
            .bind(chat_retention_cutoff(now))
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows)
    }
}
