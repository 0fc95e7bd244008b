use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        expiry::reaper::ExpirySweep,
        message::{
            model::InsertMessage,
            repository::MessageRepository,
            schema::{MessageEntity, Reaction},
        },
    },
};

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

async fn bump_snap_score(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &Uuid,
) -> Result<(), error::SystemError> {
    sqlx::query("UPDATE users SET snap_score = snap_score + 1 WHERE id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages
                (id, sender_id, recipient_id, kind, content, media_url, is_snap, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(message.kind)
        .bind(&message.content)
        .bind(&message.media_url)
        .bind(message.kind.is_snap())
        .bind(message.expires_at)
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await?;

        if entity.is_snap {
            bump_snap_score(&mut tx, &entity.sender_id).await?;
        }

        tx.commit().await?;
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    async fn mark_read(
        &self,
        id: &Uuid,
        read_at: DateTime<Utc>,
        view_expires_at: DateTime<Utc>,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, MessageEntity>(
            r#"
            UPDATE messages
            SET
                is_read    = TRUE,
                read_at    = COALESCE(read_at, $2),
                viewed_at  = CASE WHEN is_snap THEN $2 ELSE viewed_at END,
                expires_at = CASE WHEN is_snap THEN $3 ELSE expires_at END
            WHERE id = $1
              AND (NOT is_snap OR viewed_at IS NULL)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(read_at)
        .bind(view_expires_at)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(message) = message.as_ref().filter(|m| m.is_snap) {
            bump_snap_score(&mut tx, &message.recipient_id).await?;
        }

        tx.commit().await?;
        Ok(message)
    }

    async fn find_conversation(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        let mut messages = sqlx::query_as::<_, MessageEntity>(
            r#"
            SELECT *
            FROM messages
            WHERE ((sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1))
              AND (NOT is_snap OR expires_at > $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    async fn upsert_reaction(
        &self,
        id: &Uuid,
        reaction: &Reaction,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>(
            r#"
            UPDATE messages
            SET reactions = (
                SELECT COALESCE(jsonb_agg(r), '[]'::jsonb)
                FROM jsonb_array_elements(reactions) AS r
                WHERE r->>'userId' <> $2::text
            ) || jsonb_build_array($3::jsonb)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reaction.user_id.to_string())
        .bind(sqlx::types::Json(reaction))
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }
}

#[async_trait::async_trait]
impl ExpirySweep for MessageRepositoryPg {
    fn name(&self) -> &'static str {
        "snaps"
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, error::SystemError> {
        let rows = sqlx::query("DELETE FROM messages WHERE is_snap AND expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows)
    }
}
