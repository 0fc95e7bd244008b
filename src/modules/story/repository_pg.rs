use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        expiry::reaper::ExpirySweep,
        story::{
            model::InsertStory,
            repository::StoryRepository,
            schema::{StoryEntity, StoryView},
        },
    },
};

#[derive(Clone)]
pub struct StoryRepositoryPg {
    pool: sqlx::PgPool,
}

impl StoryRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StoryRepository for StoryRepositoryPg {
    async fn create(&self, story: &InsertStory) -> Result<StoryEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, StoryEntity>(
            r#"
            INSERT INTO stories (id, user_id, media_url, kind, caption, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(story.user_id)
        .bind(&story.media_url)
        .bind(story.kind)
        .bind(&story.caption)
        .bind(story.expires_at)
        .bind(story.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<StoryEntity>, error::SystemError> {
        let story = sqlx::query_as::<_, StoryEntity>("SELECT * FROM stories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(story)
    }

    async fn find_live_by_owners(
        &self,
        owner_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<StoryEntity>, error::SystemError> {
        if owner_ids.is_empty() {
            return Ok(vec![]);
        }

        let stories = sqlx::query_as::<_, StoryEntity>(
            r#"
            SELECT *
            FROM stories
            WHERE user_id = ANY($1) AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_ids)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(stories)
    }

    async fn add_view(
        &self,
        id: &Uuid,
        view: &StoryView,
    ) -> Result<Option<StoryEntity>, error::SystemError> {
        let story = sqlx::query_as::<_, StoryEntity>(
            r#"
            UPDATE stories
            SET views = CASE
                WHEN views @> jsonb_build_array(jsonb_build_object('viewerId', $2::text))
                    THEN views
                ELSE views || jsonb_build_array($3::jsonb)
            END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(view.viewer_id.to_string())
        .bind(sqlx::types::Json(view))
        .fetch_optional(&self.pool)
        .await?;
        Ok(story)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }
}

#[async_trait::async_trait]
impl ExpirySweep for StoryRepositoryPg {
    fn name(&self) -> &'static str {
        "stories"
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, error::SystemError> {
        let rows = sqlx::query("DELETE FROM stories WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows)
    }
}
