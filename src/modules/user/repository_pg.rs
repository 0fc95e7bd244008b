use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{repository::UserRepository, schema::UserEntity},
};

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, username, display_name, avatar_url, is_online, last_seen, snap_score, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_presence(
        &self,
        id: &Uuid,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<(), error::SystemError> {
        sqlx::query("UPDATE users SET is_online = $2, last_seen = $3 WHERE id = $1")
            .bind(id)
            .bind(is_online)
            .bind(last_seen)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
