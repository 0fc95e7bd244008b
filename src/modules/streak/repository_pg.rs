use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::streak::{
        repository::StreakRepository,
        schema::StreakEntity,
        state::{self, SnapOutcome},
    },
    utils::UserPair,
};

#[derive(Clone)]
pub struct StreakRepositoryPg {
    pool: sqlx::PgPool,
}

impl StreakRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StreakRepository for StreakRepositoryPg {
    async fn find(&self, pair: &UserPair) -> Result<Option<StreakEntity>, error::SystemError> {
        let streak = sqlx::query_as::<_, StreakEntity>(
            "SELECT * FROM streaks WHERE user_a = $1 AND user_b = $2",
        )
        .bind(pair.low)
        .bind(pair.high)
        .fetch_optional(&self.pool)
        .await?;
        Ok(streak)
    }

    async fn record_snap_atomic(
        &self,
        caller: &Uuid,
        partner: &Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(StreakEntity, SnapOutcome), error::SystemError> {
        let pair = UserPair::new(*caller, *partner);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO streaks (user_a, user_b, updated_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(pair.low)
        .bind(pair.high)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut streak = sqlx::query_as::<_, StreakEntity>(
            "SELECT * FROM streaks WHERE user_a = $1 AND user_b = $2 FOR UPDATE",
        )
        .bind(pair.low)
        .bind(pair.high)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = state::record_snap(&mut streak, *caller, *partner, today, now);

        sqlx::query(
            r#"
            UPDATE streaks
            SET
                user_a_last_snap   = $3,
                user_b_last_snap   = $4,
                last_counted_day   = $5,
                current_streak     = $6,
                longest_streak     = $7,
                both_snapped_today = $8,
                achievements       = $9,
                updated_at         = $10
            WHERE user_a = $1 AND user_b = $2
            "#,
        )
        .bind(pair.low)
        .bind(pair.high)
        .bind(streak.user_a_last_snap)
        .bind(streak.user_b_last_snap)
        .bind(streak.last_counted_day)
        .bind(streak.current_streak)
        .bind(streak.longest_streak)
        .bind(streak.both_snapped_today)
        .bind(&streak.achievements)
        .bind(streak.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((streak, outcome))
    }
}
