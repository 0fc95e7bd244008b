use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friend::{
            model::FriendRequestView,
            repository::{FriendRepo, FriendRepository, FriendRequestRepository},
            schema::{FriendRequestEntity, FriendRequestStatus},
        },
        user::model::UserProfile,
    },
    utils::UserPair,
};

#[derive(Clone)]
pub struct FriendRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn find_requests_with_user(
        &self,
        user_id: &Uuid,
        incoming: bool,
    ) -> Result<Vec<FriendRequestView>, error::SystemError> {
        // incoming: the other side is the sender; outgoing: the receiver.
        let (filter_column, join_column) =
            if incoming { ("to_user_id", "from_user_id") } else { ("from_user_id", "to_user_id") };

        let sql = format!(
            r#"
            SELECT
                fr.id,
                fr.from_user_id,
                fr.to_user_id,
                fr.message,
                fr.status,
                fr.created_at,
                fr.responded_at,
                u.id AS user_id,
                u.username,
                u.display_name,
                u.avatar_url
            FROM friend_requests fr
            JOIN users u ON u.id = fr.{join_column}
            WHERE fr.{filter_column} = $1 AND fr.status = 'pending'
            ORDER BY fr.created_at DESC
            "#
        );

        let rows = sqlx::query_as::<_, FriendRequestRow>(&sql).bind(user_id).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(FriendRequestView::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct FriendRequestRow {
    id: Uuid,
    from_user_id: Uuid,
    to_user_id: Uuid,
    message: Option<String>,
    status: FriendRequestStatus,
    created_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    user_id: Uuid,
    username: String,
    display_name: String,
    avatar_url: Option<String>,
}

impl From<FriendRequestRow> for FriendRequestView {
    fn from(r: FriendRequestRow) -> Self {
        FriendRequestView {
            request: FriendRequestEntity {
                id: r.id,
                from_user_id: r.from_user_id,
                to_user_id: r.to_user_id,
                message: r.message,
                status: r.status,
                created_at: r.created_at,
                responded_at: r.responded_at,
            },
            user: UserProfile {
                id: r.user_id,
                username: r.username,
                display_name: r.display_name,
                avatar_url: r.avatar_url,
            },
        }
    }
}

#[async_trait::async_trait]
impl FriendRepository for FriendRepositoryPg {
    async fn are_friends(&self, user_a: &Uuid, user_b: &Uuid) -> Result<bool, error::SystemError> {
        let pair = UserPair::new(*user_a, *user_b);
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM friends WHERE user_a = $1 AND user_b = $2)",
        )
        .bind(pair.low)
        .bind(pair.high)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_friend_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT CASE WHEN user_a = $1 THEN user_b ELSE user_a END
            FROM friends
            WHERE user_a = $1 OR user_b = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn find_friends(&self, user_id: &Uuid) -> Result<Vec<UserProfile>, error::SystemError> {
        let friends = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT
                u.id,
                u.username,
                u.display_name,
                u.avatar_url
            FROM friends f
            JOIN users u
                ON u.id = CASE
                    WHEN f.user_a = $1 THEN f.user_b
                    ELSE f.user_a
                END
            WHERE f.user_a = $1
               OR f.user_b = $1
            ORDER BY u.display_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }

    async fn delete_friendship(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let pair = UserPair::new(*user_a, *user_b);
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query("DELETE FROM friends WHERE user_a = $1 AND user_b = $2")
            .bind(pair.low)
            .bind(pair.high)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM friend_requests WHERE pair_low = $1 AND pair_high = $2")
            .bind(pair.low)
            .bind(pair.high)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(rows > 0)
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for FriendRepositoryPg {
    async fn find_request_between(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let pair = UserPair::new(*user_a, *user_b);
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            "SELECT * FROM friend_requests WHERE pair_low = $1 AND pair_high = $2",
        )
        .bind(pair.low)
        .bind(pair.high)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request =
            sqlx::query_as::<_, FriendRequestEntity>("SELECT * FROM friend_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(request)
    }

    async fn find_incoming_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError> {
        self.find_requests_with_user(user_id, true).await
    }

    async fn find_outgoing_requests(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError> {
        self.find_requests_with_user(user_id, false).await
    }

    async fn upsert_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
        message: &Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let pair = UserPair::new(*sender_id, *receiver_id);
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            INSERT INTO friend_requests
                (id, from_user_id, to_user_id, pair_low, pair_high, message, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            ON CONFLICT (pair_low, pair_high) DO UPDATE
            SET
                from_user_id = EXCLUDED.from_user_id,
                to_user_id   = EXCLUDED.to_user_id,
                message      = EXCLUDED.message,
                status       = 'pending',
                created_at   = EXCLUDED.created_at,
                responded_at = NULL
            WHERE friend_requests.status = 'rejected'
            RETURNING id, from_user_id, to_user_id, message, status, created_at, responded_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(pair.low)
        .bind(pair.high)
        .bind(message)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn reject_request(
        &self,
        request_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            UPDATE friend_requests
            SET status = 'rejected', responded_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING id, from_user_id, to_user_id, message, status, created_at, responded_at
            "#,
        )
        .bind(request_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }
}

#[async_trait::async_trait]
impl FriendRepo for FriendRepositoryPg {
    async fn accept_request_atomic(
        &self,
        request_id: &Uuid,
        user_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, FriendRequestEntity>(
            "SELECT * FROM friend_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if request.to_user_id != *user_id {
            tx.rollback().await?;
            return Err(error::SystemError::unauthorized(
                "You are not allowed to accept this friend request",
            ));
        }

        if request.status == FriendRequestStatus::Rejected {
            tx.rollback().await?;
            return Err(error::SystemError::invalid_state("Friend request was rejected"));
        }

        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            UPDATE friend_requests
            SET status = 'accepted', responded_at = COALESCE(responded_at, $2)
            WHERE id = $1
            RETURNING id, from_user_id, to_user_id, message, status, created_at, responded_at
            "#,
        )
        .bind(request_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let pair = UserPair::new(request.from_user_id, request.to_user_id);
        sqlx::query(
            "INSERT INTO friends (user_a, user_b, created_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(pair.low)
        .bind(pair.high)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(request)
    }
}
