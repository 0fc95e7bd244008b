use std::sync::Arc;

use chrono::FixedOffset;
use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::{repository::FriendRepo, service::require_friendship};
use crate::modules::streak::{
    repository::StreakRepository,
    schema::StreakEntity,
    state::{self, SnapOutcome},
};
use crate::utils::{Clock, UserPair, calendar_day};

#[derive(Clone)]
pub struct StreakService {
    repo: Arc<dyn StreakRepository + Send + Sync>,
    friend_repo: Arc<dyn FriendRepo>,
    clock: Arc<dyn Clock>,
    day_offset: FixedOffset,
}

impl StreakService {
    pub fn with_dependencies(
        repo: Arc<dyn StreakRepository + Send + Sync>,
        friend_repo: Arc<dyn FriendRepo>,
        clock: Arc<dyn Clock>,
        day_offset: FixedOffset,
    ) -> Self {
        StreakService { repo, friend_repo, clock, day_offset }
    }

    /// Feeds one snap from `user_id` to `partner_id` into the pair's streak.
    pub async fn record_snap(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> Result<(StreakEntity, SnapOutcome), error::SystemError> {
        if user_id == partner_id {
            return Err(error::SystemError::bad_request("Cannot keep a streak with yourself"));
        }

        let now = self.clock.now();
        let today = calendar_day(now, self.day_offset);
        let (streak, outcome) = self.repo.record_snap_atomic(&user_id, &partner_id, today, now).await?;

        if let Some(milestone) = outcome.achievement {
            tracing::info!(user = %user_id, partner = %partner_id, milestone, "Streak milestone reached");
        }
        if outcome.broken {
            tracing::debug!(user = %user_id, partner = %partner_id, "Streak reset after missed day");
        }

        Ok((streak, outcome))
    }

    /// Zeroed record when the pair has never snapped each other.
    pub async fn get_streak(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> Result<StreakEntity, error::SystemError> {
        require_friendship(&*self.friend_repo, user_id, partner_id, "You can only see streaks with friends")
            .await?;

        let pair = UserPair::new(user_id, partner_id);
        let now = self.clock.now();
        let streak = self.repo.find(&pair).await?.unwrap_or_else(|| StreakEntity::empty(pair, now));
        Ok(state::as_of(streak, calendar_day(now, self.day_offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test::TestApp;

    #[tokio::test]
    async fn test_get_streak_needs_friendship() {
        let app = TestApp::new();
        let a = app.user("alice");
        let b = app.user("bob");

        let err = app.streaks.get_streak(a, b).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));

        app.befriend(a, b).await;
        let streak = app.streaks.get_streak(b, a).await.unwrap();
        assert_eq!(streak.current_streak, 0);
        assert!(!streak.both_snapped_today);
    }
}
