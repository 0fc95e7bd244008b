use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::api::error;
use crate::modules::streak::{schema::StreakEntity, state::SnapOutcome};
use crate::utils::UserPair;

#[async_trait::async_trait]
pub trait StreakRepository {
    async fn find(&self, pair: &UserPair) -> Result<Option<StreakEntity>, error::SystemError>;

    /// Loads (or creates) the pair's row under lock, applies
    /// [`state::record_snap`](crate::modules::streak::state::record_snap) and
    /// writes it back in the same transaction.
    async fn record_snap_atomic(
        &self,
        caller: &Uuid,
        partner: &Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(StreakEntity, SnapOutcome), error::SystemError>;
}
