use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::utils::UserPair;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakAchievement {
    pub milestone: i32,
    pub achieved_at: DateTime<Utc>,
}

/// Streak of one unordered pair. `user_a` is always the lower id.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StreakEntity {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub user_a_last_snap: Option<NaiveDate>,
    pub user_b_last_snap: Option<NaiveDate>,
    pub last_counted_day: Option<NaiveDate>,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub both_snapped_today: bool,
    pub achievements: Json<Vec<StreakAchievement>>,
    pub updated_at: DateTime<Utc>,
}

impl StreakEntity {
    pub fn empty(pair: UserPair, now: DateTime<Utc>) -> Self {
        StreakEntity {
            user_a: pair.low,
            user_b: pair.high,
            user_a_last_snap: None,
            user_b_last_snap: None,
            last_counted_day: None,
            current_streak: 0,
            longest_streak: 0,
            both_snapped_today: false,
            achievements: Json(vec![]),
            updated_at: now,
        }
    }

    pub fn pair(&self) -> UserPair {
        UserPair::new(self.user_a, self.user_b)
    }

    pub fn last_snap_of(&self, user_id: Uuid) -> Option<NaiveDate> {
        if user_id == self.user_a { self.user_a_last_snap } else { self.user_b_last_snap }
    }

    pub fn set_last_snap(&mut self, user_id: Uuid, day: NaiveDate) {
        if user_id == self.user_a {
            self.user_a_last_snap = Some(day);
        } else {
            self.user_b_last_snap = Some(day);
        }
    }
}
