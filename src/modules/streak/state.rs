//! Day-boundary streak rules. Pure functions over [`StreakEntity`]; callers
//! hold the row lock and supply `today` from `utils::calendar_day`.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::modules::streak::schema::{StreakAchievement, StreakEntity};

pub const ACHIEVEMENT_MILESTONES: [i32; 4] = [3, 10, 30, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapOutcome {
    /// Today was added to the streak by this snap.
    pub counted: bool,
    /// The streak was found broken and reset to zero.
    pub broken: bool,
    pub achievement: Option<i32>,
}

pub fn record_snap(
    streak: &mut StreakEntity,
    caller: Uuid,
    partner: Uuid,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> SnapOutcome {
    let yesterday = today.pred_opt();
    let partner_last = streak.last_snap_of(partner);
    let mut outcome = SnapOutcome::default();
    streak.updated_at = now;

    if streak.last_snap_of(caller) == Some(today) {
        let both = partner_last == Some(today);
        streak.both_snapped_today = both;
        if both {
            count_today(streak, today, now, &mut outcome);
        }
        return outcome;
    }

    streak.set_last_snap(caller, today);

    match partner_last {
        Some(day) if day == today => count_today(streak, today, now, &mut outcome),
        Some(day) if Some(day) == yesterday => streak.both_snapped_today = false,
        _ => {
            streak.both_snapped_today = false;
            if let Some(last) = streak.last_counted_day {
                if (today - last).num_days() > 1 && streak.current_streak != 0 {
                    streak.current_streak = 0;
                    outcome.broken = true;
                }
            }
        }
    }

    outcome
}

fn count_today(
    streak: &mut StreakEntity,
    today: NaiveDate,
    now: DateTime<Utc>,
    outcome: &mut SnapOutcome,
) {
    streak.both_snapped_today = true;
    if streak.last_counted_day == Some(today) {
        return;
    }

    streak.current_streak = match streak.last_counted_day {
        Some(last) if streak.current_streak > 0 && today.pred_opt() == Some(last) => {
            streak.current_streak + 1
        }
        _ => 1,
    };
    streak.last_counted_day = Some(today);
    streak.longest_streak = streak.longest_streak.max(streak.current_streak);
    outcome.counted = true;

    let reached = streak.current_streak;
    if ACHIEVEMENT_MILESTONES.contains(&reached)
        && !streak.achievements.iter().any(|a| a.milestone == reached)
    {
        streak.achievements.push(StreakAchievement { milestone: reached, achieved_at: now });
        outcome.achievement = Some(reached);
    }
}

/// The streak as it reads on `today`: a pair whose last counted day is older
/// than yesterday has already lost it, even if no snap has recorded the break.
pub fn as_of(mut streak: StreakEntity, today: NaiveDate) -> StreakEntity {
    if let Some(last) = streak.last_counted_day {
        if (today - last).num_days() > 1 {
            streak.current_streak = 0;
        }
    }
    if streak.last_counted_day != Some(today) {
        streak.both_snapped_today = false;
    }
    streak
}
