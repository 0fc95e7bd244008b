use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use sqlx::types::Json;
use uuid::Uuid;

use crate::api::error;
use crate::utils::UserPair;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "quiz_kind", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum QuizKind {
    Emoji,
    Song,
    Custom,
    TruthOrDare,
    WouldYouRather,
    NeverHaveI,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizCategory {
    Music,
    Personality,
    Preferences,
}

impl QuizKind {
    pub fn category(self) -> QuizCategory {
        match self {
            QuizKind::Song => QuizCategory::Music,
            QuizKind::Emoji | QuizKind::WouldYouRather => QuizCategory::Preferences,
            QuizKind::Custom | QuizKind::TruthOrDare | QuizKind::NeverHaveI => {
                QuizCategory::Personality
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "quiz_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Waiting,
    Revealed,
    Expired,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "truth_or_dare_choice", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TruthOrDare {
    Truth,
    Dare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub user_id: Uuid,
    pub answer: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub partner_id: Uuid,
    pub kind: QuizKind,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub answers: Json<Vec<QuizAnswer>>,
    pub status: QuizStatus,
    pub is_random: bool,
    pub truth_or_dare_choice: Option<TruthOrDare>,
    pub revealed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

impl QuizEntity {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id || self.partner_id == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.creator_id == user_id { self.partner_id } else { self.creator_id }
    }

    pub fn pair(&self) -> UserPair {
        UserPair::new(self.creator_id, self.partner_id)
    }

    /// A waiting quiz past its deadline reads as expired before the reaper removes it.
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuizStatus {
        match self.status {
            QuizStatus::Waiting
                if !crate::modules::expiry::policy::is_live(self.expires_at, now) =>
            {
                QuizStatus::Expired
            }
            status => status,
        }
    }

    /// Both answers compared case-insensitively, ignoring surrounding whitespace.
    pub fn answers_match(&self) -> Option<bool> {
        match self.answers.as_slice() {
            [first, second] => Some(normalize_answer(&first.answer) == normalize_answer(&second.answer)),
            _ => None,
        }
    }

    /// Records one participant's answer. Returns true when this answer revealed the quiz.
    pub fn apply_answer(&mut self, answer: QuizAnswer, now: DateTime<Utc>) -> Result<bool, error::SystemError> {
        if !self.involves(answer.user_id) {
            return Err(error::SystemError::unauthorized("You are not part of this quiz"));
        }
        if self.answers.iter().any(|a| a.user_id == answer.user_id) {
            return Err(error::SystemError::already_answered("You already answered this quiz"));
        }
        match self.effective_status(now) {
            QuizStatus::Waiting => {}
            QuizStatus::Expired => return Err(error::SystemError::invalid_state("Quiz has expired")),
            QuizStatus::Revealed => {
                return Err(error::SystemError::invalid_state("Quiz was already revealed"));
            }
        }

        self.answers.push(answer);
        if self.answers.len() < 2 {
            return Ok(false);
        }

        self.status = QuizStatus::Revealed;
        self.revealed_at = Some(now);
        self.expires_at = None;
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub matches: i32,
    pub total: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub music: CategoryTally,
    pub personality: CategoryTally,
    pub preferences: CategoryTally,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityScoreEntity {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub total_quizzes: i32,
    pub matched_answers: i32,
    pub score: i32,
    pub categories: Json<CategoryBreakdown>,
    pub last_updated: DateTime<Utc>,
}

impl CompatibilityScoreEntity {
    pub fn empty(pair: UserPair, now: DateTime<Utc>) -> Self {
        CompatibilityScoreEntity {
            user_a: pair.low,
            user_b: pair.high,
            total_quizzes: 0,
            matched_answers: 0,
            score: 0,
            categories: Json(CategoryBreakdown::default()),
            last_updated: now,
        }
    }

    pub fn record(&mut self, category: QuizCategory, matched: bool, now: DateTime<Utc>) {
        self.total_quizzes += 1;
        if matched {
            self.matched_answers += 1;
        }
        self.score =
            ((self.matched_answers as f64 / self.total_quizzes as f64) * 100.0).round() as i32;

        let tally = match category {
            QuizCategory::Music => &mut self.categories.music,
            QuizCategory::Personality => &mut self.categories.personality,
            QuizCategory::Preferences => &mut self.categories.preferences,
        };
        tally.total += 1;
        if matched {
            tally.matches += 1;
        }
        self.last_updated = now;
    }
}
