use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::modules::quiz::schema::{CompatibilityScoreEntity, QuizEntity, QuizKind, TruthOrDare};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizModel {
    pub partner_id: Uuid,
    pub kind: QuizKind,
    #[validate(length(min = 1, max = 300, message = "Question must be 1-300 characters"))]
    pub question: String,
    #[validate(length(min = 2, max = 10, message = "A quiz needs 2-10 options"))]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuizModel {
    pub quiz_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Answer must be 1-200 characters"))]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruthOrDareModel {
    pub partner_id: Uuid,
    pub choice: TruthOrDare,
}

pub struct InsertQuiz {
    pub creator_id: Uuid,
    pub partner_id: Uuid,
    pub kind: QuizKind,
    pub question: String,
    pub options: Vec<String>,
    pub is_random: bool,
    pub truth_or_dare_choice: Option<TruthOrDare>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub quiz: QuizEntity,
    pub revealed: bool,
    pub score: Option<CompatibilityScoreEntity>,
}
