use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::story::schema::{StoryEntity, StoryKind};
use crate::modules::user::model::UserProfile;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostStoryModel {
    #[validate(url(message = "Media must be a valid URL"))]
    pub media_url: String,
    pub kind: StoryKind,
    #[validate(length(max = 250, message = "Caption cannot exceed 250 characters"))]
    pub caption: Option<String>,
}

pub struct InsertStory {
    pub user_id: Uuid,
    pub media_url: String,
    pub kind: StoryKind,
    pub caption: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One friend's live stories, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGroup {
    pub user: UserProfile,
    pub stories: Vec<StoryEntity>,
    pub has_viewed: bool,
}
