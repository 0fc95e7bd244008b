use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "story_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StoryKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    pub viewer_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoryEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub media_url: String,
    pub kind: StoryKind,
    pub caption: Option<String>,
    pub views: Json<Vec<StoryView>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StoryEntity {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        crate::modules::expiry::policy::is_live(Some(self.expires_at), now)
    }

    pub fn viewed_by(&self, user_id: Uuid) -> bool {
        self.views.iter().any(|v| v.viewer_id == user_id)
    }
}
