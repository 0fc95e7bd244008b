use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::modules::user::schema::UserEntity;

/// Public slice of a user, cached in Redis and embedded in presence events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<UserEntity> for UserProfile {
    fn from(entity: UserEntity) -> Self {
        UserProfile {
            id: entity.id,
            username: entity.username,
            display_name: entity.display_name,
            avatar_url: entity.avatar_url,
        }
    }
}
