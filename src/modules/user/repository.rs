use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{api::error, modules::user::schema::UserEntity};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    async fn set_presence(
        &self,
        id: &Uuid,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<(), error::SystemError>;
}
