use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::error;
use crate::modules::story::{
    model::InsertStory,
    schema::{StoryEntity, StoryView},
};

#[async_trait::async_trait]
pub trait StoryRepository {
    async fn create(&self, story: &InsertStory) -> Result<StoryEntity, error::SystemError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<StoryEntity>, error::SystemError>;

    /// Live stories of the given owners, newest first.
    async fn find_live_by_owners(
        &self,
        owner_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<StoryEntity>, error::SystemError>;

    /// Records a view unless this viewer is already listed.
    async fn add_view(
        &self,
        id: &Uuid,
        view: &StoryView,
    ) -> Result<Option<StoryEntity>, error::SystemError>;

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError>;
}
