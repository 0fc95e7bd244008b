use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        expiry::policy,
        friend::{repository::FriendRepo, service::require_friendship},
        story::{
            model::{InsertStory, PostStoryModel, StoryGroup},
            repository::StoryRepository,
            schema::{StoryEntity, StoryView},
        },
    },
    utils::Clock,
};

#[derive(Clone)]
pub struct StoryService {
    story_repo: Arc<dyn StoryRepository + Send + Sync>,
    friend_repo: Arc<dyn FriendRepo>,
    clock: Arc<dyn Clock>,
}

impl StoryService {
    pub fn with_dependencies(
        story_repo: Arc<dyn StoryRepository + Send + Sync>,
        friend_repo: Arc<dyn FriendRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        StoryService { story_repo, friend_repo, clock }
    }

    async fn find_live(&self, story_id: Uuid) -> Result<StoryEntity, error::SystemError> {
        let now = self.clock.now();
        self.story_repo
            .find_by_id(&story_id)
            .await?
            .filter(|s| s.is_live(now))
            .ok_or_else(|| error::SystemError::not_found("Story not found"))
    }

    pub async fn post_story(
        &self,
        user_id: Uuid,
        body: PostStoryModel,
    ) -> Result<StoryEntity, error::SystemError> {
        let now = self.clock.now();
        let story = self
            .story_repo
            .create(&InsertStory {
                user_id,
                media_url: body.media_url,
                kind: body.kind,
                caption: body.caption,
                expires_at: policy::story_expiry(now),
                created_at: now,
            })
            .await?;

        log::info!("User {} posted story {}", user_id, story.id);
        Ok(story)
    }

    /// Friends with at least one live story. Groups are ordered by their
    /// newest story.
    pub async fn list_friend_stories(&self, user_id: Uuid) -> Result<Vec<StoryGroup>, error::SystemError> {
        let friends = self.friend_repo.find_friends(&user_id).await?;
        if friends.is_empty() {
            return Ok(Vec::new());
        }

        let owner_ids: Vec<Uuid> = friends.iter().map(|f| f.id).collect();
        let stories = self.story_repo.find_live_by_owners(&owner_ids, self.clock.now()).await?;

        let mut groups: Vec<StoryGroup> = Vec::new();
        for story in stories {
            match groups.iter_mut().find(|g| g.user.id == story.user_id) {
                Some(group) => group.stories.push(story),
                None => {
                    let Some(owner) = friends.iter().find(|f| f.id == story.user_id) else {
                        continue;
                    };
                    groups.push(StoryGroup { user: owner.clone(), stories: vec![story], has_viewed: false });
                }
            }
        }

        for group in &mut groups {
            group.has_viewed = group.stories.iter().all(|s| s.viewed_by(user_id));
        }

        Ok(groups)
    }

    pub async fn list_own_stories(&self, user_id: Uuid) -> Result<Vec<StoryEntity>, error::SystemError> {
        self.story_repo.find_live_by_owners(&[user_id], self.clock.now()).await
    }

    /// Records the viewer once; the owner looking at their own story is not a view.
    pub async fn view_story(
        &self,
        story_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<StoryEntity, error::SystemError> {
        let story = self.find_live(story_id).await?;
        if story.user_id == viewer_id {
            return Ok(story);
        }

        require_friendship(
            &*self.friend_repo,
            viewer_id,
            story.user_id,
            "You can only view stories of friends",
        )
        .await?;

        let view = StoryView { viewer_id, viewed_at: self.clock.now() };
        self.story_repo
            .add_view(&story_id, &view)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Story not found"))
    }

    pub async fn delete_story(&self, story_id: Uuid, user_id: Uuid) -> Result<(), error::SystemError> {
        let story = self
            .story_repo
            .find_by_id(&story_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Story not found"))?;

        if story.user_id != user_id {
            return Err(error::SystemError::unauthorized("Only the owner can delete this story"));
        }

        self.story_repo.delete(&story_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::modules::story::schema::StoryKind;
    use crate::test::TestApp;

    fn image(caption: &str) -> PostStoryModel {
        PostStoryModel {
            media_url: "https://cdn.example.com/story.jpg".to_string(),
            kind: StoryKind::Image,
            caption: Some(caption.to_string()),
        }
    }

    #[tokio::test]
    async fn test_story_expires_after_24h() {
        let app = TestApp::new();
        let a = app.user("alice");
        let b = app.user("bob");
        app.befriend(a, b).await;

        let story = app.stories.post_story(a, image("beach")).await.unwrap();
        assert_eq!(story.expires_at, app.clock.now() + Duration::hours(24));

        app.clock.advance(Duration::hours(23));
        assert_eq!(app.stories.list_friend_stories(b).await.unwrap().len(), 1);

        app.clock.advance(Duration::hours(1));
        assert!(app.stories.list_friend_stories(b).await.unwrap().is_empty());
        assert!(app.stories.list_own_stories(a).await.unwrap().is_empty());
        let err = app.stories.view_story(story.id, b).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_groups_track_viewed_state() {
        let app = TestApp::new();
        let a = app.user("alice");
        let b = app.user("bob");
        let c = app.user("carol");
        app.befriend(a, b).await;
        app.befriend(a, c).await;

        let first = app.stories.post_story(b, image("one")).await.unwrap();
        app.clock.advance(Duration::minutes(1));
        let second = app.stories.post_story(b, image("two")).await.unwrap();
        app.clock.advance(Duration::minutes(1));
        app.stories.post_story(c, image("three")).await.unwrap();

        let groups = app.stories.list_friend_stories(a).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].user.id, c);
        assert_eq!(groups[1].stories.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert!(!groups[1].has_viewed);

        app.stories.view_story(first.id, a).await.unwrap();
        app.stories.view_story(second.id, a).await.unwrap();
        let viewed = app.stories.view_story(second.id, a).await.unwrap();
        assert_eq!(viewed.views.0.len(), 1);

        let groups = app.stories.list_friend_stories(a).await.unwrap();
        assert!(groups[1].has_viewed);
        assert!(!groups[0].has_viewed);
    }

    #[tokio::test]
    async fn test_strangers_cannot_view_or_delete() {
        let app = TestApp::new();
        let a = app.user("alice");
        let stranger = app.user("mallory");

        let story = app.stories.post_story(a, image("private")).await.unwrap();
        let err = app.stories.view_story(story.id, stranger).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));
        let err = app.stories.delete_story(story.id, stranger).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));

        app.stories.delete_story(story.id, a).await.unwrap();
        assert!(app.stories.list_own_stories(a).await.unwrap().is_empty());
    }
}
