use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::configs::RedisCache;
use crate::modules::user::{model::UserProfile, repository::UserRepository};

const PROFILE_TTL_SECS: u64 = 3600;

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<RedisCache>,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<RedisCache>,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, cache }
    }

    /// Profile lookup used when a socket authenticates. A cache miss or a Redis
    /// failure falls back to the database.
    pub async fn get_profile(&self, id: Uuid) -> Result<UserProfile, error::SystemError> {
        let key = format!("user:{}", id);
        match self.cache.get::<UserProfile>(&key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => log::warn!("Profile cache read failed for {}: {}", id, e),
        }

        let profile = self
            .repo
            .find_by_id(&id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if let Err(e) = self.cache.set(&key, &profile, PROFILE_TTL_SECS).await {
            log::warn!("Profile cache write failed for {}: {}", id, e);
        } else {
            info!("User {} cached", id);
        }
        Ok(profile)
    }
}
