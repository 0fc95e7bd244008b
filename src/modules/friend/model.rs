use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::{friend::schema::FriendRequestEntity, user::model::UserProfile};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestModel {
    pub recipient_id: Uuid,
    #[validate(length(max = 200, message = "Request note cannot exceed 200 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    None,
    Friends,
    RequestSent,
    RequestReceived,
}

/// A pending request together with the user on the other side of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    pub request: FriendRequestEntity,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestsResponse {
    pub incoming: Vec<FriendRequestView>,
    pub outgoing: Vec<FriendRequestView>,
}
