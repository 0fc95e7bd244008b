/// WebSocket message protocol
///
/// Every frame is a JSON object tagged by `"type"` (snake_case); payload keys
/// are camelCase. Commands answer with `ack` or `error`; the other server
/// events are pushed by the services as things happen.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ErrorKind;
use crate::modules::{
    anonymous::model::AnonymousMessageModel,
    friend::{model::FriendRequestModel, schema::FriendRequestEntity},
    message::{
        model::{ReactionModel, SendMessageModel},
        schema::{MessageEntity, Reaction},
    },
    quiz::{
        model::{AnswerQuizModel, CreateQuizModel, TruthOrDareModel},
        schema::{QuizAnswer, QuizEntity},
    },
    story::model::PostStoryModel,
    user::model::UserProfile,
};

/// Commands sent from client to server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate a socket opened without a bearer token.
    Auth { token: String },
    Ping,

    // messaging
    SendMessage(SendMessageModel),
    #[serde(rename_all = "camelCase")]
    MarkRead { message_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ListConversation { partner_id: Uuid },
    AddReaction(ReactionModel),
    #[serde(rename_all = "camelCase")]
    DeleteMessage { message_id: Uuid },
    #[serde(rename_all = "camelCase")]
    TypingStart { recipient_id: Uuid },
    #[serde(rename_all = "camelCase")]
    TypingStop { recipient_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Poke { recipient_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ScreenshotTaken { partner_id: Uuid },

    // calls
    #[serde(rename_all = "camelCase")]
    CallUser { recipient_id: Uuid, offer: serde_json::Value },
    #[serde(rename_all = "camelCase")]
    AnswerCall { recipient_id: Uuid, answer: serde_json::Value },
    #[serde(rename_all = "camelCase")]
    IceCandidate { recipient_id: Uuid, candidate: serde_json::Value },
    #[serde(rename_all = "camelCase")]
    EndCall { recipient_id: Uuid },

    // friends
    SendFriendRequest(FriendRequestModel),
    #[serde(rename_all = "camelCase")]
    AcceptFriendRequest { request_id: Uuid },
    #[serde(rename_all = "camelCase")]
    RejectFriendRequest { request_id: Uuid },
    #[serde(rename_all = "camelCase")]
    RemoveFriend { friend_id: Uuid },
    ListFriends,
    ListFriendRequests,
    #[serde(rename_all = "camelCase")]
    FriendshipStatus { user_id: Uuid },

    // stories
    PostStory(PostStoryModel),
    ListFriendStories,
    ListOwnStories,
    #[serde(rename_all = "camelCase")]
    ViewStory { story_id: Uuid },
    #[serde(rename_all = "camelCase")]
    DeleteStory { story_id: Uuid },

    // streaks
    #[serde(rename_all = "camelCase")]
    GetStreak { partner_id: Uuid },

    // anonymous chat
    JoinAnonymousQueue,
    LeaveAnonymousQueue,
    #[serde(rename_all = "camelCase")]
    GetAnonymousChat { chat_id: Uuid },
    #[serde(rename_all = "camelCase")]
    EndAnonymousChat { chat_id: Uuid },
    SendAnonymousMessage(AnonymousMessageModel),
    ConversationStarters,

    // quizzes
    CreateQuiz(CreateQuizModel),
    #[serde(rename_all = "camelCase")]
    SendRandomQuiz { partner_id: Uuid },
    SendTruthOrDare(TruthOrDareModel),
    AnswerQuiz(AnswerQuizModel),
    #[serde(rename_all = "camelCase")]
    GetQuiz { quiz_id: Uuid },
    #[serde(rename_all = "camelCase")]
    GetCompatibility { partner_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ListRevealedQuizzes { partner_id: Uuid },
}

impl ClientMessage {
    /// Name echoed back in the `ack`/`error` answering this command.
    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::Auth { .. } => "auth",
            ClientMessage::Ping => "ping",
            ClientMessage::SendMessage(_) => "send_message",
            ClientMessage::MarkRead { .. } => "mark_read",
            ClientMessage::ListConversation { .. } => "list_conversation",
            ClientMessage::AddReaction(_) => "add_reaction",
            ClientMessage::DeleteMessage { .. } => "delete_message",
            ClientMessage::TypingStart { .. } => "typing_start",
            ClientMessage::TypingStop { .. } => "typing_stop",
            ClientMessage::Poke { .. } => "poke",
            ClientMessage::ScreenshotTaken { .. } => "screenshot_taken",
            ClientMessage::CallUser { .. } => "call_user",
            ClientMessage::AnswerCall { .. } => "answer_call",
            ClientMessage::IceCandidate { .. } => "ice_candidate",
            ClientMessage::EndCall { .. } => "end_call",
            ClientMessage::SendFriendRequest(_) => "send_friend_request",
            ClientMessage::AcceptFriendRequest { .. } => "accept_friend_request",
            ClientMessage::RejectFriendRequest { .. } => "reject_friend_request",
            ClientMessage::RemoveFriend { .. } => "remove_friend",
            ClientMessage::ListFriends => "list_friends",
            ClientMessage::ListFriendRequests => "list_friend_requests",
            ClientMessage::FriendshipStatus { .. } => "friendship_status",
            ClientMessage::PostStory(_) => "post_story",
            ClientMessage::ListFriendStories => "list_friend_stories",
            ClientMessage::ListOwnStories => "list_own_stories",
            ClientMessage::ViewStory { .. } => "view_story",
            ClientMessage::DeleteStory { .. } => "delete_story",
            ClientMessage::GetStreak { .. } => "get_streak",
            ClientMessage::JoinAnonymousQueue => "join_anonymous_queue",
            ClientMessage::LeaveAnonymousQueue => "leave_anonymous_queue",
            ClientMessage::GetAnonymousChat { .. } => "get_anonymous_chat",
            ClientMessage::EndAnonymousChat { .. } => "end_anonymous_chat",
            ClientMessage::SendAnonymousMessage(_) => "send_anonymous_message",
            ClientMessage::ConversationStarters => "conversation_starters",
            ClientMessage::CreateQuiz(_) => "create_quiz",
            ClientMessage::SendRandomQuiz { .. } => "send_random_quiz",
            ClientMessage::SendTruthOrDare(_) => "send_truth_or_dare",
            ClientMessage::AnswerQuiz(_) => "answer_quiz",
            ClientMessage::GetQuiz { .. } => "get_quiz",
            ClientMessage::GetCompatibility { .. } => "get_compatibility",
            ClientMessage::ListRevealedQuizzes { .. } => "list_revealed_quizzes",
        }
    }
}

/// Events sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Successful result of a command.
    Ack { action: String, data: serde_json::Value },

    /// Failed command, or a frame that could not be parsed (`action` absent).
    Error { action: Option<String>, kind: ErrorKind, message: String },

    Pong,

    // messaging
    NewMessage { message: MessageEntity },
    MessageSent { message: MessageEntity },
    #[serde(rename_all = "camelCase")]
    MessageDelivered { message_id: Uuid, delivered_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    MessageReadReceipt { message_id: Uuid, read_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    MessageDeleted { message_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ReactionAdded { message_id: Uuid, user_id: Uuid, emoji: String, reactions: Vec<Reaction> },
    #[serde(rename_all = "camelCase")]
    ReactionConfirmed { message_id: Uuid, reactions: Vec<Reaction> },
    CelebrationTrigger,
    #[serde(rename_all = "camelCase")]
    UserTyping { user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    UserStoppedTyping { user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ReceivePoke { from: Uuid, from_name: String, timestamp: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    PartnerScreenshot { user_id: Uuid, timestamp: DateTime<Utc>, message: String },

    // calls
    #[serde(rename_all = "camelCase")]
    IncomingCall { from: Uuid, from_data: UserProfile, offer: serde_json::Value },
    CallAnswered { from: Uuid, answer: serde_json::Value },
    IceCandidate { from: Uuid, candidate: serde_json::Value },
    CallEnded { from: Uuid },

    // presence
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: Uuid, username: String, display_name: String, avatar: Option<String> },
    #[serde(rename_all = "camelCase")]
    UserOffline { user_id: Uuid, last_seen: DateTime<Utc> },

    // friends
    FriendRequestReceived { request: FriendRequestEntity, from: UserProfile },
    #[serde(rename_all = "camelCase")]
    FriendRequestAccepted { request_id: Uuid, friend: UserProfile },

    // quizzes
    NewQuiz { quiz: QuizEntity },
    #[serde(rename_all = "camelCase")]
    QuizReveal { quiz_id: Uuid, question: String, answers: Vec<QuizAnswer>, matched: bool },
    #[serde(rename_all = "camelCase")]
    QuizPartnerAnswered { quiz_id: Uuid, partner_name: String },

    // anonymous chat
    #[serde(rename_all = "camelCase")]
    ChatMatched { chat_id: Uuid, partner_name: String, ends_at: Option<DateTime<Utc>> },
    #[serde(rename_all = "camelCase")]
    AnonymousMessage { chat_id: Uuid, sender_name: String, content: String, timestamp: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    ChatEnded { chat_id: Uuid },
}

impl ServerMessage {
    pub fn user_online(profile: &UserProfile) -> Self {
        ServerMessage::UserOnline {
            user_id: profile.id,
            username: profile.username.clone(),
            display_name: profile.display_name.clone(),
            avatar: profile.avatar_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === ClientMessage ===

    #[test]
    fn test_client_auth_deserialize() {
        let json = r#"{"type":"auth","token":"my-jwt-token"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Auth { token } if token == "my-jwt-token"));
    }

    #[test]
    fn test_client_send_message_defaults_to_text() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"type":"send_message","recipientId":"{}","content":"hey"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::SendMessage(model) => {
                assert_eq!(model.recipient_id, id);
                assert_eq!(model.content.as_deref(), Some("hey"));
                assert!(!model.kind.is_snap());
            }
            other => panic!("Expected SendMessage, got {:?}", other),
        }
    }

    #[test]
    fn test_client_snap_kind_is_kebab_case() {
        let id = Uuid::now_v7();
        let json = format!(
            r#"{{"type":"send_message","recipientId":"{}","kind":"video-snap","mediaUrl":"https://cdn.example.com/v.mp4"}}"#,
            id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::SendMessage(model) if model.kind.is_snap()));
    }

    #[test]
    fn test_client_struct_variant_uses_camel_case() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"type":"mark_read","messageId":"{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::MarkRead { message_id } if message_id == id));
        assert_eq!(msg.action(), "mark_read");
    }

    #[test]
    fn test_client_truth_or_dare_choice() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"type":"send_truth_or_dare","partnerId":"{}","choice":"dare"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg.action(), "send_truth_or_dare");
    }

    #[test]
    fn test_client_unit_commands() {
        for (raw, action) in [
            (r#"{"type":"ping"}"#, "ping"),
            (r#"{"type":"join_anonymous_queue"}"#, "join_anonymous_queue"),
            (r#"{"type":"list_friend_stories"}"#, "list_friend_stories"),
        ] {
            let msg: ClientMessage = serde_json::from_str(raw).unwrap();
            assert_eq!(msg.action(), action);
        }
    }

    #[test]
    fn test_client_call_offer_is_opaque() {
        let id = Uuid::now_v7();
        let raw = json!({
            "type": "call_user",
            "recipientId": id,
            "offer": { "type": "offer", "sdp": "v=0" },
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.action(), "call_user");
        match msg {
            ClientMessage::CallUser { recipient_id, offer } => {
                assert_eq!(recipient_id, id);
                assert_eq!(offer["sdp"], "v=0");
            }
            other => panic!("Expected CallUser, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_type_returns_error() {
        let json = r#"{"type":"unknownType"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_missing_required_field_returns_error() {
        let json = r#"{"type":"answer_quiz","answer":"Rock"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    // === ServerMessage ===

    #[test]
    fn test_server_pong_serialize() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_server_celebration_has_no_payload() {
        let value = serde_json::to_value(&ServerMessage::CelebrationTrigger).unwrap();
        assert_eq!(value, json!({"type": "celebration_trigger"}));
    }

    #[test]
    fn test_server_read_receipt_keys() {
        let id = Uuid::now_v7();
        let at = Utc::now();
        let value =
            serde_json::to_value(&ServerMessage::MessageReadReceipt { message_id: id, read_at: at })
                .unwrap();
        assert_eq!(value["type"], "message_read_receipt");
        assert_eq!(value["messageId"], id.to_string());
        assert!(value.get("readAt").is_some());
    }

    #[test]
    fn test_server_error_carries_kind() {
        let msg = ServerMessage::Error {
            action: Some("answer_quiz".into()),
            kind: ErrorKind::AlreadyAnswered,
            message: "You already answered this quiz".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "AlreadyAnswered");
        assert_eq!(value["action"], "answer_quiz");
    }

    #[test]
    fn test_server_incoming_call_keys() {
        let profile = UserProfile {
            id: Uuid::now_v7(),
            username: "luna".into(),
            display_name: "Luna".into(),
            avatar_url: None,
        };
        let msg = ServerMessage::IncomingCall {
            from: profile.id,
            from_data: profile.clone(),
            offer: json!({ "sdp": "v=0" }),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "incoming_call");
        assert_eq!(value["from"], profile.id.to_string());
        assert_eq!(value["fromData"]["displayName"], "Luna");
        assert_eq!(value["offer"]["sdp"], "v=0");
    }

    #[test]
    fn test_server_user_online_from_profile() {
        let profile = UserProfile {
            id: Uuid::now_v7(),
            username: "luna".into(),
            display_name: "Luna".into(),
            avatar_url: None,
        };
        let value = serde_json::to_value(ServerMessage::user_online(&profile)).unwrap();
        assert_eq!(value["type"], "user_online");
        assert_eq!(value["userId"], profile.id.to_string());
        assert_eq!(value["displayName"], "Luna");
        assert!(value["avatar"].is_null());
    }
}
