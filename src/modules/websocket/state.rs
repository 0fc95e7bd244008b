use crate::modules::{
    anonymous::service::AnonymousChatService, friend::service::FriendService,
    message::service::MessageService, quiz::service::QuizService, story::service::StoryService,
    streak::service::StreakService,
};

use super::presence::PresenceService;

/// Services reachable from a socket command, shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub presence: PresenceService,
    pub friends: FriendService,
    pub messages: MessageService,
    pub stories: StoryService,
    pub streaks: StreakService,
    pub anonymous: AnonymousChatService,
    pub quizzes: QuizService,
}
