/// Command dispatch
///
/// Routes one authenticated [`ClientMessage`] to its service and turns the
/// result into the `data` of the `ack`. Payload models are validated here so
/// services only ever see well-formed input.
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::message::ClientMessage;
use super::state::AppState;
use crate::api::error;
use crate::modules::message::model::CallSignal;
use crate::utils::validate_payload;

fn to_data<T: Serialize>(value: T) -> Result<Value, error::SystemError> {
    Ok(serde_json::to_value(value)?)
}

async fn relay_call(
    state: &AppState,
    user_id: Uuid,
    recipient_id: Uuid,
    signal: CallSignal,
) -> Result<Value, error::SystemError> {
    let delivered = state.messages.relay_call(user_id, recipient_id, signal).await?;
    Ok(json!({ "recipientId": recipient_id, "delivered": delivered }))
}

pub async fn dispatch(
    state: &AppState,
    user_id: Uuid,
    command: ClientMessage,
) -> Result<Value, error::SystemError> {
    match command {
        ClientMessage::Auth { .. } | ClientMessage::Ping => {
            Err(error::SystemError::bad_request("Handled by the session"))
        }

        // messaging
        ClientMessage::SendMessage(body) => {
            validate_payload(&body)?;
            to_data(state.messages.send_message(user_id, body).await?)
        }
        ClientMessage::MarkRead { message_id } => {
            to_data(state.messages.mark_read(message_id, user_id).await?)
        }
        ClientMessage::ListConversation { partner_id } => {
            to_data(state.messages.list_conversation(user_id, partner_id).await?)
        }
        ClientMessage::AddReaction(body) => {
            validate_payload(&body)?;
            to_data(state.messages.add_reaction(user_id, body).await?)
        }
        ClientMessage::DeleteMessage { message_id } => {
            state.messages.delete_message(message_id, user_id).await?;
            Ok(json!({ "messageId": message_id }))
        }
        ClientMessage::TypingStart { recipient_id } => {
            state.messages.typing(user_id, recipient_id, true).await?;
            Ok(json!({}))
        }
        ClientMessage::TypingStop { recipient_id } => {
            state.messages.typing(user_id, recipient_id, false).await?;
            Ok(json!({}))
        }
        ClientMessage::Poke { recipient_id } => {
            state.messages.poke(user_id, recipient_id).await?;
            Ok(json!({ "recipientId": recipient_id }))
        }
        ClientMessage::ScreenshotTaken { partner_id } => {
            state.messages.screenshot_taken(user_id, partner_id).await?;
            Ok(json!({}))
        }

        // calls
        ClientMessage::CallUser { recipient_id, offer } => {
            relay_call(state, user_id, recipient_id, CallSignal::Offer(offer)).await
        }
        ClientMessage::AnswerCall { recipient_id, answer } => {
            relay_call(state, user_id, recipient_id, CallSignal::Answer(answer)).await
        }
        ClientMessage::IceCandidate { recipient_id, candidate } => {
            relay_call(state, user_id, recipient_id, CallSignal::Candidate(candidate)).await
        }
        ClientMessage::EndCall { recipient_id } => {
            relay_call(state, user_id, recipient_id, CallSignal::End).await
        }

        // friends
        ClientMessage::SendFriendRequest(body) => {
            validate_payload(&body)?;
            to_data(state.friends.send_friend_request(user_id, body).await?)
        }
        ClientMessage::AcceptFriendRequest { request_id } => {
            to_data(state.friends.accept_friend_request(user_id, request_id).await?)
        }
        ClientMessage::RejectFriendRequest { request_id } => {
            to_data(state.friends.reject_friend_request(user_id, request_id).await?)
        }
        ClientMessage::RemoveFriend { friend_id } => {
            state.friends.remove_friend(user_id, friend_id).await?;
            Ok(json!({ "friendId": friend_id }))
        }
        ClientMessage::ListFriends => to_data(state.friends.get_friends(user_id).await?),
        ClientMessage::ListFriendRequests => {
            to_data(state.friends.get_friend_requests(user_id).await?)
        }
        ClientMessage::FriendshipStatus { user_id: other_id } => {
            let status = state.friends.friendship_status(user_id, other_id).await?;
            Ok(json!({ "userId": other_id, "status": status }))
        }

        // stories
        ClientMessage::PostStory(body) => {
            validate_payload(&body)?;
            to_data(state.stories.post_story(user_id, body).await?)
        }
        ClientMessage::ListFriendStories => {
            to_data(state.stories.list_friend_stories(user_id).await?)
        }
        ClientMessage::ListOwnStories => to_data(state.stories.list_own_stories(user_id).await?),
        ClientMessage::ViewStory { story_id } => {
            to_data(state.stories.view_story(story_id, user_id).await?)
        }
        ClientMessage::DeleteStory { story_id } => {
            state.stories.delete_story(story_id, user_id).await?;
            Ok(json!({ "storyId": story_id }))
        }

        // streaks
        ClientMessage::GetStreak { partner_id } => {
            to_data(state.streaks.get_streak(user_id, partner_id).await?)
        }

        // anonymous chat
        ClientMessage::JoinAnonymousQueue => to_data(state.anonymous.join_queue(user_id).await?),
        ClientMessage::LeaveAnonymousQueue => {
            let left = state.anonymous.leave_queue(user_id).await?;
            Ok(json!({ "left": left }))
        }
        ClientMessage::GetAnonymousChat { chat_id } => {
            to_data(state.anonymous.get_chat(chat_id, user_id).await?)
        }
        ClientMessage::EndAnonymousChat { chat_id } => {
            to_data(state.anonymous.end_chat(chat_id, user_id).await?)
        }
        ClientMessage::SendAnonymousMessage(body) => {
            validate_payload(&body)?;
            to_data(state.anonymous.send_message(user_id, body).await?)
        }
        ClientMessage::ConversationStarters => to_data(state.anonymous.conversation_starters()),

        // quizzes
        ClientMessage::CreateQuiz(body) => {
            validate_payload(&body)?;
            to_data(state.quizzes.create_quiz(user_id, body).await?)
        }
        ClientMessage::SendRandomQuiz { partner_id } => {
            to_data(state.quizzes.send_random_quiz(user_id, partner_id).await?)
        }
        ClientMessage::SendTruthOrDare(body) => {
            to_data(state.quizzes.send_truth_or_dare(user_id, body).await?)
        }
        ClientMessage::AnswerQuiz(body) => {
            validate_payload(&body)?;
            to_data(state.quizzes.answer_quiz(user_id, body).await?)
        }
        ClientMessage::GetQuiz { quiz_id } => to_data(state.quizzes.get_quiz(quiz_id, user_id).await?),
        ClientMessage::GetCompatibility { partner_id } => {
            to_data(state.quizzes.get_compatibility(user_id, partner_id).await?)
        }
        ClientMessage::ListRevealedQuizzes { partner_id } => {
            to_data(state.quizzes.list_revealed_quizzes(user_id, partner_id).await?)
        }
    }
}
