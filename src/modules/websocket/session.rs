/// WebSocket Session Actor
///
/// One actor per socket. It owns the connection's identity (the
/// [`ConnectionHandle`] and, once known, the user id), answers `ping` and
/// `auth` itself and hands every other command to [`dispatch`] on a spawned
/// future, replying with `ack` or `error`.
use actix::prelude::*;
use actix_web::web;
use uuid::Uuid;

use super::dispatch::dispatch;
use super::message::{ClientMessage, ServerMessage};
use super::registry::ConnectionHandle;
use super::state::AppState;
use crate::ENV;
use crate::api::error::{self, ErrorKind};
use crate::modules::user::service::UserService;
use crate::utils::Claims;

pub struct WebSocketSession {
    /// User id once authenticated, either at upgrade or through `auth`.
    pub user_id: Option<Uuid>,
    pub conn: ConnectionHandle,
    state: web::Data<AppState>,
    users: web::Data<UserService>,
}

impl WebSocketSession {
    pub fn new(
        user_id: Option<Uuid>,
        conn: ConnectionHandle,
        state: web::Data<AppState>,
        users: web::Data<UserService>,
    ) -> Self {
        Self { user_id, conn, state, users }
    }

    fn send_error(&self, action: Option<&str>, err: &error::SystemError) {
        self.conn.send(&ServerMessage::Error {
            action: action.map(str::to_string),
            kind: err.kind(),
            message: err.client_message().into_owned(),
        });
    }

    /// Loads the profile and puts the user into the presence registry.
    fn go_online(&self, user_id: Uuid, ctx: &mut Context<Self>) {
        let users = self.users.clone();
        let state = self.state.clone();
        let conn = self.conn.clone();

        ctx.spawn(
            async move {
                match users.get_profile(user_id).await {
                    Ok(profile) => {
                        state.presence.connect(&profile, conn);
                    }
                    Err(e) => {
                        tracing::warn!(user = %user_id, "Profile lookup failed on connect: {}", e);
                        conn.send(&ServerMessage::Error {
                            action: Some("auth".to_string()),
                            kind: e.kind(),
                            message: e.client_message().into_owned(),
                        });
                    }
                }
            }
            .into_actor(self),
        );
    }

    fn handle_auth(&mut self, token: &str, ctx: &mut Context<Self>) {
        if self.user_id.is_some() {
            self.send_error(Some("auth"), &error::SystemError::bad_request("Session is already authenticated"));
            return;
        }

        let user_id = match Claims::authenticate(token, ENV.jwt_secret.as_bytes()) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::warn!(conn = %self.conn.conn_id, "Socket authentication failed: {}", e);
                self.send_error(Some("auth"), &e);
                return;
            }
        };

        self.user_id = Some(user_id);
        self.go_online(user_id, ctx);
        self.conn.send(&ServerMessage::Ack {
            action: "auth".to_string(),
            data: serde_json::json!({ "userId": user_id }),
        });
    }

    fn handle_command(&self, command: ClientMessage, ctx: &mut Context<Self>) {
        let action = command.action();
        let Some(user_id) = self.user_id else {
            self.conn.send(&ServerMessage::Error {
                action: Some(action.to_string()),
                kind: ErrorKind::Unauthorized,
                message: "Authenticate before sending commands".to_string(),
            });
            return;
        };

        let state = self.state.clone();
        let conn = self.conn.clone();

        ctx.spawn(
            async move {
                let reply = match dispatch(&state, user_id, command).await {
                    Ok(data) => ServerMessage::Ack { action: action.to_string(), data },
                    Err(e) => {
                        tracing::debug!(user = %user_id, action, "Command failed: {}", e);
                        ServerMessage::Error {
                            action: Some(action.to_string()),
                            kind: e.kind(),
                            message: e.client_message().into_owned(),
                        }
                    }
                };
                conn.send(&reply);
            }
            .into_actor(self),
        );
    }
}

impl Actor for WebSocketSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!(conn = %self.conn.conn_id, "WebSocket session started");
        if let Some(user_id) = self.user_id {
            self.go_online(user_id, ctx);
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!(conn = %self.conn.conn_id, "WebSocket session stopped");
        if let Some(user_id) = self.user_id {
            self.state.presence.disconnect(user_id, self.conn.conn_id);
        }
    }
}

impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        match msg {
            ClientMessage::Ping => {
                self.conn.send(&ServerMessage::Pong);
            }
            ClientMessage::Auth { token } => self.handle_auth(&token, ctx),
            command => self.handle_command(command, ctx),
        }
    }
}
