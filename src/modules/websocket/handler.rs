/// WebSocket HTTP Handler
///
/// Upgrades `GET /ws` and pumps frames both ways:
/// - Inbound:  client → parse `ClientMessage` → session actor
/// - Outbound: services → `ConnectionHandle` channel → client
///
/// A bearer token may come from the `Authorization` header or the `token`
/// query parameter. Without one the socket opens unauthenticated and must send
/// an `auth` command first; an invalid one is refused with 401.
use actix::Actor;
use actix_web::{HttpRequest, HttpResponse, http::header, web};
use actix_ws::Message;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::message::{ClientMessage, ServerMessage};
use super::registry::ConnectionHandle;
use super::session::WebSocketSession;
use super::state::AppState;
use crate::ENV;
use crate::api::error::{self, ErrorKind};
use crate::modules::user::service::UserService;
use crate::utils::Claims;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

fn bearer_token(req: &HttpRequest, query: &ConnectQuery) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| query.token.clone())
}

pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<ConnectQuery>,
    state: web::Data<AppState>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, actix_web::Error> {
    tracing::debug!("WebSocket upgrade request from {:?}", req.peer_addr());

    let user_id: Option<Uuid> = match bearer_token(&req, &query) {
        Some(token) => Some(
            Claims::authenticate(&token, ENV.jwt_secret.as_bytes()).map_err(error::Error::from)?,
        ),
        None => None,
    };

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn = ConnectionHandle::new(tx);
    let addr = WebSocketSession::new(user_id, conn.clone(), state, users).start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(command) => addr.do_send(command),
                                Err(e) => {
                                    tracing::warn!(
                                        "Unparseable client frame: {} - raw: {}",
                                        e,
                                        text.chars().take(100).collect::<String>()
                                    );
                                    conn.send(&ServerMessage::Error {
                                        action: None,
                                        kind: ErrorKind::BadRequest,
                                        message: format!("Invalid message: {}", e),
                                    });
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Failed to send pong: {}", e);
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {}

                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary frames are not supported");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }

                        None => break,
                    }
                }

                Some(json) = rx.recv() => {
                    if ws_session.text(json).await.is_err() {
                        tracing::error!("Failed to write to WebSocket client");
                        break;
                    }
                }
            }
        }

        // Dropping the last address stops the actor, which unregisters the user.
        drop(addr);
        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket message loop finished");
    });

    Ok(response)
}
