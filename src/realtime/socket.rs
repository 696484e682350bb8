// realtime/socket.rs
use std::{borrow::Cow, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query,
    },
    http::HeaderMap,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedSender},
    time::{interval_at, Instant},
};
use uuid::Uuid;
use validator::Validate;

use super::{
    events,
    hub::{frame, Outbound},
};
use crate::{
    dtos::chatdtos::{MarkReadDto, SendMessageDto},
    error::{ErrorMessage, HttpError},
    middleware::{authenticate, load_session_user, request_token},
    models::usermodel::User,
    AppState,
};

/// Idle sockets re-check their session this often.
const SESSION_RECHECK: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<SocketQuery>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let token = request_token(&cookie_jar, &headers)
        .or(query.token)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let auth = authenticate(&app_state, &token).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, app_state, auth.user, auth.session_id)))
}

fn close_frame(reason: String) -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::POLICY,
        reason: Cow::Owned(reason),
    }))
}

#[derive(Debug)]
enum Recheck {
    Valid(User),
    /// Lookup failed; keep the socket but do not act on this frame.
    Unavailable,
    Closed,
}

/// The session behind a socket is re-read before acting on the client's behalf.
async fn recheck(
    app_state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
    tx: &UnboundedSender<Outbound>,
) -> Recheck {
    match load_session_user(app_state, user_id, session_id).await {
        Ok(auth) => Recheck::Valid(auth.user),
        Err(err) if err.status.is_server_error() => {
            tracing::warn!("Session recheck for user {} failed: {}", user_id, err.message);
            Recheck::Unavailable
        }
        Err(err) => {
            tracing::info!("Closing socket of user {}: {}", user_id, err.message);
            let _ = tx.send(Outbound::Close(err.message));
            Recheck::Closed
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, mut user: User, session_id: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = unbounded_channel::<Outbound>();

    let hub = app_state.realtime.clone();
    let (conn_id, first) = hub.connect(user.id, session_id, user.role, tx.clone()).await;
    tracing::info!("Socket {} opened for user {}", conn_id, user.id);

    if first {
        hub.broadcast(events::USER_ONLINE, &serde_json::json!({ "user_id": user.id }))
            .await;
    }

    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(payload) => {
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Outbound::Close(reason) => {
                    let _ = sink.send(close_frame(reason)).await;
                    break;
                }
            }
        }
    });

    let mut ticker = interval_at(Instant::now() + SESSION_RECHECK, SESSION_RECHECK);
    let mut closing = false;

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if closing {
                        continue;
                    }
                    match recheck(&app_state, user.id, session_id, &tx).await {
                        Recheck::Valid(fresh) => {
                            user = fresh;
                            handle_frame(&app_state, &user, &tx, &text).await;
                        }
                        Recheck::Unavailable => reply_error(&tx, "Something went wrong"),
                        Recheck::Closed => closing = true,
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("Socket {} read error: {}", conn_id, e);
                    break;
                }
            },
            _ = ticker.tick(), if !closing => {
                if let Recheck::Closed = recheck(&app_state, user.id, session_id, &tx).await {
                    closing = true;
                }
            }
            _ = &mut writer => break,
        }
    }

    writer.abort();

    let last = hub.disconnect(user.id, conn_id).await;
    tracing::info!("Socket {} closed for user {}", conn_id, user.id);

    if last {
        hub.broadcast(events::USER_OFFLINE, &serde_json::json!({ "user_id": user.id }))
            .await;
    }
}

fn reply<T: serde::Serialize>(tx: &UnboundedSender<Outbound>, event: &str, data: &T) {
    if let Some(payload) = frame(event, data) {
        let _ = tx.send(Outbound::Frame(payload));
    }
}

fn client_message(err: HttpError) -> String {
    if err.status.is_server_error() {
        tracing::error!("Socket frame failed: {}", err.message);
        "Something went wrong".to_string()
    } else {
        err.message
    }
}

fn reply_error(tx: &UnboundedSender<Outbound>, message: impl Into<String>) {
    reply(tx, events::ERROR, &serde_json::json!({ "message": message.into() }));
}

async fn handle_frame(
    app_state: &AppState,
    user: &User,
    tx: &UnboundedSender<Outbound>,
    text: &str,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(_) => return reply_error(tx, "Malformed frame"),
    };

    match frame.event.as_str() {
        events::PING => reply(tx, events::PONG, &serde_json::json!({})),
        events::CHAT_SEND => {
            let body: SendMessageDto = match serde_json::from_value(frame.data) {
                Ok(body) => body,
                Err(_) => return reply_error(tx, "receiver_id and text are required"),
            };
            if let Err(e) = body.validate() {
                return reply_error(tx, client_message(HttpError::from(e)));
            }
            // delivery to both rooms happens inside the service
            if let Err(e) = app_state
                .chat_service
                .send(user, body.receiver_id, &body.text)
                .await
            {
                reply_error(tx, client_message(HttpError::from(e)));
            }
        }
        events::CHAT_READ => {
            let body: MarkReadDto = match serde_json::from_value(frame.data) {
                Ok(body) => body,
                Err(_) => return reply_error(tx, "sender_id is required"),
            };
            if let Err(e) = app_state.chat_service.mark_read(user, body.sender_id).await {
                reply_error(tx, client_message(HttpError::from(e)));
            }
        }
        other => reply_error(tx, format!("Unknown event: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_sockets_close_with_policy_code() {
        let Message::Close(Some(close)) = close_frame(ErrorMessage::SessionRevoked.to_string()) else {
            panic!("expected a close frame");
        };
        assert_eq!(close.code, close_code::POLICY);
        assert_eq!(close.reason, ErrorMessage::SessionRevoked.to_string());
    }

    #[test]
    fn replies_are_wrapped_as_frames() {
        let (tx, mut rx) = unbounded_channel();
        reply_error(&tx, "Malformed frame");

        let Ok(Outbound::Frame(text)) = rx.try_recv() else {
            panic!("expected a frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], events::ERROR);
        assert_eq!(value["data"]["message"], "Malformed frame");
    }
}
