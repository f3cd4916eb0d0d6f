//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a live dashboard
//! connection. It owns at most one refresh task at a time and cancels it when
//! the client switches feed, unsubscribes, or disconnects. Snapshots are only
//! sent while the session the connection was opened with is still valid.

use crate::web::{
    middleware::session_cookie,
    protocol::{ClientMessage, Feed, ServerMessage},
    refresh_task::{refresh_process, send_message, session_ended, snapshot, SessionCheck},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use dashboard_core::{DashboardError, RequestContext};
use futures::stream::{SplitSink, StreamExt};
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The feed currently being refreshed for a connection.
struct ActiveFeed {
    feed: Feed,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActiveFeed {
    fn stop(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// The handler for upgrading HTTP requests to WebSocket connections.
/// Only signed-in users may open a live connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    let session_id = match (ctx.user_id(), session_cookie(&headers)) {
        (Some(_), Some(session_id)) => session_id.to_string(),
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                DashboardError::Unauthenticated.user_message(),
            )
                .into_response();
        }
    };
    let session = SessionCheck::new(app_state.db.clone(), session_id);
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, session, ctx))
}

async fn handle_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    session: SessionCheck,
    ctx: RequestContext,
) {
    info!("New live connection established for user: {:?}", ctx.user_id());

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let mut active: Option<ActiveFeed> = None;

    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_text_message(
                    text.as_str(),
                    &app_state,
                    &session,
                    &ctx,
                    &ws_sender,
                    &mut active,
                )
                .await;
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive failed: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- Cleanup ---
    if let Some(feed) = active.take() {
        feed.stop();
    }
    info!("Live connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    session: &SessionCheck,
    ctx: &RequestContext,
    ws_sender: &WsSender,
    active: &mut Option<ActiveFeed>,
) {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { feed }) => {
            if let Some(previous) = active.take() {
                previous.stop();
            }
            let period = app_state.config.refresh_interval;
            let ack = ServerMessage::Subscribed {
                feed,
                refresh_interval_secs: period.as_secs(),
            };
            // The acknowledgement goes out before the first snapshot.
            if let Err(e) = send_message(ws_sender, &ack).await {
                error!("Failed to acknowledge subscription: {:?}", e);
                return;
            }
            let token = CancellationToken::new();
            let handle = {
                let dashboard = app_state.dashboard.clone();
                let session = session.clone();
                let ctx = *ctx;
                let ws_sender = ws_sender.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        refresh_process(dashboard, session, ctx, feed, period, ws_sender, token)
                            .await
                    {
                        error!("Refresh process failed: {:?}", e);
                    }
                })
            };
            *active = Some(ActiveFeed {
                feed,
                token,
                handle,
            });
            info!("Subscribed to {:?} feed.", feed);
            return;
        }
        Ok(ClientMessage::Unsubscribe) => {
            if let Some(previous) = active.take() {
                previous.stop();
            }
            ServerMessage::Unsubscribed
        }
        Ok(ClientMessage::Refresh) => match active.as_ref() {
            Some(_) if !session.still_valid(ctx).await => session_ended(),
            Some(current) => snapshot(&app_state.dashboard, ctx, current.feed).await,
            None => ServerMessage::Error {
                message: "No feed subscribed".to_string(),
            },
        },
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            ServerMessage::Error {
                message: "Unrecognized message".to_string(),
            }
        }
    };

    if let Err(e) = send_message(ws_sender, &reply).await {
        error!("Failed to send reply: {:?}", e);
    }
}
