//! services/api/src/web/refresh_task.rs
//!
//! This module contains the asynchronous "worker" responsible for keeping a
//! live connection's feed fresh. Derived statuses depend on the current time,
//! so every tick recomputes and sends a full snapshot. The session the
//! connection was opened with is re-validated on each tick.

use crate::web::{
    dto::{EventResponse, SubscriptionResponse},
    protocol::{Feed, ServerMessage},
};
use axum::extract::ws::Message;
use dashboard_core::{
    ports::{DatabaseService, PortError, PortResult},
    Dashboard, DashboardError, RequestContext,
};
use futures::{Sink, SinkExt};
use std::{fmt::Display, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

//=========================================================================================
// Session Re-validation
//=========================================================================================

/// The auth session a live connection was opened with.
#[derive(Clone)]
pub struct SessionCheck {
    db: Arc<dyn DatabaseService>,
    session_id: String,
}

impl SessionCheck {
    pub fn new(db: Arc<dyn DatabaseService>, session_id: impl Into<String>) -> Self {
        Self {
            db,
            session_id: session_id.into(),
        }
    }

    /// False once the session is logged out, expired, or belongs to another
    /// user. A store failure keeps the feed open; the snapshot reports it.
    pub async fn still_valid(&self, ctx: &RequestContext) -> bool {
        match self.db.validate_auth_session(&self.session_id).await {
            Ok(user_id) => ctx.user_id() == Some(user_id),
            Err(PortError::Unexpected(e)) => {
                warn!("Could not re-validate live session: {}", e);
                true
            }
            Err(_) => false,
        }
    }
}

/// The message a live connection gets once its session is gone.
pub fn session_ended() -> ServerMessage {
    ServerMessage::Error {
        message: DashboardError::Unauthenticated.user_message(),
    }
}

/// What one tick produces.
enum Tick {
    Snapshot(ServerMessage),
    SessionEnded,
}

async fn tick(
    dashboard: &Dashboard,
    session: &SessionCheck,
    ctx: &RequestContext,
    feed: Feed,
) -> Tick {
    if !session.still_valid(ctx).await {
        return Tick::SessionEnded;
    }
    Tick::Snapshot(snapshot(dashboard, ctx, feed).await)
}

//=========================================================================================
// Snapshots & The Refresh Loop
//=========================================================================================

/// Builds the current snapshot of `feed`. Failures become an `Error` message
/// carrying the user-facing text.
pub async fn snapshot(dashboard: &Dashboard, ctx: &RequestContext, feed: Feed) -> ServerMessage {
    let result = match feed {
        Feed::Events => dashboard.list_events(ctx).await.map(|events| ServerMessage::Events {
            events: events.into_iter().map(EventResponse::from).collect(),
        }),
        Feed::Subscriptions => {
            dashboard
                .list_subscriptions(ctx)
                .await
                .map(|subscriptions| ServerMessage::Subscriptions {
                    subscriptions: subscriptions
                        .into_iter()
                        .map(SubscriptionResponse::from)
                        .collect(),
                })
        }
    };
    result.unwrap_or_else(|e| ServerMessage::Error {
        message: e.user_message(),
    })
}

/// Serializes `message` and writes it to the shared sender.
pub async fn send_message<S>(ws_sender: &Mutex<S>, message: &ServerMessage) -> PortResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let json = serde_json::to_string(message)
        .map_err(|e| PortError::Unexpected(format!("Failed to encode message: {}", e)))?;
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to send message: {}", e)))
}

/// The long-running refresh loop for one subscribed feed.
///
/// The first snapshot is sent immediately, then one per `period`. The loop ends
/// when `cancellation_token` fires; a snapshot computed while the token was
/// being cancelled is dropped rather than sent. If the session has ended, a
/// final "User not authenticated" error is sent instead and the loop stops.
pub async fn refresh_process<S>(
    dashboard: Arc<Dashboard>,
    session: SessionCheck,
    ctx: RequestContext,
    feed: Feed,
    period: Duration,
    ws_sender: Arc<Mutex<S>>,
    cancellation_token: CancellationToken,
) -> PortResult<()>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    info!("Refresh process started for {:?} feed.", feed);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            _ = cancellation_token.cancelled() => break,
            outcome = tick(&dashboard, &session, &ctx, feed) => outcome,
        };
        if cancellation_token.is_cancelled() {
            debug!("Discarding stale {:?} snapshot.", feed);
            break;
        }

        let message = match outcome {
            Tick::Snapshot(message) => message,
            Tick::SessionEnded => {
                info!("Session ended; closing {:?} feed.", feed);
                return send_message(&ws_sender, &session_ended()).await;
            }
        };
        if let Err(e) = send_message(&ws_sender, &message).await {
            warn!("Ending refresh process: {:?}", e);
            return Err(e);
        }
    }

    info!("Refresh process for {:?} feed cancelled.", feed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::PdfInvoiceRenderer;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use dashboard_core::{FixedClock, InMemoryDatabase, NewEvent};
    use futures::{channel::mpsc, StreamExt};

    const SESSION_ID: &str = "live-session";

    struct Fixture {
        db: Arc<InMemoryDatabase>,
        dashboard: Arc<Dashboard>,
        session: SessionCheck,
        ctx: RequestContext,
    }

    async fn dashboard_with_event() -> Fixture {
        let db = Arc::new(InMemoryDatabase::new());
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 11, 0, 0).unwrap();
        let dashboard = Dashboard::new(db.clone(), Arc::new(PdfInvoiceRenderer::new("INVOICE", 50)))
            .with_clock(Arc::new(FixedClock(now)));
        let user = db.create_user_with_email("owner@example.com", "hash").await.unwrap();
        db.create_auth_session(SESSION_ID, user.user_id, Utc::now() + ChronoDuration::days(1))
            .await
            .unwrap();
        let ctx = RequestContext::for_user(user.user_id);
        dashboard
            .create_event(
                &ctx,
                NewEvent {
                    title: "Stand-up".to_string(),
                    description: String::new(),
                    start_time: Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap(),
                    end_time: Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();
        Fixture {
            session: SessionCheck::new(db.clone(), SESSION_ID),
            db,
            dashboard: Arc::new(dashboard),
            ctx,
        }
    }

    fn text(message: Message) -> serde_json::Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    async fn next_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.next())
            .await
            .unwrap()
            .unwrap();
        text(frame)
    }

    #[tokio::test]
    async fn snapshot_reports_missing_user_as_error() {
        let fixture = dashboard_with_event().await;
        let message = snapshot(&fixture.dashboard, &RequestContext::anonymous(), Feed::Events).await;
        assert!(
            matches!(message, ServerMessage::Error { ref message } if message == "User not authenticated")
        );
    }

    #[tokio::test]
    async fn sends_snapshots_until_cancelled() {
        let fixture = dashboard_with_event().await;
        let (tx, mut rx) = mpsc::unbounded::<Message>();
        let token = CancellationToken::new();

        let handle = tokio::spawn(refresh_process(
            fixture.dashboard,
            fixture.session,
            fixture.ctx,
            Feed::Events,
            Duration::from_millis(20),
            Arc::new(Mutex::new(tx)),
            token.clone(),
        ));

        for _ in 0..2 {
            let json = next_json(&mut rx).await;
            assert_eq!(json["type"], "events");
            assert_eq!(json["events"][0]["title"], "Stand-up");
            assert_eq!(json["events"][0]["status"], "ongoing");
        }

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn logout_stops_the_feed_with_an_error() {
        let fixture = dashboard_with_event().await;
        let (tx, mut rx) = mpsc::unbounded::<Message>();

        let handle = tokio::spawn(refresh_process(
            fixture.dashboard,
            fixture.session,
            fixture.ctx,
            Feed::Events,
            Duration::from_millis(20),
            Arc::new(Mutex::new(tx)),
            CancellationToken::new(),
        ));

        assert_eq!(next_json(&mut rx).await["type"], "events");
        fixture.db.delete_auth_session(SESSION_ID).await.unwrap();

        // A tick already in flight may still deliver one snapshot.
        let mut json = next_json(&mut rx).await;
        if json["type"] == "events" {
            json = next_json(&mut rx).await;
        }
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "User not authenticated");

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn expired_session_sends_no_snapshot() {
        let fixture = dashboard_with_event().await;
        let user_id = fixture.ctx.user_id().unwrap();
        fixture
            .db
            .create_auth_session("stale", user_id, Utc::now() - ChronoDuration::minutes(1))
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded::<Message>();

        let result = refresh_process(
            fixture.dashboard,
            SessionCheck::new(fixture.db.clone(), "stale"),
            fixture.ctx,
            Feed::Subscriptions,
            Duration::from_millis(20),
            Arc::new(Mutex::new(tx)),
            CancellationToken::new(),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(next_json(&mut rx).await["type"], "error");
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn session_of_another_user_is_not_valid() {
        let fixture = dashboard_with_event().await;
        let stranger = RequestContext::for_user(uuid::Uuid::new_v4());
        assert!(fixture.session.still_valid(&fixture.ctx).await);
        assert!(!fixture.session.still_valid(&stranger).await);
    }

    #[tokio::test]
    async fn closed_connection_ends_the_loop_with_error() {
        let fixture = dashboard_with_event().await;
        let (tx, rx) = mpsc::unbounded::<Message>();
        drop(rx);

        let result = refresh_process(
            fixture.dashboard,
            fixture.session,
            fixture.ctx,
            Feed::Subscriptions,
            Duration::from_millis(20),
            Arc::new(Mutex::new(tx)),
            CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
    }
}
