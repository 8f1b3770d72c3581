//! Live push of the rendered feed over WebSocket.
//!
//! A socket follows one page session, named by the `session` query
//! parameter. It receives the feed on connect and again after every change
//! to that session. Client messages are ignored apart from close frames.
//! The heartbeat also keeps the session from being dropped as idle.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::time::interval;
use tracing::{debug, info};

use virox_feed::{Feed, FeedHub};

use crate::extract::PageFeed;
use crate::handlers::feed::FeedResponse;
use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Feed push endpoint.
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    PageFeed(feed): PageFeed,
) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection("feed");

    ws.on_upgrade(|socket| async move {
        handle_feed_socket(socket, state.hub, feed).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

async fn handle_feed_socket(socket: WebSocket, hub: FeedHub, feed: Feed) {
    let (mut sender, mut receiver) = socket.split();
    let mut changes = feed.changes();
    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    if !send_feed(&mut sender, &feed).await {
        return;
    }
    info!(session = %feed.id(), "Feed socket connected");

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() || !send_feed(&mut sender, &feed).await {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if hub.session(feed.id()).await.is_none() {
                    debug!(session = %feed.id(), "Session dropped, closing socket");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => metrics::record_ws_message_received("feed"),
            },
        }
    }

    debug!("Feed socket closed");
}

async fn send_feed<S>(sender: &mut S, feed: &Feed) -> bool
where
    S: Sink<Message> + Unpin,
{
    let state = FeedResponse::from_feed(feed).await;
    let json = match serde_json::to_string(&state) {
        Ok(json) => json,
        Err(_) => return false,
    };

    let sent = sender.send(Message::Text(json)).await.is_ok();
    if sent {
        metrics::record_ws_message_sent("feed", "feed");
    }
    sent
}
