// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! WebSocket sessions for renderer clients.
//! Each connection registers with the [`Hub`] and receives every broadcast as a binary frame.

use std::{collections::HashSet, net::SocketAddr, sync::Arc};

use axum::body::Bytes;
use axum::{
    extract::ws::{close_code, CloseFrame, Message, WebSocket},
    extract::{ConnectInfo, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinError;
use tokio::{
    sync::mpsc,
    time::{self, Duration},
};
use tracing::{debug, error, info, warn};

use crate::hub::Hub;

type TaskResult<T> = std::result::Result<T, JoinError>;

/// Per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Hub outbox size; a session that falls this far behind is evicted.
    pub buffer: usize,
    /// Accepted `Origin` header values; `None` accepts any.
    pub allow_origins: Option<HashSet<String>>,
    /// Keepalive period.
    pub ping_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer: 256,
            allow_origins: None,
            ping_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
struct AppState {
    hub: Hub,
    config: SessionConfig,
}

/// Builds the HTTP app serving renderer sessions on `/ws`.
pub fn app(hub: Hub, config: SessionConfig) -> Router {
    let state = Arc::new(AppState { hub, config });
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if !origin_allowed(state.config.allow_origins.as_ref(), &headers) {
        let origin = headers
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<missing>");
        warn!(?addr, origin = %origin, "origin rejected");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, peer: SocketAddr) {
    let (id, mut hub_rx) = state.hub.register(state.config.buffer).await;
    info!(?peer, session = id, "renderer connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(16);

    // Writer task: every outbound frame goes through here
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Hub -> WS; ends when the hub evicts or drops this session
    let hub_tx = out_tx.clone();
    let hub_to_ws = tokio::spawn(async move {
        while let Some(payload) = hub_rx.recv().await {
            if hub_tx.send(Message::Binary(payload)).await.is_err() {
                break;
            }
        }
    });

    let pong_tx = out_tx.clone();
    let client = tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Ping(payload)) => {
                    let _ = pong_tx.send(Message::Pong(payload)).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    debug!(?peer, "ignoring client frame");
                }
                Err(err) => {
                    warn!(?err, ?peer, "ws recv error");
                    break;
                }
                _ => {}
            }
        }
    });

    let ping_tx = out_tx.clone();
    let period = state.config.ping_interval;
    let ping = tokio::spawn(async move {
        let mut interval = time::interval(period);
        // first tick is immediate
        interval.tick().await;
        loop {
            interval.tick().await;
            if ping_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                break;
            }
        }
    });

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum EndKind {
        Client,
        Hub,
        Writer,
    }

    let mut client = client;
    let mut hub_to_ws = hub_to_ws;
    let mut writer = writer;

    let (end_kind, res) = tokio::select! {
        res = &mut client => (EndKind::Client, res),
        res = &mut hub_to_ws => (EndKind::Hub, res),
        res = &mut writer => (EndKind::Writer, res),
    };

    state.hub.unregister(id).await;

    if end_kind == EndKind::Hub {
        warn!(?peer, session = id, "session evicted; closing websocket");
        let _ = time::timeout(
            Duration::from_millis(250),
            out_tx.send(Message::Close(Some(CloseFrame {
                code: close_code::AGAIN,
                reason: "renderer fell behind".into(),
            }))),
        )
        .await;
    }

    ping.abort();
    client.abort();
    hub_to_ws.abort();
    drop(out_tx);

    // Best-effort flush for the close frame
    if end_kind != EndKind::Writer {
        match time::timeout(Duration::from_secs(1), &mut writer).await {
            Ok(res) => log_task_result("writer", peer, res),
            Err(_) => {
                writer.abort();
                log_task_result("writer", peer, writer.await);
            }
        }
    }

    let name = match end_kind {
        EndKind::Client => "client",
        EndKind::Hub => "hub_to_ws",
        EndKind::Writer => "writer",
    };
    log_task_result(name, peer, res);
    log_task_result("ping", peer, ping.await);
    match end_kind {
        EndKind::Client => log_task_result("hub_to_ws", peer, hub_to_ws.await),
        EndKind::Hub => log_task_result("client", peer, client.await),
        EndKind::Writer => {
            log_task_result("client", peer, client.await);
            log_task_result("hub_to_ws", peer, hub_to_ws.await);
        }
    }
    info!(?peer, session = id, reason = ?end_kind, "renderer disconnected");
}

/// Whether a handshake with `headers` passes the origin allow-list.
pub fn origin_allowed(allow: Option<&HashSet<String>>, headers: &HeaderMap) -> bool {
    let Some(allow) = allow else {
        return true;
    };
    if let Some(origin) = headers.get("origin") {
        if let Ok(origin_str) = origin.to_str() {
            return allow.contains(origin_str);
        }
    }
    false
}

fn log_task_result(name: &'static str, peer: SocketAddr, res: TaskResult<()>) {
    let Err(err) = res else {
        return;
    };
    if err.is_cancelled() {
        return;
    }
    if err.is_panic() {
        error!(?peer, ?err, "{name} task panicked");
    } else {
        warn!(?peer, ?err, "{name} task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(origin: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(origin) = origin {
            headers.insert("origin", HeaderValue::from_static(origin));
        }
        headers
    }

    #[test]
    fn any_origin_without_allow_list() {
        assert!(origin_allowed(None, &headers(None)));
        assert!(origin_allowed(None, &headers(Some("http://evil"))));
    }

    #[test]
    fn allow_list_is_exact() {
        let allow: HashSet<String> = ["http://viewer.local".to_owned()].into();
        assert!(origin_allowed(Some(&allow), &headers(Some("http://viewer.local"))));
        assert!(!origin_allowed(Some(&allow), &headers(Some("http://viewer.local:8080"))));
        assert!(!origin_allowed(Some(&allow), &headers(None)));
    }
}
