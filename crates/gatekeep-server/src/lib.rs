//! Gate decision server.
//!
//! Exposes an axum [`Router`] that serves the realtime gate channel over a
//! WebSocket, backed by any [`SubjectStore`] and [`AuditSink`].

pub mod audit;
pub mod error;
pub mod locks;
pub mod protocol;
pub mod session;
pub mod settings;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

use std::sync::Arc;

use axum::{Router, routing::get};
use gatekeep_core::{audit::AuditSink, store::SubjectStore};
use tower_http::trace::TraceLayer;

use session::GateService;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, A> {
  pub gate: Arc<GateService<S, A>>,
}

impl<S, A> AppState<S, A> {
  pub fn new(gate: GateService<S, A>) -> Self { Self { gate: Arc::new(gate) } }
}

impl<S, A> Clone for AppState<S, A> {
  fn clone(&self) -> Self { Self { gate: self.gate.clone() } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S, A>(state: AppState<S, A>) -> Router
where
  S: SubjectStore + 'static,
  A: AuditSink + 'static,
{
  Router::new()
    .route("/gate", get(transport::ws_handler::<S, A>))
    .route("/healthz", get(healthz))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn healthz() -> &'static str { "ok" }

#[cfg(test)]
mod tests {
  use std::{net::SocketAddr, time::Duration};

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use futures::{SinkExt as _, StreamExt as _};
  use gatekeep_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tokio::net::TcpListener;
  use tokio_tungstenite::{connect_async, tungstenite::Message};
  use tower::ServiceExt as _;

  use super::*;
  use crate::{
    session::GatePolicy,
    testing::{MemorySink, badge},
  };

  async fn make_state() -> AppState<SqliteStore, MemorySink> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let policy = GatePolicy {
      request_timeout: Duration::from_secs(1),
      ..GatePolicy::default()
    };
    AppState::new(GateService::new(
      Arc::new(store),
      Arc::new(MemorySink::default()),
      policy,
    ))
  }

  type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
  >;

  async fn send(ws: &mut Client, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
  }

  async fn recv(ws: &mut Client) -> Value {
    let reply = ws.next().await.unwrap().unwrap();
    serde_json::from_str(reply.to_text().unwrap()).unwrap()
  }

  /// Send one frame and wait for the next reply.
  async fn ask(ws: &mut Client, frame: Value) -> Value {
    send(ws, frame).await;
    recv(ws).await
  }

  async fn serve(state: AppState<SqliteStore, MemorySink>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router(state)).await.unwrap();
    });
    addr
  }

  // ── HTTP ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn healthz_returns_ok() {
    let state = make_state().await;
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
  }

  #[tokio::test]
  async fn gate_without_upgrade_is_rejected() {
    let state = make_state().await;
    let req = Request::builder().uri("/gate").body(Body::empty()).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert!(resp.status().is_client_error(), "status: {}", resp.status());
  }

  // ── WebSocket ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn websocket_guest_round_trip() {
    let state = make_state().await;
    let addr = serve(state.clone()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/gate")).await.unwrap();

    let enter = |id: u64| json!({ "event": "enterRequest", "data": "G1", "id": id });
    let r = ask(&mut ws, enter(1)).await;
    assert_eq!(r, json!({ "event": "enterResponse", "data": 1, "id": 1 }));

    let r = ask(&mut ws, enter(2)).await;
    assert_eq!(r, json!({ "event": "enterResponse", "data": 0, "id": 2 }));

    let exit = json!({ "event": "exitRequest", "data": "G1", "id": 3 });
    let r = ask(&mut ws, exit).await;
    assert_eq!(r, json!({ "event": "exitResponse", "data": 1, "id": 3 }));

    let r = ask(&mut ws, json!({ "event": "exitRequest", "data": "G1" })).await;
    assert_eq!(r, json!({ "event": "exitResponse", "data": 0 }));

    assert!(state.gate.store().list_guests().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn websocket_member_and_bad_frames() {
    let state = make_state().await;
    state.gate.store().add_member(&badge("4242"), None).await.unwrap();
    let addr = serve(state.clone()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/gate")).await.unwrap();

    let enter = json!({ "event": "enterRequest", "data": 4242 });
    let reply = ask(&mut ws, enter).await;
    assert_eq!(reply["event"], "enterResponse");
    assert_eq!(reply["data"], 1);

    ws.send(Message::Text("not json".to_string().into())).await.unwrap();
    let reply = recv(&mut ws).await;
    assert_eq!(reply["event"], "error");
    assert_eq!(reply["data"], 0);

    let member =
      state.gate.store().find_member_by_badge(&badge("4242")).await.unwrap();
    assert!(member.unwrap().is_currently_in);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn websocket_pipelined_enter_exit() {
    let state = make_state().await;
    let addr = serve(state.clone()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/gate")).await.unwrap();

    for i in 0..20 {
      let id = format!("P{i}");
      send(&mut ws, json!({ "event": "enterRequest", "data": id, "id": 1 }))
        .await;
      send(&mut ws, json!({ "event": "exitRequest", "data": id, "id": 2 }))
        .await;

      let mut replies = vec![recv(&mut ws).await, recv(&mut ws).await];
      replies.sort_by_key(|r| r["id"].as_u64());
      assert_eq!(replies, [
        json!({ "event": "enterResponse", "data": 1, "id": 1 }),
        json!({ "event": "exitResponse", "data": 1, "id": 2 }),
      ]);
    }
    assert!(state.gate.store().list_guests().await.unwrap().is_empty());
  }
}
