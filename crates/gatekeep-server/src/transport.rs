//! WebSocket transport for the gate channel.
//!
//! Frames on one connection are handled concurrently, each in its own task,
//! and replies are funnelled through a single writer. Requests for the same
//! badge are chained so they reach the session in arrival order. A client
//! that goes away does not cancel in-flight requests: the decision and its
//! state change still complete, only the reply is dropped.

use std::{collections::HashMap, sync::Arc};

use axum::{
  extract::{
    State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use futures::{SinkExt as _, StreamExt as _};
use gatekeep_core::{BadgeId, audit::AuditSink, store::SubjectStore};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
  AppState,
  protocol::{ResponseFrame, parse_request},
  session::GateService,
};

/// Replies buffered per connection before request tasks start waiting.
const REPLY_BUFFER: usize = 64;

/// Finished chain links are pruned once this many badges are tracked.
const ORDER_SWEEP_AT: usize = 64;

// ─── Per-badge ordering ──────────────────────────────────────────────────────

/// Arrival order of in-flight requests on one connection, per badge.
///
/// Each request gets a completion signal for its successor and, if an
/// earlier request for the same badge is still running, that request's
/// signal to wait on.
#[derive(Default)]
struct BadgeOrder {
  tails: HashMap<BadgeId, oneshot::Receiver<()>>,
}

/// One request's place in its badge chain.
struct Slot {
  after: Option<oneshot::Receiver<()>>,
  done:  oneshot::Sender<()>,
}

impl BadgeOrder {
  fn enqueue(&mut self, badge: &BadgeId) -> Slot {
    if self.tails.len() >= ORDER_SWEEP_AT {
      self.sweep();
    }
    let (done, tail) = oneshot::channel();
    let after = self.tails.insert(badge.clone(), tail);
    Slot { after, done }
  }

  /// Drop links whose request has already finished.
  fn sweep(&mut self) {
    self.tails.retain(|_, tail| {
      matches!(tail.try_recv(), Err(oneshot::error::TryRecvError::Empty))
    });
  }
}

impl Slot {
  /// Run `work` once the previous request for this badge has finished.
  async fn run<T>(self, work: impl Future<Output = T>) -> T {
    if let Some(after) = self.after {
      // A dropped sender means the predecessor is gone either way.
      let _ = after.await;
    }
    let out = work.await;
    let _ = self.done.send(());
    out
  }
}

/// `GET /gate` — upgrade to a WebSocket speaking the gate protocol.
pub async fn ws_handler<S, A>(
  ws: WebSocketUpgrade,
  State(state): State<AppState<S, A>>,
) -> Response
where
  S: SubjectStore + 'static,
  A: AuditSink + 'static,
{
  ws.on_upgrade(move |socket| handle_socket(socket, state.gate))
}

async fn handle_socket<S, A>(socket: WebSocket, gate: Arc<GateService<S, A>>)
where
  S: SubjectStore + 'static,
  A: AuditSink + 'static,
{
  let (mut sender, mut receiver) = socket.split();
  let (tx, mut rx) = mpsc::channel::<ResponseFrame>(REPLY_BUFFER);
  let mut order = BadgeOrder::default();

  info!("gate client connected");

  let writer = tokio::spawn(async move {
    while let Some(frame) = rx.recv().await {
      let text = match serde_json::to_string(&frame) {
        Ok(text) => text,
        Err(err) => {
          warn!(%err, "failed to encode reply");
          continue;
        }
      };
      if sender.send(Message::Text(text.into())).await.is_err() {
        debug!("send failed, client disconnected");
        break;
      }
    }
  });

  while let Some(msg) = receiver.next().await {
    let text = match msg {
      Ok(Message::Text(text)) => text,
      Ok(Message::Close(_)) => break,
      Ok(_) => continue,
      Err(err) => {
        debug!(%err, "websocket read failed");
        break;
      }
    };

    let tx = tx.clone();
    match parse_request(text.as_str()) {
      Ok(request) => {
        let gate = gate.clone();
        let slot = order.enqueue(&request.badge);
        tokio::spawn(async move {
          let open = slot
            .run(gate.handle(request.direction(), &request.badge))
            .await;
          let _ = tx.send(request.reply(open)).await;
        });
      }
      Err(reply) => {
        warn!(frame = %text.as_str(), "rejected frame");
        let _ = tx.send(reply).await;
      }
    }
  }

  // Let in-flight requests finish and flush their replies.
  drop(tx);
  let _ = writer.await;
  info!("gate client disconnected");
}
