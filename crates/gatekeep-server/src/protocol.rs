//! Wire format for the realtime gate channel.
//!
//! Each WebSocket text frame carries one JSON event, named after the
//! socket.io events the gate readers already emit:
//!
//! | Direction | Frame |
//! |-----------|-------|
//! | in  | `{"event":"enterRequest","data":"<badge>","id":7}` |
//! | in  | `{"event":"exitRequest","data":"<badge>"}` |
//! | out | `{"event":"enterResponse","data":1,"id":7}` |
//! | out | `{"event":"exitResponse","data":0}` |
//! | out | `{"event":"error","data":0,"message":"..."}` |
//!
//! `id` is optional and echoed back untouched. `data` may be a string or an
//! integer badge.

use gatekeep_core::{BadgeId, decision::Direction};
use serde::{Deserialize, Serialize};

// ─── Inbound ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestEvent {
  EnterRequest,
  ExitRequest,
}

impl RequestEvent {
  pub fn direction(self) -> Direction {
    match self {
      Self::EnterRequest => Direction::Enter,
      Self::ExitRequest => Direction::Exit,
    }
  }

  pub fn response(self) -> ResponseEvent {
    match self {
      Self::EnterRequest => ResponseEvent::EnterResponse,
      Self::ExitRequest => ResponseEvent::ExitResponse,
    }
  }
}

/// A frame as received, before the badge is validated.
#[derive(Debug, Deserialize)]
pub struct RequestFrame {
  pub event: RequestEvent,
  #[serde(default)]
  pub data:  serde_json::Value,
  #[serde(default)]
  pub id:    Option<u64>,
}

/// A validated gate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRequest {
  pub event: RequestEvent,
  pub badge: BadgeId,
  pub id:    Option<u64>,
}

impl GateRequest {
  pub fn direction(&self) -> Direction { self.event.direction() }

  pub fn reply(&self, open: bool) -> ResponseFrame {
    ResponseFrame::decision(self.event.response(), open, self.id)
  }
}

/// Parse one text frame. On failure the `Err` holds the reply to send
/// instead, so a malformed request still gets exactly one answer.
pub fn parse_request(text: &str) -> Result<GateRequest, ResponseFrame> {
  let frame: RequestFrame = serde_json::from_str(text)
    .map_err(|e| ResponseFrame::error(format!("malformed frame: {e}")))?;

  match BadgeId::deserialize(&frame.data) {
    Ok(badge) => Ok(GateRequest { event: frame.event, badge, id: frame.id }),
    Err(e) => {
      let mut reply =
        ResponseFrame::decision(frame.event.response(), false, frame.id);
      reply.message = Some(format!("invalid badge: {e}"));
      Err(reply)
    }
  }
}

// ─── Outbound ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseEvent {
  EnterResponse,
  ExitResponse,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFrame {
  pub event:   ResponseEvent,
  /// `1` to open the gate, `0` otherwise.
  pub data:    u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id:      Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl ResponseFrame {
  pub fn decision(event: ResponseEvent, open: bool, id: Option<u64>) -> Self {
    Self {
      event,
      data: u8::from(open),
      id,
      message: None,
    }
  }

  pub fn error(message: String) -> Self {
    Self {
      event:   ResponseEvent::Error,
      data:    0,
      id:      None,
      message: Some(message),
    }
  }
}
