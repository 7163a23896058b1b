//! OBS Studio control session.
//!
//! Talks to OBS over the obs-websocket 5.x protocol (built into OBS 28+).
//! The workflow code only sees the [`Connector`] and [`ControlSession`]
//! traits, so it can run against the real WebSocket client or an
//! in-memory fake.

pub mod client;
pub mod request;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{WebSocketConnector, WebSocketSession};
pub use request::Request;

use crate::error::{CallError, SessionError};
use serde_json::Value;

/// Default obs-websocket port.
pub const DEFAULT_PORT: u16 = 4455;

/// Connection parameters for OBS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Empty means "no password"
    pub password: String,
}

impl Endpoint {
    pub fn new(host: &str, port: u16, password: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            password: password.to_string(),
        }
    }

    /// WebSocket URL for this endpoint
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Opens control sessions.
pub trait Connector {
    type Session: ControlSession;

    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Session, SessionError>;
}

/// An open, identified control session.
pub trait ControlSession {
    /// Send one request and return its `responseData` (or `Null` when the
    /// request has no response payload).
    fn call(&mut self, request: &Request) -> Result<Value, CallError>;

    /// Close the session. Calling it again is a no-op.
    fn disconnect(&mut self);
}
