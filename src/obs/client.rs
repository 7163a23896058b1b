//! OBS WebSocket API client
//!
//! Controls OBS Studio via the obs-websocket 5.x protocol (built into OBS 28+).
//! Default endpoint: ws://{host}:{port}
//!
//! One connection per session: no pooling and no retries. A failed call is
//! reported to the caller, which decides whether the run can continue.

use super::{Connector, ControlSession, Endpoint, Request};
use crate::error::{CallError, SessionError};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

/// Global request ID counter
static REQUEST_ID: AtomicU32 = AtomicU32::new(1);

/// Generate a unique request ID
fn next_request_id() -> String {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst).to_string()
}

type OBSWebSocket = WebSocket<MaybeTlsStream<std::net::TcpStream>>;

/// OBS WebSocket Hello message (server -> client)
#[derive(Debug, Deserialize)]
struct Hello {
    #[serde(rename = "obsWebSocketVersion")]
    obs_websocket_version: String,
    authentication: Option<AuthChallenge>,
}

/// Authentication challenge from server
#[derive(Debug, Deserialize)]
struct AuthChallenge {
    challenge: String,
    salt: String,
}

/// Identified response (after successful auth)
#[derive(Debug, Deserialize)]
struct Identified {
    #[serde(rename = "negotiatedRpcVersion")]
    negotiated_rpc_version: u32,
}

/// OBS WebSocket message wrapper
#[derive(Debug, Deserialize)]
struct OBSMessage {
    op: u32,
    d: Value,
}

/// Body of a RequestResponse (op 7)
#[derive(Debug, Deserialize)]
struct RequestResponse {
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(rename = "requestStatus")]
    request_status: RequestStatus,
    #[serde(rename = "responseData", default)]
    response_data: Option<Value>,
}

/// Response status from OBS
#[derive(Debug, Deserialize)]
struct RequestStatus {
    result: bool,
    code: u32,
    #[serde(default)]
    comment: Option<String>,
}

/// OBS WebSocket op codes
mod op {
    pub const HELLO: u32 = 0;
    pub const IDENTIFY: u32 = 1;
    pub const IDENTIFIED: u32 = 2;
    pub const REQUEST: u32 = 6;
    pub const REQUEST_RESPONSE: u32 = 7;
}

/// WebSocket close code OBS sends after a bad Identify
const CLOSE_AUTHENTICATION_FAILED: u16 = 4009;

/// Generate authentication string per obs-websocket protocol
fn generate_auth_string(password: &str, challenge: &str, salt: &str) -> String {
    // Step 1: Concatenate password + salt, then SHA256
    let secret_string = format!("{}{}", password, salt);
    let secret_hash = Sha256::digest(secret_string.as_bytes());
    let secret_base64 = base64::engine::general_purpose::STANDARD.encode(secret_hash);

    // Step 2: Concatenate secret_base64 + challenge, then SHA256
    let auth_string = format!("{}{}", secret_base64, challenge);
    let auth_hash = Sha256::digest(auth_string.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(auth_hash)
}

/// Build the Identify message. Event subscriptions are disabled so the
/// request/response stream is not interleaved with events.
fn identify_message(authentication: Option<String>) -> Value {
    let mut d = json!({
        "rpcVersion": 1,
        "eventSubscriptions": 0
    });
    if let Some(auth) = authentication {
        d["authentication"] = Value::String(auth);
    }
    json!({ "op": op::IDENTIFY, "d": d })
}

/// Build a Request message
fn request_message(request: &Request, request_id: &str) -> Value {
    let mut d = json!({
        "requestType": request.request_type(),
        "requestId": request_id
    });
    if let Some(data) = request.request_data() {
        d["requestData"] = data;
    }
    json!({ "op": op::REQUEST, "d": d })
}

/// What came off the socket, with pings and binary frames skipped
#[derive(Debug)]
enum Incoming {
    Frame(OBSMessage),
    Invalid(String),
    Closed { code: Option<u16>, reason: String },
}

fn read_incoming(socket: &mut OBSWebSocket) -> Result<Incoming, tungstenite::Error> {
    loop {
        match socket.read()? {
            Message::Text(text) => {
                return Ok(match serde_json::from_str::<OBSMessage>(&text) {
                    Ok(msg) => Incoming::Frame(msg),
                    Err(e) => Incoming::Invalid(e.to_string()),
                });
            }
            Message::Close(frame) => {
                return Ok(match frame {
                    Some(f) => Incoming::Closed {
                        code: Some(u16::from(f.code)),
                        reason: f.reason.into_owned(),
                    },
                    None => Incoming::Closed {
                        code: None,
                        reason: String::new(),
                    },
                });
            }
            _ => continue,
        }
    }
}

/// Classify whatever arrived in place of Identified
fn identify_failure(incoming: Incoming) -> SessionError {
    match incoming {
        Incoming::Closed {
            code: Some(CLOSE_AUTHENTICATION_FAILED),
            reason,
        } => SessionError::AuthFailed(if reason.is_empty() {
            "Authentication failed.".to_string()
        } else {
            reason
        }),
        Incoming::Closed { code, reason } => SessionError::Handshake(match code {
            Some(code) => format!("connection closed during identify (code {code}): {reason}"),
            None => "connection closed during identify".to_string(),
        }),
        Incoming::Frame(msg) => {
            SessionError::Handshake(format!("expected Identified, got op {}", msg.op))
        }
        Incoming::Invalid(e) => SessionError::Handshake(format!("invalid Identified message: {e}")),
    }
}

/// Create a new authenticated WebSocket connection to OBS
fn create_connection(endpoint: &Endpoint) -> Result<OBSWebSocket, SessionError> {
    let url = endpoint.url();
    debug!("Connecting to {}", url);

    let (mut socket, _response) = connect(url.as_str()).map_err(SessionError::Connect)?;

    // Step 1: Receive Hello
    let hello = match read_incoming(&mut socket).map_err(SessionError::Connect)? {
        Incoming::Frame(msg) if msg.op == op::HELLO => msg,
        Incoming::Frame(msg) => {
            return Err(SessionError::Handshake(format!(
                "expected Hello message, got op {}",
                msg.op
            )))
        }
        Incoming::Invalid(e) => {
            return Err(SessionError::Handshake(format!("invalid Hello message: {e}")))
        }
        Incoming::Closed { .. } => {
            return Err(SessionError::Handshake("connection closed before Hello".to_string()))
        }
    };

    let hello: Hello = serde_json::from_value(hello.d)
        .map_err(|e| SessionError::Handshake(format!("failed to parse Hello data: {e}")))?;
    debug!("OBS WebSocket {}", hello.obs_websocket_version);

    // Step 2: Send Identify (with optional auth)
    let authentication = match hello.authentication {
        Some(_) if endpoint.password.is_empty() => {
            let _ = socket.close(None);
            return Err(SessionError::AuthRequired);
        }
        Some(auth) => Some(generate_auth_string(
            &endpoint.password,
            &auth.challenge,
            &auth.salt,
        )),
        None => None,
    };

    socket
        .send(Message::Text(identify_message(authentication).to_string()))
        .map_err(SessionError::Connect)?;

    // Step 3: Receive Identified
    match read_incoming(&mut socket).map_err(SessionError::Connect)? {
        Incoming::Frame(msg) if msg.op == op::IDENTIFIED => {
            let identified: Identified = serde_json::from_value(msg.d).map_err(|e| {
                SessionError::Handshake(format!("failed to parse Identified data: {e}"))
            })?;
            debug!("Negotiated RPC version {}", identified.negotiated_rpc_version);
            Ok(socket)
        }
        other => Err(identify_failure(other)),
    }
}

/// Read until the RequestResponse for `request_id`, skipping anything else
fn await_response(
    name: &'static str,
    request_id: &str,
    mut next: impl FnMut() -> Result<Incoming, tungstenite::Error>,
) -> Result<RequestResponse, CallError> {
    let transport = |source| CallError::Transport { request: name, source };

    loop {
        match next().map_err(transport)? {
            Incoming::Frame(msg) if msg.op == op::REQUEST_RESPONSE => {
                let response: RequestResponse =
                    serde_json::from_value(msg.d).map_err(|e| CallError::MalformedResponse {
                        request: name,
                        detail: format!("failed to parse response: {e}"),
                    })?;
                if response.request_id == request_id {
                    return Ok(response);
                }
            }
            Incoming::Frame(_) | Incoming::Invalid(_) => continue,
            Incoming::Closed { code, reason } => {
                debug!("Closed mid-request (code {:?}): {}", code, reason);
                return Err(transport(tungstenite::Error::ConnectionClosed));
            }
        }
    }
}

/// Send a request on a socket, returning its responseData
fn send_request_on_socket(socket: &mut OBSWebSocket, request: &Request) -> Result<Value, CallError> {
    let name = request.request_type();
    let request_id = next_request_id();

    debug!("-> {} ({})", name, request_id);
    socket
        .send(Message::Text(request_message(request, &request_id).to_string()))
        .map_err(|source| CallError::Transport { request: name, source })?;

    let response = await_response(name, &request_id, || read_incoming(socket))?;

    debug!("<- {} ({}) code {}", name, request_id, response.request_status.code);

    if !response.request_status.result {
        let status = response.request_status;
        return Err(CallError::Rejected {
            request: name,
            code: status.code,
            comment: status
                .comment
                .unwrap_or_else(|| format!("Error code {}", status.code)),
        });
    }

    Ok(response.response_data.unwrap_or(Value::Null))
}

/// Opens sessions over a real WebSocket
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Session = WebSocketSession;

    fn connect(&self, endpoint: &Endpoint) -> Result<WebSocketSession, SessionError> {
        let socket = create_connection(endpoint)?;
        Ok(WebSocketSession {
            socket: Some(socket),
        })
    }
}

/// How long `disconnect` waits for each frame while draining the close
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
const CLOSE_DRAIN_FRAMES: usize = 32;

/// An identified obs-websocket connection
pub struct WebSocketSession {
    socket: Option<OBSWebSocket>,
}

impl ControlSession for WebSocketSession {
    fn call(&mut self, request: &Request) -> Result<Value, CallError> {
        match self.socket.as_mut() {
            Some(socket) => send_request_on_socket(socket, request),
            None => Err(CallError::Transport {
                request: request.request_type(),
                source: tungstenite::Error::AlreadyClosed,
            }),
        }
    }

    fn disconnect(&mut self) {
        let Some(mut socket) = self.socket.take() else {
            return;
        };
        if let MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            // A server that never answers the close must not stall teardown
            let _ = tcp.set_read_timeout(Some(CLOSE_DRAIN_TIMEOUT));
        }
        if socket.close(None).is_ok() {
            // Drain until the server acknowledges the close
            for _ in 0..CLOSE_DRAIN_FRAMES {
                if socket.read().is_err() {
                    break;
                }
            }
        }
        debug!("Disconnected from OBS");
    }
}

impl Drop for WebSocketSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
