//! In-memory OBS used by the workflow tests.

use super::{Connector, ControlSession, Endpoint, Request};
use crate::error::{CallError, SessionError};
use crate::shutdown::ShutdownSignal;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

/// An input as OBS would hold it
#[derive(Debug, Clone, PartialEq)]
pub struct FakeInput {
    pub name: String,
    pub scene: String,
    pub kind: String,
    pub settings: Value,
}

/// Remote state plus a log of what was asked of it
#[derive(Debug, Default)]
pub struct FakeState {
    pub scenes: Vec<String>,
    pub inputs: Vec<FakeInput>,
    pub program_scene: Option<String>,
    pub virtual_cam_active: bool,
    pub password: String,
    /// Request types that should be rejected
    pub failing: HashSet<&'static str>,
    pub calls: Vec<&'static str>,
    pub connects: Vec<Endpoint>,
    pub disconnects: usize,
    /// Fires the signal once "connect" or the named request has been handled
    pub interrupt: Option<(&'static str, Arc<ShutdownSignal>)>,
}

impl FakeState {
    fn handled(&self, name: &str) {
        if let Some((at, signal)) = &self.interrupt {
            if *at == name {
                signal.trigger();
            }
        }
    }
}

/// Shared handle so a test can inspect state after the run
#[derive(Debug, Clone, Default)]
pub struct FakeObs {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeObs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(password: &str) -> Self {
        let obs = Self::new();
        obs.state.borrow_mut().password = password.to_string();
        obs
    }

    pub fn fail(&self, request_type: &'static str) -> &Self {
        self.state.borrow_mut().failing.insert(request_type);
        self
    }

    /// Press Ctrl+C as soon as `at` ("connect" or a request type) is handled.
    pub fn interrupt_after(&self, at: &'static str) -> Arc<ShutdownSignal> {
        let signal = Arc::new(ShutdownSignal::new());
        self.state.borrow_mut().interrupt = Some((at, Arc::clone(&signal)));
        signal
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, request_type: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| **c == request_type)
            .count()
    }
}

pub struct FakeSession {
    state: Rc<RefCell<FakeState>>,
    open: bool,
}

impl Connector for FakeObs {
    type Session = FakeSession;

    fn connect(&self, endpoint: &Endpoint) -> Result<FakeSession, SessionError> {
        let mut state = self.state.borrow_mut();
        state.connects.push(endpoint.clone());

        if state.failing.contains("connect") {
            return Err(SessionError::Handshake("connection refused".to_string()));
        }
        if !state.password.is_empty() {
            if endpoint.password.is_empty() {
                return Err(SessionError::AuthRequired);
            }
            if endpoint.password != state.password {
                return Err(SessionError::AuthFailed("Authentication failed.".to_string()));
            }
        }

        state.handled("connect");
        Ok(FakeSession {
            state: Rc::clone(&self.state),
            open: true,
        })
    }
}

fn rejected(request: &'static str, code: u32, comment: &str) -> CallError {
    CallError::Rejected {
        request,
        code,
        comment: comment.to_string(),
    }
}

impl ControlSession for FakeSession {
    fn call(&mut self, request: &Request) -> Result<Value, CallError> {
        let name = request.request_type();
        assert!(self.open, "{name} issued on a closed session");

        let mut state = self.state.borrow_mut();
        state.calls.push(name);
        let result = if state.failing.contains(name) {
            Err(rejected(name, 500, "simulated failure"))
        } else {
            respond(&mut state, request)
        };
        state.handled(name);
        result
    }

    fn disconnect(&mut self) {
        // Counted on every call so tests can catch a double release
        self.open = false;
        self.state.borrow_mut().disconnects += 1;
    }
}

/// What OBS would answer, applied to `state`
fn respond(state: &mut FakeState, request: &Request) -> Result<Value, CallError> {
    let name = request.request_type();
    match request {
        Request::GetSceneList => Ok(json!({
            "scenes": state
                .scenes
                .iter()
                .map(|s| json!({ "sceneName": s }))
                .collect::<Vec<_>>()
        })),
        Request::CreateScene { scene } => {
            if state.scenes.contains(scene) {
                return Err(rejected(name, 601, "A source already exists by that scene name."));
            }
            state.scenes.push(scene.clone());
            Ok(Value::Null)
        }
        Request::RemoveInput { input } => {
            let before = state.inputs.len();
            state.inputs.retain(|i| &i.name != input);
            if state.inputs.len() == before {
                return Err(rejected(name, 600, "No source was found by the name of `input`."));
            }
            Ok(Value::Null)
        }
        Request::CreateInput {
            scene,
            input,
            kind,
            settings,
        } => {
            if !state.scenes.contains(scene) {
                return Err(rejected(name, 600, "No source was found by the name of `sceneName`."));
            }
            if state.inputs.iter().any(|i| &i.name == input) {
                return Err(rejected(name, 601, "A source already exists by that input name."));
            }
            state.inputs.push(FakeInput {
                name: input.clone(),
                scene: scene.clone(),
                kind: kind.clone(),
                settings: settings.clone(),
            });
            Ok(json!({ "inputUuid": "00000000", "sceneItemId": state.inputs.len() }))
        }
        Request::SetCurrentProgramScene { scene } => {
            state.program_scene = Some(scene.clone());
            Ok(Value::Null)
        }
        Request::GetVirtualCamStatus => Ok(json!({ "outputActive": state.virtual_cam_active })),
        Request::StartVirtualCam => {
            if state.virtual_cam_active {
                return Err(rejected(name, 500, "Virtual camera is already active."));
            }
            state.virtual_cam_active = true;
            Ok(Value::Null)
        }
        Request::StopVirtualCam => {
            state.virtual_cam_active = false;
            Ok(Value::Null)
        }
    }
}
