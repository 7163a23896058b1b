//! Typed obs-websocket requests used by the configurator.

use crate::error::CallError;
use serde_json::{json, Value};

/// The subset of obs-websocket requests this tool issues.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    GetSceneList,
    CreateScene {
        scene: String,
    },
    RemoveInput {
        input: String,
    },
    CreateInput {
        scene: String,
        input: String,
        kind: String,
        settings: Value,
    },
    SetCurrentProgramScene {
        scene: String,
    },
    GetVirtualCamStatus,
    StartVirtualCam,
    StopVirtualCam,
}

impl Request {
    /// `requestType` on the wire
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::GetSceneList => "GetSceneList",
            Self::CreateScene { .. } => "CreateScene",
            Self::RemoveInput { .. } => "RemoveInput",
            Self::CreateInput { .. } => "CreateInput",
            Self::SetCurrentProgramScene { .. } => "SetCurrentProgramScene",
            Self::GetVirtualCamStatus => "GetVirtualCamStatus",
            Self::StartVirtualCam => "StartVirtualCam",
            Self::StopVirtualCam => "StopVirtualCam",
        }
    }

    /// `requestData` on the wire, if the request takes any
    pub fn request_data(&self) -> Option<Value> {
        match self {
            Self::CreateScene { scene } | Self::SetCurrentProgramScene { scene } => {
                Some(json!({ "sceneName": scene }))
            }
            Self::RemoveInput { input } => Some(json!({ "inputName": input })),
            Self::CreateInput {
                scene,
                input,
                kind,
                settings,
            } => Some(json!({
                "sceneName": scene,
                "inputName": input,
                "inputKind": kind,
                "inputSettings": settings,
            })),
            Self::GetSceneList
            | Self::GetVirtualCamStatus
            | Self::StartVirtualCam
            | Self::StopVirtualCam => None,
        }
    }
}

/// Scene names from a `GetSceneList` response
pub fn scene_names(data: &Value) -> Result<Vec<String>, CallError> {
    let scenes = data
        .get("scenes")
        .and_then(|v| v.as_array())
        .ok_or_else(|| CallError::MalformedResponse {
            request: "GetSceneList",
            detail: "missing scenes array".to_string(),
        })?;

    Ok(scenes
        .iter()
        .filter_map(|s| s.get("sceneName").and_then(|n| n.as_str()))
        .map(|s| s.to_string())
        .collect())
}

/// `outputActive` from a `GetVirtualCamStatus` response
pub fn output_active(data: &Value) -> Result<bool, CallError> {
    data.get("outputActive")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| CallError::MalformedResponse {
            request: "GetVirtualCamStatus",
            detail: "missing outputActive".to_string(),
        })
}
