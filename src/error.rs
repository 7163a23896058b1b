//! Error taxonomy shared by the configurator and the probe.

use crate::configurator::Step;
use std::path::PathBuf;
use thiserror::Error;

/// Problems resolving the configuration before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no stream address provided")]
    MissingStreamAddress,

    #[error("failed to read settings file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure to open (or keep) a control session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not reach OBS WebSocket: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("handshake with OBS failed: {0}")]
    Handshake(String),

    #[error("OBS WebSocket requires a password")]
    AuthRequired,

    #[error("OBS rejected the password: {0}")]
    AuthFailed(String),
}

impl SessionError {
    /// True when supplying (another) credential could fix the failure.
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::AuthFailed(_))
    }
}

/// A single remote request that did not succeed.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("connection error during {request}: {source}")]
    Transport {
        request: &'static str,
        #[source]
        source: tungstenite::Error,
    },

    #[error("{request} rejected by OBS (code {code}): {comment}")]
    Rejected {
        request: &'static str,
        code: u32,
        comment: String,
    },

    #[error("unexpected response to {request}: {detail}")]
    MalformedResponse {
        request: &'static str,
        detail: String,
    },
}

/// Top-level failure of a configurator run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not connect to OBS WebSocket")]
    Session(#[from] SessionError),

    #[error("{step} failed")]
    Step {
        step: Step,
        #[source]
        source: CallError,
    },
}

impl RunError {
    /// Remediation text printed after the error itself.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Config(ConfigError::MissingStreamAddress) => {
                "Either pass it as an argument, set ANDROID_IP, or add stream_address to the settings file.\n\
                 \n\
                 Example usage:\n  \
                 ipcam-vcam 192.168.1.100:8080"
            }
            Self::Config(_) => "Fix or remove the settings file, or point --config at another one.",
            Self::Session(e) if e.requires_credential() => {
                "Pass the OBS WebSocket password with --control-credential (run obs-probe to test it)."
            }
            Self::Session(_) => {
                "Make sure:\n  \
                 1. OBS Studio is running\n  \
                 2. WebSocket server is enabled in OBS\n     \
                 (Tools → WebSocket Server Settings)"
            }
            Self::Step { step: Step::CreateSource, .. } => {
                "Check that the browser source plugin is available in OBS."
            }
            Self::Step { .. } => "Check that the OBS virtual camera is installed and not in use.",
        }
    }
}
