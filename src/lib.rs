//! Feed an Android IP Webcam stream into the OBS virtual camera.
//!
//! [`configurator`] drives OBS over obs-websocket; [`probe`] checks the
//! connection and whether OBS wants a password.

pub mod config;
pub mod configurator;
pub mod error;
pub mod logging;
pub mod obs;
pub mod probe;
pub mod prompt;
pub mod shutdown;
pub mod stream;

pub mod app_constants {
    /// Lowercase name for paths (e.g. the settings directory)
    pub const APP_NAME_LOWER: &str = env!("CARGO_PKG_NAME");
}

pub use config::Config;
pub use error::{CallError, ConfigError, RunError, SessionError};
