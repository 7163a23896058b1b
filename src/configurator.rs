//! Points OBS at an IP Webcam stream and starts the virtual camera.
//!
//! The run is a fixed sequence of requests. Each step has a [`Severity`]
//! that decides whether its failure aborts the run; the session is
//! released on every path once it has been opened. An interrupt before the
//! virtual camera is up skips the remaining steps and goes straight to
//! teardown.

use crate::config::{Config, FileSettings, Overrides};
use crate::error::{CallError, RunError};
use crate::obs::{request, Connector, ControlSession, Request};
use crate::shutdown::ShutdownSignal;
use crate::stream::stream_url;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info, warn};

pub const SCENE_NAME: &str = "IP Webcam Scene";
pub const SOURCE_NAME: &str = "IP_Webcam_Feed";
/// OBS browser source, which renders the MJPEG page
pub const SOURCE_KIND: &str = "browser_source";
const SOURCE_FPS: u32 = 30;

/// A remote step whose failure is judged by [`Step::severity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    EnsureScene,
    RemoveStaleSource,
    CreateSource,
    ActivateScene,
    EnsureVirtualCam,
    StopVirtualCam,
}

/// What a failed step does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected to fail routinely; debug log only
    Ignore,
    /// Log and carry on
    Warn,
    /// Abort the run (the session is still closed)
    Fatal,
}

impl Step {
    pub fn severity(self) -> Severity {
        match self {
            Self::RemoveStaleSource => Severity::Ignore,
            Self::EnsureScene | Self::ActivateScene | Self::StopVirtualCam => Severity::Warn,
            Self::CreateSource | Self::EnsureVirtualCam => Severity::Fatal,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnsureScene => "managing scenes",
            Self::RemoveStaleSource => "removing old source",
            Self::CreateSource => "creating source",
            Self::ActivateScene => "setting scene",
            Self::EnsureVirtualCam => "starting virtual camera",
            Self::StopVirtualCam => "stopping virtual camera",
        })
    }
}

/// How far setup got before handing over to [`hold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setup {
    Complete,
    Interrupted,
}

/// Apply the step's severity to its result. `Ok(None)` means the step
/// failed but the run continues.
fn settle<T>(step: Step, result: Result<T, CallError>) -> Result<Option<T>, RunError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => match step.severity() {
            Severity::Ignore => {
                debug!("Ignoring failure {}: {}", step, e);
                Ok(None)
            }
            Severity::Warn => {
                warn!("Error {}: {}", step, e);
                Ok(None)
            }
            Severity::Fatal => Err(RunError::Step { step, source: e }),
        },
    }
}

/// Browser source settings for the stream
pub fn source_settings(url: &str, width: u32, height: u32) -> Value {
    json!({
        "url": url,
        "width": width,
        "height": height,
        "fps_custom": true,
        "fps": SOURCE_FPS
    })
}

/// Resolve the configuration layers, then [`run`].
///
/// Nothing is sent to OBS if the layers do not yield a stream address.
pub fn execute<C: Connector>(
    file: FileSettings,
    overrides: Overrides,
    connector: &C,
    shutdown: &ShutdownSignal,
) -> Result<(), RunError> {
    let config = Config::resolve(file, overrides)?;
    run(&config, connector, shutdown)
}

/// Configure OBS, hold the virtual camera open until `shutdown` fires,
/// then stop it.
pub fn run<C: Connector>(
    config: &Config,
    connector: &C,
    shutdown: &ShutdownSignal,
) -> Result<(), RunError> {
    let url = stream_url(&config.stream_address);

    info!("Connecting to OBS at {}:{}...", config.control_host, config.control_port);
    let mut session = connector.connect(&config.endpoint())?;
    info!("✓ Connected to OBS");

    let result = match configure(&mut session, config, &url, shutdown) {
        Ok(Setup::Complete) => {
            hold(&mut session, shutdown);
            Ok(())
        }
        Ok(Setup::Interrupted) => {
            info!("Interrupted during setup");
            Ok(())
        }
        Err(e) => Err(e),
    };

    session.disconnect();
    println!("Done!");
    result
}

fn interrupted_before(shutdown: &ShutdownSignal, next: Step) -> bool {
    let stop = shutdown.is_shutdown();
    if stop {
        debug!("Interrupt seen before {}", next);
    }
    stop
}

fn configure<S: ControlSession>(
    session: &mut S,
    config: &Config,
    url: &str,
    shutdown: &ShutdownSignal,
) -> Result<Setup, RunError> {
    if interrupted_before(shutdown, Step::EnsureScene) {
        return Ok(Setup::Interrupted);
    }
    settle(Step::EnsureScene, ensure_scene(session))?;

    if interrupted_before(shutdown, Step::RemoveStaleSource) {
        return Ok(Setup::Interrupted);
    }
    info!("Setting up video source from: {}", url);
    settle(
        Step::RemoveStaleSource,
        session.call(&Request::RemoveInput {
            input: SOURCE_NAME.to_string(),
        }),
    )?;
    if interrupted_before(shutdown, Step::CreateSource) {
        return Ok(Setup::Interrupted);
    }
    settle(
        Step::CreateSource,
        session.call(&Request::CreateInput {
            scene: SCENE_NAME.to_string(),
            input: SOURCE_NAME.to_string(),
            kind: SOURCE_KIND.to_string(),
            settings: source_settings(url, config.output_width, config.output_height),
        }),
    )?;
    info!("✓ Created video source: {}", SOURCE_NAME);

    if interrupted_before(shutdown, Step::ActivateScene) {
        return Ok(Setup::Interrupted);
    }
    let activated = settle(
        Step::ActivateScene,
        session.call(&Request::SetCurrentProgramScene {
            scene: SCENE_NAME.to_string(),
        }),
    )?;
    if activated.is_some() {
        info!("✓ Activated scene: {}", SCENE_NAME);
    }

    if interrupted_before(shutdown, Step::EnsureVirtualCam) {
        return Ok(Setup::Interrupted);
    }
    settle(Step::EnsureVirtualCam, ensure_virtual_cam(session))?;
    Ok(Setup::Complete)
}

fn ensure_scene<S: ControlSession>(session: &mut S) -> Result<(), CallError> {
    let scenes = request::scene_names(&session.call(&Request::GetSceneList)?)?;

    if !scenes.iter().any(|s| s == SCENE_NAME) {
        info!("Creating scene: {}", SCENE_NAME);
        session.call(&Request::CreateScene {
            scene: SCENE_NAME.to_string(),
        })?;
    }
    Ok(())
}

fn ensure_virtual_cam<S: ControlSession>(session: &mut S) -> Result<(), CallError> {
    if request::output_active(&session.call(&Request::GetVirtualCamStatus)?)? {
        info!("✓ Virtual camera already running");
    } else {
        session.call(&Request::StartVirtualCam)?;
        info!("✓ Virtual camera started!");
    }
    Ok(())
}

/// Wait for the interrupt, then stop the virtual camera.
fn hold<S: ControlSession>(session: &mut S, shutdown: &ShutdownSignal) {
    let rule = "=".repeat(50);
    println!("\n{rule}");
    println!("Virtual camera is now active!");
    println!("You can use 'OBS Virtual Camera' in other apps");
    println!("Press Ctrl+C to stop");
    println!("{rule}\n");

    shutdown.wait_forever();

    info!("Stopping virtual camera...");
    // StopVirtualCam is Severity::Warn, so this cannot abort
    if let Ok(Some(_)) = settle(Step::StopVirtualCam, session.call(&Request::StopVirtualCam)) {
        info!("✓ Virtual camera stopped");
    }
}
