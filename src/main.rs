use anyhow::{Context, Result};
use clap::Parser;
use ipcam_vcam::config::{self, Overrides};
use ipcam_vcam::configurator;
use ipcam_vcam::obs::WebSocketConnector;
use ipcam_vcam::shutdown::{self, ShutdownSignal};
use ipcam_vcam::RunError;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "ipcam-vcam", version)]
#[command(about = "Stream an IP Webcam feed to the OBS virtual camera")]
struct Args {
    #[command(flatten)]
    overrides: Overrides,

    /// Settings file [default: ~/.config/ipcam-vcam/config.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    ipcam_vcam::logging::init();

    let args = Args::parse();

    let shutdown = Arc::new(ShutdownSignal::new());
    shutdown::install_ctrlc_handler(Arc::clone(&shutdown))
        .context("Failed to install Ctrl+C handler")?;

    let result = config::load_settings(args.config.as_deref())
        .map_err(RunError::from)
        .and_then(|file| configurator::execute(file, args.overrides, &WebSocketConnector, &shutdown));

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            report(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report(err: &RunError) {
    error!("Error: {}", err);
    if let Some(cause) = err.source() {
        error!("Details: {}", cause);
    }
    eprintln!("\n{}", err.hint());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ipcam_vcam::config::FileSettings;
    use ipcam_vcam::Config;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_control_flags() {
        let args = Args::try_parse_from([
            "ipcam-vcam",
            "192.168.1.50:8080",
            "--control-host",
            "studio.lan",
            "--control-port",
            "4460",
            "--width",
            "1280",
        ])
        .unwrap();

        assert_eq!(args.overrides.stream_address.as_deref(), Some("192.168.1.50:8080"));
        assert_eq!(args.overrides.control_host.as_deref(), Some("studio.lan"));
        assert_eq!(args.overrides.control_port, Some(4460));
        assert_eq!(args.overrides.width, Some(1280));
    }

    #[test]
    fn obs_aliases_are_accepted() {
        let args = Args::try_parse_from([
            "ipcam-vcam",
            "10.0.0.2:8080",
            "--obs-password",
            "hunter2",
            "--config",
            "/tmp/ipcam.toml",
        ])
        .unwrap();

        assert_eq!(args.overrides.control_credential.as_deref(), Some("hunter2"));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/ipcam.toml")));
    }

    #[test]
    fn env_fills_in_and_flag_wins() {
        // The only test that touches OBS_PORT; the others pass the flag or ignore the port
        std::env::set_var("OBS_PORT", "4470");
        let from_env = Args::try_parse_from(["ipcam-vcam", "10.0.0.2:8080"]);
        let from_flag =
            Args::try_parse_from(["ipcam-vcam", "10.0.0.2:8080", "--control-port", "4480"]);
        std::env::remove_var("OBS_PORT");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.overrides.control_port, Some(4470));
        assert_eq!(from_flag.unwrap().overrides.control_port, Some(4480));

        // env also beats the settings file
        let file = FileSettings {
            control_port: Some(4460),
            ..Default::default()
        };
        let config = Config::resolve(file, from_env.overrides).unwrap();
        assert_eq!(config.control_port, 4470);
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Args::try_parse_from(["ipcam-vcam", "--control-port", "99999"]).is_err());
    }
}
