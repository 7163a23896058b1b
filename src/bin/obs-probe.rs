use clap::Parser;
use ipcam_vcam::obs::WebSocketConnector;
use ipcam_vcam::probe::run_probe;
use ipcam_vcam::prompt::CliPrompter;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "obs-probe", version)]
#[command(about = "Check the OBS WebSocket connection on localhost:4455")]
struct Args {}

fn main() -> ExitCode {
    ipcam_vcam::logging::init();
    let _args = Args::parse();

    if run_probe(&WebSocketConnector, &CliPrompter).is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
