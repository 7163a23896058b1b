//! Checks that OBS WebSocket is reachable and finds out whether it needs a
//! password.

use crate::error::SessionError;
use crate::obs::{Connector, ControlSession, Endpoint, DEFAULT_PORT};
use crate::prompt::Prompter;
use std::io;
use tracing::debug;

const PROBE_HOST: &str = "localhost";

/// Result of a probe run
#[derive(Debug)]
pub enum ProbeOutcome {
    /// Connected without a password
    Connected,
    /// Connected after the user supplied this password
    ConnectedWithPassword(String),
    /// User aborted the password prompt
    Cancelled,
    /// Password was required and the one supplied did not work
    StillFailed(SessionError),
    /// The password prompt itself could not be read
    PromptFailed(io::Error),
    /// Failed for a reason a password would not fix
    Unreachable(SessionError),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Connected | Self::ConnectedWithPassword(_))
    }
}

/// Quote `value` for a POSIX shell command line
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Probe `localhost:4455` with no password, asking for one if OBS wants it.
pub fn run_probe<C: Connector, P: Prompter>(connector: &C, prompter: &P) -> ProbeOutcome {
    prompter.display_message("Testing OBS WebSocket connection...");

    let endpoint = Endpoint::new(PROBE_HOST, DEFAULT_PORT, "");
    match connector.connect(&endpoint) {
        Ok(mut session) => {
            prompter.display_message("✓ Successfully connected to OBS WebSocket!");
            session.disconnect();
            ProbeOutcome::Connected
        }
        Err(e) if e.requires_credential() => {
            debug!("Probe needs a password: {}", e);
            retry_with_password(connector, prompter, endpoint)
        }
        Err(e) => {
            prompter.display_warning(&format!("✗ Failed to connect: {}", e));
            prompter.display_message(
                "\nTo enable WebSocket in OBS:\n\
                 1. Open OBS Studio\n\
                 2. Go to Tools → WebSocket Server Settings\n\
                 3. Check 'Enable WebSocket server'",
            );
            ProbeOutcome::Unreachable(e)
        }
    }
}

fn retry_with_password<C: Connector, P: Prompter>(
    connector: &C,
    prompter: &P,
    mut endpoint: Endpoint,
) -> ProbeOutcome {
    prompter.display_warning("\n⚠️  OBS WebSocket requires a password.");
    prompter.display_message(
        "\nYou have two options:\n\
         \n1. Remove the password in OBS:\n   \
         - Go to Tools → WebSocket Server Settings\n   \
         - Uncheck 'Enable authentication'\n   \
         - Click Apply\n\
         \n2. Or test with your password:",
    );

    let password = match prompter.read_secret("   Enter OBS WebSocket password: ") {
        Ok(Some(password)) => password,
        Ok(None) => {
            prompter.display_warning("\nCancelled.");
            return ProbeOutcome::Cancelled;
        }
        Err(e) => {
            prompter.display_warning(&format!("\n✗ Could not read password: {}", e));
            return ProbeOutcome::PromptFailed(e);
        }
    };

    endpoint.password = password;
    match connector.connect(&endpoint) {
        Ok(mut session) => {
            prompter.display_message("\n✓ Successfully connected with password!");
            prompter.display_message(&format!(
                "\nUse this when running the configurator:\n  ipcam-vcam <IP> --control-credential {}",
                shell_quote(&endpoint.password)
            ));
            session.disconnect();
            ProbeOutcome::ConnectedWithPassword(endpoint.password)
        }
        Err(e) => {
            prompter.display_warning(&format!("\n✗ Still failed: {}", e));
            ProbeOutcome::StillFailed(e)
        }
    }
}
