//! Terminal interaction for the connection probe.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};

/// Interactive I/O used by the probe
pub trait Prompter {
    /// Read a secret without echoing it. `Ok(None)` means the user cancelled.
    fn read_secret(&self, prompt: &str) -> io::Result<Option<String>>;

    fn display_message(&self, message: &str);

    fn display_warning(&self, message: &str);
}

/// Prompter backed by the controlling terminal
pub struct CliPrompter;

impl Prompter for CliPrompter {
    fn read_secret(&self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let secret = {
            let _raw = RawModeGuard::enable()?;
            read_masked()?
        };
        println!();
        Ok(secret)
    }

    fn display_message(&self, message: &str) {
        println!("{}", message);
    }

    fn display_warning(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Restores cooked mode on drop, including on early return
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Push(char),
    Pop,
    Submit,
    Cancel,
    Ignore,
}

/// Map a key event to an edit of the secret being typed.
///
/// Raw mode swallows SIGINT, so Ctrl+C arrives here as a key and cancels.
fn key_action(event: &KeyEvent) -> KeyAction {
    if event.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }
    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Cancel,
        KeyCode::Esc => KeyAction::Cancel,
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Backspace => KeyAction::Pop,
        KeyCode::Char(c) => KeyAction::Push(c),
        _ => KeyAction::Ignore,
    }
}

fn read_masked() -> io::Result<Option<String>> {
    let mut secret = String::new();
    loop {
        match event::read()? {
            Event::Key(key) => match key_action(&key) {
                KeyAction::Push(c) => secret.push(c),
                KeyAction::Pop => {
                    secret.pop();
                }
                KeyAction::Submit => return Ok(Some(secret)),
                KeyAction::Cancel => return Ok(None),
                KeyAction::Ignore => {}
            },
            Event::Paste(text) => secret.push_str(text.trim_end_matches(['\r', '\n'])),
            _ => {}
        }
    }
}
