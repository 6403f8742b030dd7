//! Interactive secret entry

use std::io::{self, BufRead, Write};

/// Prompt on stderr and read one line from stdin without echo
///
/// Echo is only suppressed when stdin is a terminal. Piped input is read
/// as-is, which lets scripts feed the password.
pub fn read_password(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;

    let line = {
        let _echo = EchoGuard::disable();
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line
    };
    writeln!(stderr)?;

    Ok(strip_line_ending(&line).to_string())
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Restores terminal echo on drop
struct EchoGuard {
    #[cfg(unix)]
    saved: Option<nix::sys::termios::Termios>,
}

#[cfg(unix)]
impl EchoGuard {
    fn disable() -> Self {
        use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg};

        let stdin = io::stdin();
        let Ok(saved) = tcgetattr(&stdin) else {
            return Self { saved: None };
        };
        let mut quiet = saved.clone();
        quiet.local_flags.remove(LocalFlags::ECHO);
        quiet.local_flags.insert(LocalFlags::ECHONL);
        if tcsetattr(&stdin, SetArg::TCSANOW, &quiet).is_err() {
            return Self { saved: None };
        }
        Self { saved: Some(saved) }
    }
}

#[cfg(unix)]
impl Drop for EchoGuard {
    fn drop(&mut self) {
        use nix::sys::termios::{tcsetattr, SetArg};

        if let Some(saved) = self.saved.take() {
            if let Err(e) = tcsetattr(io::stdin(), SetArg::TCSANOW, &saved) {
                tracing::warn!("Failed to restore terminal echo: {}", e);
            }
        }
    }
}

#[cfg(not(unix))]
impl EchoGuard {
    fn disable() -> Self {
        Self {}
    }
}
