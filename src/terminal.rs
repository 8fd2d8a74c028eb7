use std::io::{self, IsTerminal};

/// Answers whether the process is attached to an interactive terminal.
///
/// Commands take this as a trait so tests can pin the answer and keep
/// output deterministic when run off a TTY.
pub trait TerminalClient {
    /// Reports whether stdout is an interactive terminal.
    fn stdout_is_terminal(&self) -> bool;

    /// Reports whether stderr is an interactive terminal.
    fn stderr_is_terminal(&self) -> bool;
}

/// [`TerminalClient`] backed by the real process streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTerminalClient;

impl TerminalClient for SystemTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn stderr_is_terminal(&self) -> bool {
        io::stderr().is_terminal()
    }
}
