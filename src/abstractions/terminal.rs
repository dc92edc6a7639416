//! Interactive terminal detection

use std::io::IsTerminal;

/// Reports whether the process can prompt the user
pub trait TerminalProbe: Send + Sync {
    fn is_interactive(&self) -> bool;
}

/// Checks whether stdin is attached to a terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinTerminal;

impl TerminalProbe for StdinTerminal {
    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal()
    }
}

/// Always reports the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedTerminal(pub bool);

impl TerminalProbe for FixedTerminal {
    fn is_interactive(&self) -> bool {
        self.0
    }
}
