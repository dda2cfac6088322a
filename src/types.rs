use std::io::Write;

use thiserror::Error;

/// How far an error reaches: the current command, or the whole shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{context}: {errno}")]
    Sys { errno: nix::errno::Errno, context: String }, // For nix-related errors, with context
    #[error("{0}")]
    InvalidCombination(String),
    #[error("{0}")]
    Syntax(String),
    #[error("No such program found: {0}")]
    ProgramNotFound(String),
    #[error("Invalid environment variable - no match: {0}")]
    UnresolvedVariable(String),
    #[error("{0}")]
    Builtin(String),
    #[error("{0}")]
    Environment(String),
    #[error("{0}")]
    ChildSetup(String), // A forked child could not be made safe to run
    #[error("Could not redirect {direction} to {}: {source}", path.display())]
    Redirect {
        direction: &'static str,
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Fatal error on write instruction: {0}")]
    Output(std::io::Error),
    #[error("{context}: {errno}")]
    Fatal { errno: nix::errno::Errno, context: String },
}

impl ShellError {
    pub fn sys(context: impl Into<String>, errno: nix::errno::Errno) -> Self {
        ShellError::Sys { errno, context: context.into() }
    }

    /// Failures that leave the shell unable to track its own descriptors or children.
    pub fn fatal(context: impl Into<String>, errno: nix::errno::Errno) -> Self {
        ShellError::Fatal { errno, context: context.into() }
    }

    /// Losing the shell's own output stream is never recoverable.
    pub fn output(err: std::io::Error) -> Self {
        ShellError::Output(err)
    }

    pub fn severity(&self) -> Severity {
        match self {
            ShellError::Fatal { .. } | ShellError::Output(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// Writes the error to stderr in the shell's error format.
pub fn report(err: &ShellError) {
    write_report(err.severity(), err);
}

/// Reports the error as fatal and exits with a failure status.
///
/// Whatever the error was, it ended the process, so it is labelled fatal.
pub fn die(err: &ShellError) -> ! {
    write_report(Severity::Fatal, err);
    std::process::exit(1)
}

fn write_report(severity: Severity, err: &ShellError) {
    let label = match severity {
        Severity::Recoverable => "ERROR",
        Severity::Fatal => "ERROR [FATAL]",
    };
    let mut stderr = std::io::stderr().lock();
    if writeln!(stderr, "{} > {}", label, err).is_err() {
        // Nowhere left to say anything.
        std::process::exit(1);
    }
}
