//! Forking, child preparation and waiting.
//!
//! [`spawn`] is the only place the shell forks. The child always runs
//! [`prepare_child`] before the caller's setup, so every program the shell
//! starts behaves like a normal job and dies with the shell.

use std::convert::Infallible;
use std::io::Write;

use nix::sys::prctl::set_pdeathsig;
use nix::sys::signal::{kill, signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, getpid, getppid, ForkResult, Pid};
use tracing::{debug, trace};

use crate::types::{die, report, Result, ShellError};

/// Signals the shell ignores itself and its foreground children must not.
const INTERACTIVE_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGQUIT];

/// A forked child, identified by pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: Pid,
}

impl ProcessHandle {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Blocks until this child exits.
    ///
    /// Losing track of a child means the shell can no longer vouch for its
    /// process tree, so a failed wait is fatal.
    pub fn wait(self) -> Result<WaitStatus> {
        let status = waitpid(self.pid, None).map_err(|e| {
            ShellError::fatal("Parent process failed waiting for child process", e)
        })?;
        debug!(pid = %self.pid, ?status, "child finished");
        Ok(status)
    }
}

/// Makes the shell itself immune to Ctrl-C, Ctrl-Z and Ctrl-\.
pub fn ignore_interactive_signals() -> Result<()> {
    for sig in INTERACTIVE_SIGNALS {
        // SAFETY: SigIgn installs no handler code.
        unsafe { signal(sig, SigHandler::SigIgn) }.map_err(|e| {
            ShellError::fatal("Could not ignore signals in parent process", e)
        })?;
    }
    Ok(())
}

/// Forks and runs `setup` in the child.
///
/// `setup` never hands control back: it replaces the process image or
/// ends the process. The parent gets a handle to wait on or to detach.
pub fn spawn<F>(setup: F) -> Result<ProcessHandle>
where
    F: FnOnce() -> Infallible,
{
    // Buffered output would otherwise be written twice.
    std::io::stdout().flush().map_err(ShellError::output)?;
    let parent = getpid();

    // SAFETY: the shell is single threaded, so the child starts from a
    // consistent copy of every lock and allocator.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!(pid = %child, "spawned");
            Ok(ProcessHandle { pid: child })
        }
        Ok(ForkResult::Child) => {
            prepare_child(parent);
            let never = setup();
            match never {}
        }
        Err(e) => Err(ShellError::fatal("Fork failed", e)),
    }
}

/// Child-side contract that runs before anything else in a new child.
///
/// Restores default handling of the interactive signals and asks the
/// kernel for SIGTERM if the shell dies. If the shell already died between
/// `fork` and here, the parent pid no longer matches and the child ends.
pub fn prepare_child(parent: Pid) {
    for sig in INTERACTIVE_SIGNALS {
        // SAFETY: SigDfl installs no handler code.
        if let Err(e) = unsafe { signal(sig, SigHandler::SigDfl) } {
            report(&ShellError::sys("Could not assign signal handlers to child process", e));
            terminate_self();
        }
    }

    if let Err(e) = set_pdeathsig(Signal::SIGTERM) {
        report(&ShellError::sys("Failure in prctl function", e));
        terminate_self();
    }
    if getppid() != parent {
        report(&ShellError::ChildSetup(
            "Parent process exited before the child was ready".to_string(),
        ));
        terminate_self();
    }
    trace!(parent = %parent, "child prepared");
}

/// Ends the current process with SIGTERM, the way every failed child goes.
pub fn terminate_self() -> ! {
    let _ = std::io::stdout().flush();
    if let Err(e) = kill(getpid(), Signal::SIGTERM) {
        die(&ShellError::fatal("Could not kill process", e));
    }
    // SIGTERM is pending on ourselves; it only fails to land if blocked.
    // SAFETY: _exit ends the process without running any Rust code.
    unsafe { libc::_exit(1) }
}
