//! Scoped swap of the shell's standard input or output onto a file.
//!
//! A [`Redirection`] is a guard: acquiring it points the standard
//! descriptor at the file and keeps a duplicate of the old one; releasing
//! it (explicitly or on drop) puts the old descriptor back. Every command
//! that redirects ends with the shell's own streams exactly as they were.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{IntoRawFd, RawFd};
use std::path::Path;

use nix::fcntl::{fcntl, FcntlArg};
use nix::unistd::{close, dup2};
use tracing::{debug, trace};

use crate::types::{die, Result, ShellError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn fd(self) -> RawFd {
        match self {
            Direction::Inbound => libc::STDIN_FILENO,
            Direction::Outbound => libc::STDOUT_FILENO,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Direction::Inbound => "STDIN",
            Direction::Outbound => "STDOUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
pub struct Redirection {
    direction: Direction,
    saved: RawFd,
    released: bool,
}

impl Redirection {
    /// Opens `path` and makes it the standard descriptor for `direction`.
    ///
    /// Failing to open the file is recoverable and leaves nothing to
    /// release. Failing to juggle descriptors afterwards is fatal.
    pub fn acquire(path: &Path, direction: Direction) -> Result<Self> {
        let mut options = OpenOptions::new();
        match direction {
            Direction::Inbound => options.read(true),
            Direction::Outbound => options.write(true).create(true).mode(0o666),
        };
        let file = options.open(path).map_err(|source| ShellError::Redirect {
            direction: direction.label(),
            path: path.to_path_buf(),
            source,
        })?;

        if direction == Direction::Outbound {
            // Anything already buffered belongs to the old stdout.
            std::io::stdout().flush().map_err(ShellError::output)?;
        }

        let target = direction.fd();
        // Close-on-exec so a launched program never inherits the saved copy.
        let saved = fcntl(target, FcntlArg::F_DUPFD_CLOEXEC(0)).map_err(|e| {
            ShellError::fatal(format!("Could not save original {} file descriptor", direction), e)
        })?;
        let fd = file.into_raw_fd();
        dup2(fd, target)
            .map_err(|e| ShellError::fatal(format!("Could not duplicate {}", direction), e))?;
        close(fd).map_err(|e| {
            let context = format!("Could not close file descriptor when redirecting {}", direction);
            ShellError::fatal(context, e)
        })?;

        debug!(%direction, path = %path.display(), saved, "redirection acquired");
        Ok(Self { direction, saved, released: false })
    }

    /// Puts the original descriptor back.
    pub fn release(mut self) -> Result<()> {
        self.restore()
    }

    /// Keeps the redirection for the rest of this process and drops the
    /// saved duplicate.
    ///
    /// For a child that is about to replace its image and will never need
    /// the original stream again.
    pub fn commit(mut self) {
        self.released = true;
        let _ = close(self.saved);
    }

    fn restore(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if self.direction == Direction::Outbound {
            std::io::stdout().flush().map_err(ShellError::output)?;
        }
        let direction = self.direction;
        dup2(self.saved, direction.fd()).map_err(|e| {
            ShellError::fatal(format!("Could not restore original {} stream", direction), e)
        })?;
        close(self.saved).map_err(|e| {
            let context = format!(
                "Could not close file descriptor when restoring original {} stream",
                direction
            );
            ShellError::fatal(context, e)
        })?;
        trace!(%direction, "redirection released");
        Ok(())
    }
}

impl Drop for Redirection {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            die(&err);
        }
    }
}
