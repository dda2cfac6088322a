use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::mem::ManuallyDrop;
use std::os::unix::io::FromRawFd;
use std::path::PathBuf;

use tracing::debug;

use crate::program::launch_dir;
use crate::types::{report, Result, ShellError};

pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

/// Works out where `cd <arg>` should go.
///
/// Absolute targets are taken as-is, `-` means `$OLDPWD`, anything else is
/// appended to the current directory.
pub fn cd_target(arg: &str, pwd: &str, oldpwd: Option<&str>) -> Result<String> {
    if arg.starts_with('/') {
        return Ok(arg.to_string());
    }
    if arg == "-" {
        return oldpwd.map(str::to_string).ok_or_else(|| {
            ShellError::Builtin("There is no value for OLDPWD environment variable yet".to_string())
        });
    }
    if pwd == "/" {
        Ok(format!("/{}", arg))
    } else {
        Ok(format!("{}/{}", pwd, arg))
    }
}

/// Changes directory and keeps `PWD`/`OLDPWD` in step with it.
pub fn change_dir(arg: &str) -> Result<PathBuf> {
    let pwd = launch_dir()?;
    let pwd = pwd.to_string_lossy();
    let oldpwd = env::var("OLDPWD").ok();
    let target = cd_target(arg, &pwd, oldpwd.as_deref())?;

    env::set_current_dir(&target)
        .map_err(|e| ShellError::Builtin(format!("{}: {}", target, e)))?;
    let now = env::current_dir()?;

    env::set_var("OLDPWD", &*pwd);
    env::set_var("PWD", &now);
    debug!(from = %pwd, to = %now.display(), "changed directory");
    Ok(now)
}

pub fn clear_screen<W: Write>(out: &mut W) -> Result<()> {
    out.write_all(CLEAR_SCREEN.as_bytes())
        .and_then(|_| out.flush())
        .map_err(ShellError::output)
}

/// Prints words separated by single spaces.
///
/// A word holding `$NAME` has `NAME` replaced through `lookup`. An unknown
/// name is reported and skipped; the remaining words still print, but the
/// trailing newline is left out. Returns whether every lookup succeeded.
pub fn echo<W, F>(words: &[String], out: &mut W, lookup: F) -> Result<bool>
where
    W: Write,
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = true;

    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ").map_err(ShellError::output)?;
        }
        match word.find('$') {
            Some(pos) if pos + 1 < word.len() => {
                let (prefix, name) = (&word[..pos], &word[pos + 1..]);
                out.write_all(prefix.as_bytes()).map_err(ShellError::output)?;
                match lookup(name) {
                    Some(value) => out.write_all(value.as_bytes()).map_err(ShellError::output)?,
                    None => {
                        report(&ShellError::UnresolvedVariable(name.to_string()));
                        resolved = false;
                    }
                }
            }
            _ => out.write_all(word.as_bytes()).map_err(ShellError::output)?,
        }
    }

    if resolved {
        out.write_all(b"\n").map_err(ShellError::output)?;
    }
    out.flush().map_err(ShellError::output)?;
    Ok(resolved)
}

/// `echo` with the environment as its variable source.
pub fn echo_env<W: Write>(words: &[String], out: &mut W) -> Result<bool> {
    echo(words, out, |name| env::var(name).ok())
}

/// Copies whatever standard input currently points at to `out`, then
/// rewinds it so the next `echo < same_file` sees the whole file again.
pub fn echo_stdin<W: Write>(out: &mut W) -> Result<()> {
    // Borrowed descriptor: fd 0 must stay open once this returns.
    // SAFETY: fd 0 is open for the whole process and ManuallyDrop never closes it.
    let stdin = ManuallyDrop::new(unsafe { File::from_raw_fd(libc::STDIN_FILENO) });
    let mut reader = BufReader::new(&*stdin);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        out.write_all(&line).map_err(ShellError::output)?;
    }
    out.write_all(b"\n")
        .and_then(|_| out.flush())
        .map_err(ShellError::output)?;

    (&*stdin).seek(SeekFrom::Start(0))?;
    Ok(())
}
