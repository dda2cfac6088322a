//! The read loop and everything that only feeds it: prompt, banners and
//! the three places lines can come from.

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::Path;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use crate::config::MAX_LINE_LEN;
use crate::executor::{Executor, Outcome};
use crate::types::{die, report, Result, ShellError};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const EXAMPLES: &str = "\
INTERNAL COMMANDS
  cd /home
  cd ..
  cd -
  clr
  echo example comment
  echo comment1 $PATH comment2 $USER $PWD
  quit

EXTERNAL PROGRAMS
  ls -l
  ./relative/path/to/executable arg1 arg2
  /absolute/path/to/executable

BATCHFILES
  myshell batchfile_name        (runs bfs/batchfile_name.sh)

BACKGROUND EXECUTION
  sleep 5 &

I/O REDIRECTION (files live in redir/stdin and redir/stdout)
  echo comment > new_stdout
  echo < new_stdin > new_stdout
  grep something < new_stdin > new_stdout

PIPING
  ps aux | grep firefox
  grep bash /etc/passwd | cut -d : -f 1 | sort
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Welcome,
    Farewell,
}

pub fn banner<W: Write>(out: &mut W, kind: Banner) -> Result<()> {
    let text = match kind {
        Banner::Welcome => "[WELCOME]",
        Banner::Farewell => "[GOODBYE]",
    };
    writeln!(out, "{}\n> MyShell{} {}\n", BOLD, RESET, text).map_err(ShellError::output)
}

pub fn print_examples<W: Write>(out: &mut W) -> Result<()> {
    out.write_all(EXAMPLES.as_bytes()).map_err(ShellError::output)
}

/// Who and where, for the prompt.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: String,
    pub host: String,
}

impl Identity {
    pub fn current() -> Self {
        let user = std::env::var("USER").unwrap_or_else(|_| {
            warn!("USER is not set");
            "unknown".to_string()
        });
        let host = nix::unistd::gethostname()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        Self { user, host }
    }

    pub fn prompt(&self) -> String {
        let cwd = std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        format!("{}@{}:{}$ ", self.user, self.host, cwd)
    }
}

/// Where input lines come from.
pub enum LineSource {
    /// A terminal, with line editing.
    Interactive(DefaultEditor),
    /// Stdin that is not a terminal: plain lines, no prompt.
    Piped,
    /// A batch file; each line is echoed after the prompt.
    Batch(BufReader<File>),
}

impl LineSource {
    pub fn stdin() -> Result<Self> {
        if io::stdin().is_terminal() {
            let editor = DefaultEditor::new()
                .map_err(|e| ShellError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
            Ok(LineSource::Interactive(editor))
        } else {
            Ok(LineSource::Piped)
        }
    }

    pub fn batch(path: &Path) -> io::Result<Self> {
        Ok(LineSource::Batch(BufReader::new(File::open(path)?)))
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, LineSource::Piped)
    }

    /// Next raw line, or `None` at end of input.
    pub fn next_line(&mut self, identity: &Identity) -> Result<Option<String>> {
        match self {
            LineSource::Interactive(editor) => match editor.readline(&identity.prompt()) {
                Ok(line) => Ok(Some(line)),
                Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(e) => Err(ShellError::Io(io::Error::new(io::ErrorKind::Other, e))),
            },
            LineSource::Piped => read_plain(&mut io::stdin().lock()),
            LineSource::Batch(reader) => {
                let line = read_plain(reader)?;
                if let Some(line) = &line {
                    let mut out = io::stdout().lock();
                    writeln!(out, "{}{}", identity.prompt(), line.trim_end())
                        .and_then(|_| out.flush())
                        .map_err(ShellError::output)?;
                }
                Ok(line)
            }
        }
    }
}

/// Reads one raw line. A line that is not UTF-8 is consumed and comes
/// back as a recoverable [`ShellError::Syntax`].
fn read_plain<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut bytes = Vec::new();
    if reader.read_until(b'\n', &mut bytes)? == 0 {
        return Ok(None);
    }
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| ShellError::Syntax("Input line is not valid UTF-8".to_string()))
}

/// Feeds lines to the executor until end of input or `quit`.
///
/// Recoverable errors are reported and the loop moves on; a fatal one
/// ends the process.
pub fn run(executor: &mut Executor, source: &mut LineSource, identity: &Identity) {
    loop {
        let line = match source.next_line(identity) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err @ ShellError::Syntax(_)) => {
                report(&err);
                continue;
            }
            // Without input there is nothing left to do.
            Err(err) => die(&err),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.len() > MAX_LINE_LEN {
            report(&ShellError::Syntax(format!(
                "Input line longer than {} bytes",
                MAX_LINE_LEN
            )));
            continue;
        }

        debug!(line, "read");
        match executor.execute_line(line) {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::Quit) => break,
            Err(err) if err.is_fatal() => die(&err),
            Err(err) => report(&err),
        }
    }
}
