use std::ffi::CString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::tokenizer::{leading_words, tokenize};
use crate::types::{Result, ShellError};

/// How the executable of a command gets located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Bare name, looked up through each `$PATH` entry in order.
    PathSearch,
    /// Starts with `/`, launched verbatim.
    Absolute,
    /// Starts with `./`, launched from the current directory.
    Relative,
}

impl Resolution {
    pub fn of(text: &str) -> Self {
        if text.starts_with("./") {
            Resolution::Relative
        } else if text.starts_with('/') {
            Resolution::Absolute
        } else {
            Resolution::PathSearch
        }
    }
}

/// Everything needed to launch one external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDescriptor {
    pub kind: Resolution,
    /// Element 0 is the program name (without `./` for relative programs).
    /// `execv` derives the terminating null entry from the length.
    pub argv: Vec<CString>,
}

impl ProgramDescriptor {
    /// Builds the descriptor from a stage's residual text.
    ///
    /// Tokenizing stops at the first redirection, pipe or background marker.
    pub fn build(residual: &str) -> Result<Self> {
        let text = residual.trim();
        let kind = Resolution::of(text);
        let tokens = tokenize(text);
        let words = leading_words(&tokens);

        let (name, args) = match words.split_first() {
            Some((name, args)) => (*name, args),
            None => return Err(ShellError::Syntax("Missing program name".to_string())),
        };
        let name = match kind {
            Resolution::Relative => name.trim_start_matches("./"),
            _ => name,
        };
        if name.is_empty() {
            return Err(ShellError::Syntax("Missing program name".to_string()));
        }

        let argv = std::iter::once(name)
            .chain(args.iter().copied())
            .map(|arg| {
                CString::new(arg).map_err(|_| {
                    ShellError::Syntax(format!("Argument contains a NUL byte: {:?}", arg))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(?kind, ?argv, "program descriptor built");
        Ok(Self { kind, argv })
    }

    pub fn name(&self) -> String {
        self.argv[0].to_string_lossy().into_owned()
    }

    /// Candidate paths to try, in order.
    ///
    /// `path_var` is only consulted for [`Resolution::PathSearch`]; `cwd` only
    /// for [`Resolution::Relative`].
    pub fn launch_candidates(&self, path_var: Option<&str>, cwd: &Path) -> Result<Vec<CString>> {
        let name = self.name();
        let candidates: Vec<PathBuf> = match self.kind {
            Resolution::Absolute => vec![PathBuf::from(&name)],
            Resolution::Relative => vec![cwd.join(&name)],
            Resolution::PathSearch => {
                let path_var = path_var.ok_or_else(|| {
                    ShellError::Environment("Could not get PATH environment variable".to_string())
                })?;
                path_var
                    .split(':')
                    .filter(|dir| !dir.is_empty())
                    .map(|dir| Path::new(dir).join(&name))
                    .collect()
            }
        };

        candidates
            .into_iter()
            .map(|path| {
                use std::os::unix::ffi::OsStringExt;
                CString::new(path.into_os_string().into_vec()).map_err(|_| {
                    ShellError::Syntax(format!("Program path contains a NUL byte: {}", name))
                })
            })
            .collect()
    }
}

/// The directory relative programs launch from: `$PWD`, else the kernel's cwd.
pub fn launch_dir() -> Result<PathBuf> {
    match std::env::var_os("PWD") {
        Some(pwd) if !pwd.is_empty() => Ok(PathBuf::from(pwd)),
        _ => Ok(std::env::current_dir()?),
    }
}
