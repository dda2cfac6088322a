use std::path::{Path, PathBuf};

use argh::FromArgs;

/// Longest accepted input line, in bytes.
pub const MAX_LINE_LEN: usize = 509;

const STDIN_SUBDIR: &str = "redir/stdin";
const STDOUT_SUBDIR: &str = "redir/stdout";
const BATCH_SUBDIR: &str = "bfs";

#[derive(FromArgs, Debug)]
/// A small interactive shell: builtins, external programs, pipes,
/// background jobs and file redirection.
pub struct ShellArgs {
    #[argh(switch, short = 'e')]
    /// print usage examples and exit.
    pub examples: bool,

    #[argh(positional)]
    /// name of a batch file in bfs/ (without the .sh suffix) to run instead of reading stdin.
    pub batch: Option<String>,
}

/// Where the shell looks for its redirection targets and batch files.
///
/// Everything hangs off the directory the shell was launched from, so a
/// later `cd` never moves redirection targets around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub base_dir: PathBuf,
    pub stdin_dir: PathBuf,
    pub stdout_dir: PathBuf,
    pub batch_dir: PathBuf,
}

impl ShellConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            stdin_dir: base_dir.join(STDIN_SUBDIR),
            stdout_dir: base_dir.join(STDOUT_SUBDIR),
            batch_dir: base_dir.join(BATCH_SUBDIR),
            base_dir,
        }
    }

    /// Captures the current working directory as the launch directory.
    pub fn from_launch_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn stdin_target(&self, name: &str) -> PathBuf {
        self.stdin_dir.join(name)
    }

    pub fn stdout_target(&self, name: &str) -> PathBuf {
        self.stdout_dir.join(name)
    }

    pub fn batch_file(&self, name: &str) -> PathBuf {
        self.batch_dir.join(format!("{}.sh", name))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
