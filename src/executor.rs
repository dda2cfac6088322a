use std::convert::Infallible;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::{Path, PathBuf};

use nix::unistd::{dup2, execv, pipe};
use tracing::{debug, warn};

use crate::builtins;
use crate::classifier::{classify, Builtin, CommandIntent};
use crate::config::ShellConfig;
use crate::process::{self, terminate_self, ProcessHandle};
use crate::program::{launch_dir, ProgramDescriptor, Resolution};
use crate::redirect::{Direction, Redirection};
use crate::types::{report, Result, ShellError};
use crate::utils::first_executable;

/// What the read loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// One stage of a pipeline, fully prepared before anything forks.
enum StagePlan {
    Echo {
        words: Vec<String>,
        stdin: Option<PathBuf>,
    },
    Program {
        descriptor: ProgramDescriptor,
        candidates: Result<Vec<CString>>,
        stdin: Option<PathBuf>,
    },
}

impl StagePlan {
    fn new(stage: CommandIntent, path_var: Option<&str>, cwd: &Path) -> Result<Self> {
        if stage.is_echo() {
            let words = stage.words().into_iter().skip(1).collect();
            return Ok(StagePlan::Echo { words, stdin: stage.stdin_redirect });
        }
        let descriptor = ProgramDescriptor::build(&stage.residual)?;
        // A missing $PATH is the child's problem to report, after it forks.
        let candidates = descriptor.launch_candidates(path_var, cwd);
        Ok(StagePlan::Program { descriptor, candidates, stdin: stage.stdin_redirect })
    }

    fn stdin(&self) -> Option<&Path> {
        match self {
            StagePlan::Echo { stdin, .. } | StagePlan::Program { stdin, .. } => stdin.as_deref(),
        }
    }
}

type PipePair = (OwnedFd, OwnedFd);

pub struct Executor {
    config: ShellConfig,
}

impl Executor {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Classifies and runs one trimmed input line.
    pub fn execute_line(&mut self, line: &str) -> Result<Outcome> {
        let intent = classify(line, &self.config)?;
        self.execute(intent)
    }

    pub fn execute(&mut self, intent: CommandIntent) -> Result<Outcome> {
        match intent.builtin {
            Some(Builtin::Quit) => return Ok(Outcome::Quit),
            Some(Builtin::ChangeDir) => {
                let words = intent.words();
                builtins::change_dir(&words[1])?;
            }
            Some(Builtin::Clear) => builtins::clear_screen(&mut io::stdout())?,
            Some(Builtin::Echo) if !intent.has_pipe_continuation() => self.run_echo(intent)?,
            _ => self.run_pipeline(intent)?,
        }
        Ok(Outcome::Continue)
    }

    /// `echo` in the shell process itself.
    fn run_echo(&mut self, intent: CommandIntent) -> Result<()> {
        let stdout_guard = match &intent.stdout_redirect {
            Some(path) => Some(Redirection::acquire(path, Direction::Outbound)?),
            None => None,
        };

        if let Some(path) = &intent.stdin_redirect {
            let stdin_guard = Redirection::acquire(path, Direction::Inbound)?;
            builtins::echo_stdin(&mut io::stdout())?;
            stdin_guard.release()?;
        } else {
            let words: Vec<String> = intent.words().into_iter().skip(1).collect();
            builtins::echo_env(&words, &mut io::stdout())?;
        }

        if let Some(guard) = stdout_guard {
            guard.release()?;
        }
        Ok(())
    }

    /// Runs external programs (and piped `echo` stages) in child processes.
    fn run_pipeline(&mut self, first: CommandIntent) -> Result<()> {
        let background = first.is_background();
        let stages = first.into_stages(&self.config)?;
        let stdout_target = stages.last().and_then(|stage| stage.stdout_redirect.clone());

        let path_var = std::env::var("PATH").ok();
        let cwd = launch_dir()?;
        let plans = stages
            .into_iter()
            .map(|stage| StagePlan::new(stage, path_var.as_deref(), &cwd))
            .collect::<Result<Vec<_>>>()?;

        let stdout_guard = match &stdout_target {
            Some(path) => Some(Redirection::acquire(path, Direction::Outbound)?),
            None => None,
        };

        let handles = spawn_stages(&plans)?;

        if background {
            if let Some(guard) = stdout_guard {
                guard.release()?;
            }
            for handle in &handles {
                writeln!(io::stdout(), "PID: [{}]", handle.pid()).map_err(ShellError::output)?;
            }
            return Ok(());
        }

        for handle in handles {
            handle.wait()?;
        }
        if let Some(guard) = stdout_guard {
            guard.release()?;
        }
        Ok(())
    }
}

/// Creates the pipes and forks every stage, last stage first.
///
/// Forking right to left means each reader already exists when the stage
/// feeding it starts. The shell closes a pipe as soon as both of its ends
/// have been handed to their children. Handles come back in pipeline order.
fn spawn_stages(plans: &[StagePlan]) -> Result<Vec<ProcessHandle>> {
    let mut pipes: Vec<Option<PipePair>> = (1..plans.len())
        .map(|_| {
            pipe()
                .map(Some)
                .map_err(|e| ShellError::fatal("Failed to create pipe", e))
        })
        .collect::<Result<_>>()?;

    let mut handles = Vec::with_capacity(plans.len());
    for (index, plan) in plans.iter().enumerate().rev() {
        let handle = process::spawn(|| run_stage(plan, index, &mut pipes))?;
        debug!(stage = index, pid = %handle.pid(), "stage started");
        handles.push(handle);

        if let Some(slot) = pipes.get_mut(index) {
            *slot = None;
        }
    }
    handles.reverse();
    Ok(handles)
}

/// Child side of one stage: redirect, wire pipes, then run.
fn run_stage(plan: &StagePlan, index: usize, pipes: &mut Vec<Option<PipePair>>) -> Infallible {
    if let Some(path) = plan.stdin() {
        match Redirection::acquire(path, Direction::Inbound) {
            Ok(guard) => guard.commit(),
            Err(err) => {
                report(&err);
                terminate_self();
            }
        }
    }

    if let Err(err) = wire_pipes(index, pipes) {
        report(&err);
        terminate_self();
    }

    match plan {
        StagePlan::Echo { words, stdin } => {
            let result = match stdin {
                Some(_) => builtins::echo_stdin(&mut io::stdout()).map(|_| true),
                None => builtins::echo_env(words, &mut io::stdout()),
            };
            match result {
                Ok(true) => std::process::exit(0),
                Ok(false) => std::process::exit(1),
                Err(err) => {
                    report(&err);
                    terminate_self();
                }
            }
        }
        StagePlan::Program { descriptor, candidates, .. } => launch(descriptor, candidates),
    }
}

/// Points stdin/stdout at this stage's pipe ends and closes every pipe
/// descriptor the child inherited.
fn wire_pipes(index: usize, pipes: &mut Vec<Option<PipePair>>) -> Result<()> {
    if index > 0 {
        if let Some((read_end, _)) = &pipes[index - 1] {
            dup2(read_end.as_raw_fd(), libc::STDIN_FILENO)
                .map_err(|e| ShellError::sys("Could not duplicate pipe read end", e))?;
        }
    }
    if let Some(Some((_, write_end))) = pipes.get(index) {
        dup2(write_end.as_raw_fd(), libc::STDOUT_FILENO)
            .map_err(|e| ShellError::sys("Could not duplicate pipe write end", e))?;
    }
    pipes.clear();
    Ok(())
}

/// Finds the executable and replaces the process image with it.
fn launch(descriptor: &ProgramDescriptor, candidates: &Result<Vec<CString>>) -> Infallible {
    let candidates = match candidates {
        Ok(candidates) => candidates,
        Err(err) => {
            report(err);
            terminate_self();
        }
    };

    let path = match descriptor.kind {
        Resolution::PathSearch => first_executable(candidates),
        Resolution::Absolute | Resolution::Relative => candidates.first().map(CString::as_c_str),
    };
    let path = match path {
        Some(path) => path,
        None => {
            report(&ShellError::ProgramNotFound(descriptor.name()));
            terminate_self();
        }
    };

    debug!(?path, argv = ?descriptor.argv, "exec");
    match execv(path, &descriptor.argv) {
        Ok(never) => never,
        Err(e) => {
            warn!(?path, error = %e, "exec failed");
            report(&ShellError::ProgramNotFound(descriptor.name()));
            terminate_self();
        }
    }
}
