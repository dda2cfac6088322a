//! A small interactive shell.
//!
//! A line goes through the [`classifier`] into a [`classifier::CommandIntent`].
//! Builtins (`cd`, `clr`, `echo`, `quit`) run in the shell process; anything
//! else becomes a [`program::ProgramDescriptor`] per pipeline stage and is
//! launched by the [`executor`], which forks through [`process::spawn`] and
//! swaps standard streams with [`redirect::Redirection`] guards.

pub mod builtins;
pub mod classifier;
pub mod config;
pub mod executor;
pub mod process;
pub mod program;
pub mod redirect;
pub mod repl;
pub mod tokenizer;
pub mod types;
pub mod utils;

pub use executor::{Executor, Outcome};
pub use types::{Result, Severity, ShellError};

#[cfg(test)]
mod tests;
