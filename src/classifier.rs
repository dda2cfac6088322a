//! Turns one input line into a validated [`CommandIntent`].
//!
//! Classification is a pure function of the line and the shell's
//! configuration: every call returns a fresh intent and nothing is kept
//! between calls.

use std::path::PathBuf;

use tracing::debug;

use crate::config::ShellConfig;
use crate::tokenizer::{leading_words, tokenize, TokenType};
use crate::types::{Result, ShellError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    ChangeDir,
    Clear,
    Echo,
    Quit,
}

impl Builtin {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "cd" => Some(Builtin::ChangeDir),
            "clr" => Some(Builtin::Clear),
            "echo" => Some(Builtin::Echo),
            "quit" => Some(Builtin::Quit),
            _ => None,
        }
    }
}

/// What one line (or one pipeline stage) asks the shell to do.
///
/// At most one builtin can be set since `builtin` is an `Option`. A pipe
/// continuation never coexists with `background`, and `cd`, `clr` and
/// `quit` never carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandIntent {
    pub builtin: Option<Builtin>,
    pub background: bool,
    pub stdin_redirect: Option<PathBuf>,
    pub stdout_redirect: Option<PathBuf>,
    /// This stage's text, trailing `&` removed.
    pub residual: String,
    continuation: Option<String>,
}

impl CommandIntent {
    pub fn is_cd(&self) -> bool {
        self.builtin == Some(Builtin::ChangeDir)
    }

    pub fn is_clr(&self) -> bool {
        self.builtin == Some(Builtin::Clear)
    }

    pub fn is_echo(&self) -> bool {
        self.builtin == Some(Builtin::Echo)
    }

    pub fn is_quit(&self) -> bool {
        self.builtin == Some(Builtin::Quit)
    }

    pub fn has_pipe_continuation(&self) -> bool {
        self.continuation.is_some()
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn has_stdin_redirect(&self) -> bool {
        self.stdin_redirect.is_some()
    }

    pub fn has_stdout_redirect(&self) -> bool {
        self.stdout_redirect.is_some()
    }

    /// Raw text after the first `|`, saved verbatim for the next stage.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Words of this stage up to the first marker.
    pub fn words(&self) -> Vec<String> {
        let tokens = tokenize(&self.residual);
        leading_words(&tokens).into_iter().map(str::to_string).collect()
    }

    /// Expands the pipe continuation into the ordered list of stages.
    ///
    /// The continuation is classified again (with its own continuation
    /// split off) until the chain ends. Redirection is only allowed at the
    /// ends of a pipeline: input on the first stage, output on the last.
    pub fn into_stages(self, config: &ShellConfig) -> Result<Vec<CommandIntent>> {
        let mut next = self.continuation.clone();
        let mut stages = vec![self];

        while let Some(text) = next {
            if text.is_empty() {
                return Err(ShellError::Syntax("Missing command after pipe".to_string()));
            }
            let stage = classify(&text, config)?;
            next = stage.continuation.clone();
            stages.push(stage);
        }

        let last = stages.len() - 1;
        for (i, stage) in stages.iter().enumerate() {
            if last > 0 && (stage.is_cd() || stage.is_clr() || stage.is_quit()) {
                return Err(ShellError::InvalidCombination(
                    "Invalid commands combination".to_string(),
                ));
            }
            if i > 0 && stage.has_stdin_redirect() {
                return Err(ShellError::InvalidCombination(
                    "STDIN redirection is only allowed on the first pipeline command".to_string(),
                ));
            }
            if i < last && stage.has_stdout_redirect() {
                return Err(ShellError::InvalidCombination(
                    "STDOUT redirection is only allowed on the last pipeline command".to_string(),
                ));
            }
        }
        Ok(stages)
    }
}

/// Classifies a trimmed line.
pub fn classify(line: &str, config: &ShellConfig) -> Result<CommandIntent> {
    let line = line.trim();
    let (current, continuation) = match line.split_once('|') {
        Some((head, rest)) => (head.trim(), Some(rest.trim().to_string())),
        None => (line, None),
    };

    let tokens = tokenize(current);
    let words = leading_words(&tokens);
    if words.is_empty() {
        return Err(ShellError::Syntax("Missing command".to_string()));
    }
    let builtin = Builtin::from_word(words[0]);

    let background = check_background(line)?;
    if background && (builtin.is_some() || continuation.is_some()) {
        return Err(ShellError::InvalidCombination(
            "Invalid background execution command".to_string(),
        ));
    }

    let (stdin_name, stdout_name) = redirect_names(&tokens)?;
    let has_redirect = stdin_name.is_some() || stdout_name.is_some();

    match builtin {
        Some(Builtin::Quit) | Some(Builtin::Clear)
            if words.len() > 1 || has_redirect || continuation.is_some() =>
        {
            return Err(ShellError::InvalidCombination(format!(
                "'{}' must be used alone",
                words[0]
            )));
        }
        Some(Builtin::ChangeDir) if has_redirect || continuation.is_some() => {
            return Err(ShellError::InvalidCombination(
                "Invalid commands combination".to_string(),
            ));
        }
        Some(Builtin::ChangeDir) if words.len() != 2 => {
            return Err(ShellError::Syntax("Invalid cd command input".to_string()));
        }
        _ => {}
    }

    let residual = current.trim_end_matches('&').trim_end().to_string();
    let intent = CommandIntent {
        builtin,
        background,
        stdin_redirect: stdin_name.map(|name| config.stdin_target(name)),
        stdout_redirect: stdout_name.map(|name| config.stdout_target(name)),
        residual,
        continuation,
    };
    debug!(?intent, "classified");
    Ok(intent)
}

/// A `&` is only meaningful as the very last character of the line.
fn check_background(line: &str) -> Result<bool> {
    let count = line.matches('&').count();
    let at_end = line.ends_with('&');
    if count > 1 || (count == 1 && !at_end) {
        return Err(ShellError::Syntax("Invalid background execution command".to_string()));
    }
    Ok(at_end)
}

fn redirect_names(tokens: &[TokenType]) -> Result<(Option<&str>, Option<&str>)> {
    let mut stdin_name = None;
    let mut stdout_name = None;
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        let (slot, direction) = match token {
            TokenType::RedirectIn => (&mut stdin_name, "STDIN"),
            TokenType::RedirectOut => (&mut stdout_name, "STDOUT"),
            _ => continue,
        };
        let name = match iter.next() {
            Some(TokenType::Word(name)) => name.as_str(),
            _ => {
                return Err(ShellError::Syntax(format!(
                    "Invalid {} redirection input",
                    direction
                )))
            }
        };
        if name.contains('/') {
            return Err(ShellError::Syntax(format!(
                "{} redirection target must be a plain file name: {}",
                direction, name
            )));
        }
        if slot.replace(name).is_some() {
            return Err(ShellError::Syntax(format!("Duplicate {} redirection", direction)));
        }
    }
    Ok((stdin_name, stdout_name))
}
