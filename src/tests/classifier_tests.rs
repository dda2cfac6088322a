use std::path::PathBuf;

use crate::classifier::{classify, Builtin, CommandIntent};
use crate::config::ShellConfig;
use crate::types::ShellError;

fn config() -> ShellConfig {
    ShellConfig::new("/base")
}

fn intent(line: &str) -> CommandIntent {
    match classify(line, &config()) {
        Ok(intent) => intent,
        Err(err) => panic!("{:?} should classify, got {}", line, err),
    }
}

fn rejected(line: &str) -> ShellError {
    match classify(line, &config()) {
        Ok(intent) => panic!("{:?} should be rejected, got {:?}", line, intent),
        Err(err) => err,
    }
}

#[test]
fn test_builtins_are_recognized_by_first_word() {
    assert!(intent("cd /tmp").is_cd());
    assert!(intent("clr").is_clr());
    assert!(intent("echo hello world").is_echo());
    assert!(intent("quit").is_quit());

    let external = intent("echoes hi");
    assert_eq!(external.builtin, None);
    assert!(!external.is_echo());
}

#[test]
fn test_plain_program() {
    let intent = intent("ls -l /tmp");
    assert_eq!(intent.builtin, None);
    assert!(!intent.is_background());
    assert!(!intent.has_pipe_continuation());
    assert!(!intent.has_stdin_redirect());
    assert!(!intent.has_stdout_redirect());
    assert_eq!(intent.residual, "ls -l /tmp");
    assert_eq!(intent.words(), vec!["ls", "-l", "/tmp"]);
}

#[test]
fn test_background_must_be_last_and_alone() {
    let intent = intent("sleep 5 &");
    assert!(intent.is_background());
    assert_eq!(intent.residual, "sleep 5");

    assert!(matches!(rejected("sleep & 5"), ShellError::Syntax(_)));
    assert!(matches!(rejected("sleep 5 & &"), ShellError::Syntax(_)));
}

#[test]
fn test_background_excludes_builtins_and_pipes() {
    assert!(matches!(rejected("echo hi &"), ShellError::InvalidCombination(_)));
    assert!(matches!(rejected("cd /tmp &"), ShellError::InvalidCombination(_)));
    assert!(matches!(rejected("ls | wc &"), ShellError::InvalidCombination(_)));
}

#[test]
fn test_pipe_continuation_is_kept_verbatim() {
    let intent = intent("ps aux | grep bash | wc -l");
    assert_eq!(intent.residual, "ps aux");
    assert_eq!(intent.continuation(), Some("grep bash | wc -l"));
}

#[test]
fn test_redirect_targets_live_under_base() {
    let intent = intent("sort < unsorted > sorted");
    assert_eq!(intent.stdin_redirect, Some(PathBuf::from("/base/redir/stdin/unsorted")));
    assert_eq!(intent.stdout_redirect, Some(PathBuf::from("/base/redir/stdout/sorted")));
    assert_eq!(intent.words(), vec!["sort"]);
}

#[test]
fn test_redirect_needs_a_plain_file_name() {
    assert!(matches!(rejected("cat <"), ShellError::Syntax(_)));
    assert!(matches!(rejected("cat > | wc"), ShellError::Syntax(_)));
    assert!(matches!(rejected("cat < ../secret"), ShellError::Syntax(_)));
    assert!(matches!(rejected("cat > a > b"), ShellError::Syntax(_)));
}

#[test]
fn test_missing_command() {
    assert!(matches!(rejected("< in"), ShellError::Syntax(_)));
    assert!(matches!(rejected("| wc"), ShellError::Syntax(_)));
}

#[test]
fn test_quit_and_clr_stand_alone() {
    assert!(matches!(rejected("quit now"), ShellError::InvalidCombination(_)));
    assert!(matches!(rejected("clr > out"), ShellError::InvalidCombination(_)));
    assert!(matches!(rejected("clr | wc"), ShellError::InvalidCombination(_)));
}

#[test]
fn test_cd_takes_exactly_one_argument() {
    assert!(matches!(rejected("cd"), ShellError::Syntax(_)));
    assert!(matches!(rejected("cd a b"), ShellError::Syntax(_)));
    assert!(matches!(rejected("cd /tmp > out"), ShellError::InvalidCombination(_)));
    assert!(matches!(rejected("cd /tmp | ls"), ShellError::InvalidCombination(_)));
    assert_eq!(intent("cd -").words(), vec!["cd", "-"]);
}

#[test]
fn test_into_stages_splits_every_pipe() -> Result<(), String> {
    let stages = intent("cat < input | sort | uniq > output")
        .into_stages(&config())
        .map_err(|e| e.to_string())?;

    let residuals: Vec<&str> = stages.iter().map(|s| s.residual.as_str()).collect();
    assert_eq!(residuals, vec!["cat < input", "sort", "uniq > output"]);
    assert!(stages[0].has_stdin_redirect());
    assert!(stages[2].has_stdout_redirect());
    assert!(stages.iter().all(|s| !s.is_background()));
    Ok(())
}

#[test]
fn test_echo_is_allowed_inside_pipelines() -> Result<(), String> {
    let stages = intent("echo one two | wc -w")
        .into_stages(&config())
        .map_err(|e| e.to_string())?;
    assert_eq!(stages[0].builtin, Some(Builtin::Echo));
    assert_eq!(stages[1].builtin, None);
    Ok(())
}

#[test]
fn test_redirects_only_at_pipeline_ends() {
    let inner_stdin = intent("ls | sort < input").into_stages(&config());
    assert!(matches!(inner_stdin, Err(ShellError::InvalidCombination(_))));

    let inner_stdout = intent("ls > listing | sort").into_stages(&config());
    assert!(matches!(inner_stdout, Err(ShellError::InvalidCombination(_))));
}

#[test]
fn test_builtins_other_than_echo_rejected_later_in_pipeline() {
    let stages = intent("ls | cd /tmp").into_stages(&config());
    assert!(matches!(stages, Err(ShellError::InvalidCombination(_))));
}

#[test]
fn test_empty_stage_after_pipe() {
    let stages = intent("ls |").into_stages(&config());
    assert!(matches!(stages, Err(ShellError::Syntax(_))));

    let stages = intent("ls | | wc").into_stages(&config());
    assert!(stages.is_err());
}

#[test]
fn test_classification_keeps_no_state() {
    let config = config();
    let first = classify("sleep 1 &", &config).map(|i| i.is_background());
    let second = classify("sleep 1", &config).map(|i| i.is_background());
    assert!(matches!(first, Ok(true)));
    assert!(matches!(second, Ok(false)));
}
