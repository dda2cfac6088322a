use std::ffi::CString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::TempDir;

use crate::config::ShellConfig;
use crate::program::{ProgramDescriptor, Resolution};
use crate::types::ShellError;
use crate::utils::{first_executable, is_executable};

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn descriptor(text: &str) -> ProgramDescriptor {
    ProgramDescriptor::build(text).unwrap()
}

#[test]
fn test_resolution_kinds() {
    assert_eq!(Resolution::of("ls -l"), Resolution::PathSearch);
    assert_eq!(Resolution::of("/bin/ls"), Resolution::Absolute);
    assert_eq!(Resolution::of("./run.sh arg"), Resolution::Relative);
    assert_eq!(Resolution::of("../up/tool"), Resolution::PathSearch);
}

#[test]
fn test_argv_stops_at_markers() {
    let d = descriptor("grep -i needle < hay > out");
    assert_eq!(d.kind, Resolution::PathSearch);
    assert_eq!(d.argv, vec![c("grep"), c("-i"), c("needle")]);
    assert_eq!(d.name(), "grep");
}

#[test]
fn test_relative_program_loses_dot_slash() {
    let d = descriptor("./build/tool --fast");
    assert_eq!(d.kind, Resolution::Relative);
    assert_eq!(d.argv, vec![c("build/tool"), c("--fast")]);
}

#[test]
fn test_missing_program_name() {
    assert!(matches!(ProgramDescriptor::build("   "), Err(ShellError::Syntax(_))));
    assert!(matches!(ProgramDescriptor::build("./"), Err(ShellError::Syntax(_))));
}

#[test]
fn test_candidates_follow_path_order() {
    let d = descriptor("tool");
    let candidates = d
        .launch_candidates(Some("/opt/bin::/usr/bin"), Path::new("/ignored"))
        .unwrap();
    assert_eq!(candidates, vec![c("/opt/bin/tool"), c("/usr/bin/tool")]);
}

#[test]
fn test_candidates_for_absolute_and_relative() {
    let abs = descriptor("/usr/bin/env");
    assert_eq!(abs.launch_candidates(None, Path::new("/w")).unwrap(), vec![c("/usr/bin/env")]);

    let rel = descriptor("./scripts/go");
    assert_eq!(rel.launch_candidates(None, Path::new("/w")).unwrap(), vec![c("/w/scripts/go")]);
}

#[test]
fn test_path_search_without_path_variable() {
    let result = descriptor("ls").launch_candidates(None, Path::new("/"));
    assert!(matches!(result, Err(ShellError::Environment(_))));
}

#[test]
fn test_first_executable_skips_plain_files_and_directories() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let third = dir.path().join("third");
    fs::create_dir_all(first.join("tool")).unwrap();
    fs::create_dir_all(&second).unwrap();
    fs::create_dir_all(&third).unwrap();

    fs::write(second.join("tool"), "data").unwrap();
    fs::set_permissions(second.join("tool"), fs::Permissions::from_mode(0o644)).unwrap();
    fs::write(third.join("tool"), "#!/bin/sh\n").unwrap();
    fs::set_permissions(third.join("tool"), fs::Permissions::from_mode(0o755)).unwrap();

    let path_var = format!(
        "{}:{}:{}",
        first.display(),
        second.display(),
        third.display()
    );
    let candidates = descriptor("tool")
        .launch_candidates(Some(&path_var), Path::new("/"))
        .unwrap();
    assert_eq!(candidates.len(), 3);

    let found = first_executable(&candidates).unwrap();
    assert_eq!(found.to_str().unwrap(), third.join("tool").to_str().unwrap());
    assert!(is_executable(&third.join("tool")));
    assert!(!is_executable(&second.join("tool")));
}

#[test]
fn test_first_executable_none() {
    assert!(first_executable(&[c("/definitely/not/here")]).is_none());
    assert!(first_executable(&[]).is_none());
}

#[test]
fn test_config_layout() {
    let config = ShellConfig::new("/home/me/shell");
    assert_eq!(config.base_dir(), Path::new("/home/me/shell"));
    assert_eq!(config.stdin_target("in"), Path::new("/home/me/shell/redir/stdin/in"));
    assert_eq!(config.stdout_target("out"), Path::new("/home/me/shell/redir/stdout/out"));
    assert_eq!(config.batch_file("setup"), Path::new("/home/me/shell/bfs/setup.sh"));
}
