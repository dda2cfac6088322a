use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Picks the first candidate that exists and carries an execute bit.
///
/// This is the `$PATH` walk: candidates come in `$PATH` order, so the
/// earliest directory wins.
pub fn first_executable(candidates: &[CString]) -> Option<&CStr> {
    candidates
        .iter()
        .map(CString::as_c_str)
        .find(|candidate| {
            let path = Path::new(OsStr::from_bytes(candidate.to_bytes()));
            path.exists() && is_executable(path)
        })
}

pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = path.metadata() {
        let mode = metadata.permissions().mode();
        return metadata.is_file() && mode & 0o111 != 0; // Check for execute permission
    }
    false
}
