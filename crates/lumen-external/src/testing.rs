//! Helpers for tests that need a real extension executable.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes `body` as an executable `/bin/sh` script named `name` in `dir`.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
