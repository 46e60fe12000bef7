//! Maps a command name to the executable file that will be run.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nix::unistd::{self, AccessFlags};

use crate::errors::{Error, Result};

/// Resolves `program` to an absolute path the current process may execute.
///
/// Names containing a `/` are taken relative to the working directory, other
/// names are searched for in `PATH`. The lookup is repeated on every call.
pub fn resolve_executable(program: &str) -> Result<PathBuf> {
    let candidate = match which::which(program) {
        Ok(candidate) => candidate,
        Err(e) => {
            debug!("no candidate for {}: {}", program, e);
            return Err(Error::command_not_executable(program));
        }
    };

    let candidate = if candidate.is_absolute() {
        candidate
    } else {
        env::current_dir()?.join(candidate)
    };

    if !is_executable(&candidate) {
        debug!("{} is not executable", candidate.display());
        return Err(Error::command_not_executable(program));
    }

    debug!("resolved {} to {}", program, candidate.display());
    Ok(candidate)
}

/// Returns `true` if `path` is a regular file with execute permission for the
/// current process.
pub fn is_executable(path: &Path) -> bool {
    let is_file = fs::metadata(path)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false);
    is_file && unistd::access(path, AccessFlags::X_OK).is_ok()
}
