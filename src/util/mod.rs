use std::os::unix::io::RawFd;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::libc;
use nix::unistd;

/// Utility Extensions for `ExitStatus`
pub trait ShellExitStatusExt {
    /// Create an ExitStatus to indicate *successful* program execution.
    fn from_success() -> Self;

    /// Create an ExitStatus to indicate *unsuccessful* program execution.
    fn from_failure() -> Self;

    /// Create an ExitStatus from a status code
    fn from_status(code: i32) -> Self;
}

impl ShellExitStatusExt for ExitStatus {
    /// # Examples
    /// ```rust
    /// use myshell::ShellExitStatusExt;
    /// use std::process::ExitStatus;
    /// assert!(ExitStatus::from_success().success());
    /// ```
    fn from_success() -> Self {
        ExitStatus::from_status(0)
    }

    /// # Examples
    /// ```rust
    /// use myshell::ShellExitStatusExt;
    /// use std::process::ExitStatus;
    /// assert!(!ExitStatus::from_failure().success());
    /// ```
    fn from_failure() -> Self {
        ExitStatus::from_status(1)
    }

    /// # Examples
    /// ```rust
    /// use myshell::ShellExitStatusExt;
    /// use std::process::ExitStatus;
    /// assert!(ExitStatus::from_status(0).success());
    /// assert!(!ExitStatus::from_status(1).success());
    /// ```
    fn from_status(code: i32) -> Self {
        ExitStatus::from_raw(code << 8)
    }
}

/// Folds an exit code into 0..=255 the way bash does: positive `n` becomes
/// `n % 256` and negative `n` becomes `(256 + n) % 256`.
pub fn fold_exit_code(code: i32) -> i32 {
    if code < 0 {
        (256 + code % 256) % 256
    } else {
        code % 256
    }
}

pub fn get_terminal() -> RawFd {
    libc::STDIN_FILENO
}

pub fn isatty() -> bool {
    let temp_result = unistd::isatty(get_terminal());
    log_if_err!(temp_result, "unistd::isatty");
    temp_result.unwrap_or(false)
}
