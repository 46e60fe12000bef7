//! myshell - an interactive command interpreter
//!
//! Reads one command line at a time, runs the command in the foreground or
//! in the background, and keeps track of background jobs until they exit.

#![recursion_limit = "1024"]
#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces
)]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

/// Logs the error of a `Result` whose failure is otherwise ignored.
macro_rules! log_if_err {
    ($result:expr, $fmt:expr) => {{
        if let Err(ref e) = $result {
            error!("{}: {}", $fmt, e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)*) => {{
        if let Err(ref e) = $result {
            error!("{}: {}", format!($fmt, $($arg)*), e);
        }
    }};
}

pub mod core;
pub mod errors;
pub mod shell;
mod util;

pub use crate::shell::{Shell, ShellConfig};
pub use crate::util::ShellExitStatusExt;
