//! Shell builtins
//!
//! Builtins run inside the shell process and never fork. They see the
//! command line's arguments as typed, including redirection operators; only
//! a trailing background marker has already been stripped and is ignored.

use std::iter;

use docopt::Docopt;

use self::prelude::*;

use self::bookmark::Bookmark;
use self::exit::Exit;
use self::search::Search;

pub use self::bookmark::Bookmarks;

pub mod prelude {
    pub use std::io::Write;
    pub use std::process::ExitStatus;

    pub use super::{parse_args, BuiltinCommand};
    pub use crate::errors::{Error, ErrorKind, Result, ResultExt};
    pub use crate::shell::Shell;
    pub use crate::util::ShellExitStatusExt;
}

mod bookmark;
mod exit;
mod search;

const BOOKMARK_NAME: &str = "bookmark";
const EXIT_NAME: &str = "exit";
const SEARCH_NAME: &str = "search";

/// Represents a builtin command such as exit or search.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string to display to the user; doubles as the docopt usage.
    const HELP: &'static str;
    /// The usage string to display to the user.
    fn usage() -> String {
        Self::HELP.lines().next().unwrap_or(Self::NAME).to_owned()
    }
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [BOOKMARK_NAME, EXIT_NAME, SEARCH_NAME].contains(&program.as_ref())
}

/// precondition: command is a builtin.
/// Returns (`exit_status_code`, `builtin_result`)
pub fn run<S1, S2>(
    shell: &mut Shell,
    program: S1,
    args: &[S2],
    stdout: &mut dyn Write,
) -> (ExitStatus, Result<()>)
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    let result = match program.as_ref() {
        BOOKMARK_NAME => Bookmark::run(shell, args, stdout),
        EXIT_NAME => Exit::run(shell, args, stdout),
        SEARCH_NAME => Search::run(shell, args, stdout),
        _ => unreachable!(),
    };

    let exit_status = get_builtin_exit_status(&result);
    (exit_status, result)
}

fn get_builtin_exit_status(result: &Result<()>) -> ExitStatus {
    let status = if let Err(ref e) = *result {
        match *e.kind() {
            ErrorKind::BuiltinCommand(_, code) => code,
            ErrorKind::BuiltinUsage(_) => 2,
            _ => 1,
        }
    } else {
        0
    };

    ExitStatus::from_status(status)
}

/// Parses `args` against the docopt `usage` of `program`.
///
/// Options are only recognized before the first positional argument, so
/// quoted text such as `"-l"` or `-x"` is never mistaken for a flag.
pub fn parse_args<'de, D, S, I>(usage: &str, program: S, args: I) -> Result<D>
where
    D: serde::Deserialize<'de>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let name = program.as_ref().to_string();
    Docopt::new(usage)?
        .options_first(true)
        .argv(iter::once(program).chain(args))
        .deserialize()
        .map_err(|e| {
            debug!("{}: {}", name, e);
            Error::builtin_usage(&name)
        })
}

/// Joins `words` with single spaces and strips the surrounding double quotes.
///
/// Returns `None` unless the joined text starts and ends with `"` and is at
/// least three characters long, i.e. the quoted text is not empty.
fn unquote<T: AsRef<str>>(words: &[T]) -> Option<String> {
    let joined = words
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ");
    if joined.len() < 3 || !joined.starts_with('"') || !joined.ends_with('"') {
        return None;
    }
    Some(joined[1..joined.len() - 1].to_string())
}
