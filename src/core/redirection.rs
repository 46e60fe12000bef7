//! Redirection plan: which standard stream of the command is replaced by a
//! file.
//!
//! Only the first operator on a line is honored; the operator and every
//! token after it are dropped from the arguments passed to the program.

use std::fmt;
use std::fs::{File, OpenOptions};

use crate::errors::{ErrorKind, Result, ResultExt};

/// Stream affected by a redirection and how its file is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectMode {
    /// `< file`: standard input read from `file`
    Input,
    /// `> file`: standard output written to `file`, truncating it
    Output,
    /// `>> file`: standard output appended to `file`
    Append,
    /// `2> file`: standard error written to `file`, truncating it
    Stderr,
}

impl RedirectMode {
    fn from_operator(token: &str) -> Option<Self> {
        match token {
            "<" => Some(RedirectMode::Input),
            ">" => Some(RedirectMode::Output),
            ">>" => Some(RedirectMode::Append),
            "2>" => Some(RedirectMode::Stderr),
            _ => None,
        }
    }

    pub fn operator(self) -> &'static str {
        match self {
            RedirectMode::Input => "<",
            RedirectMode::Output => ">",
            RedirectMode::Append => ">>",
            RedirectMode::Stderr => "2>",
        }
    }
}

impl fmt::Display for RedirectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operator())
    }
}

/// A single redirection: mode plus target file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirection {
    pub mode: RedirectMode,
    pub target: String,
}

impl Redirection {
    pub fn new<T: Into<String>>(mode: RedirectMode, target: T) -> Self {
        Self {
            mode,
            target: target.into(),
        }
    }

    /// Opens the target file the way the mode requires.
    pub fn open(&self) -> Result<File> {
        let mut options = OpenOptions::new();
        match self.mode {
            RedirectMode::Input => options.read(true),
            RedirectMode::Output | RedirectMode::Stderr => {
                options.write(true).create(true).truncate(true)
            }
            RedirectMode::Append => options.append(true).create(true),
        };

        let file = options
            .open(&self.target)
            .chain_err(|| ErrorKind::Redirection(self.target.clone()))?;
        debug!("opened {} for redirection {}", self.target, self.mode);
        Ok(file)
    }
}

impl fmt::Display for Redirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode, self.target)
    }
}

/// Finds the first redirection operator in `args`.
///
/// Returns the arguments that precede the operator and the redirection, or
/// the untouched arguments and `None` when there is no operator.
///
/// # Errors
/// - `MissingRedirectTarget` if the operator is the last token.
/// - `MissingCommand` if the operator is the first token.
pub fn resolve<'a>(mut args: Vec<&'a str>) -> Result<(Vec<&'a str>, Option<Redirection>)> {
    let found = args
        .iter()
        .enumerate()
        .find_map(|(i, token)| RedirectMode::from_operator(token).map(|mode| (i, mode)));

    let (position, mode) = match found {
        Some(found) => found,
        None => return Ok((args, None)),
    };

    let target = match args.get(position + 1) {
        Some(target) => *target,
        None => return Err(ErrorKind::MissingRedirectTarget(mode.operator().into()).into()),
    };

    if args.len() > position + 2 {
        debug!(
            "ignoring tokens after redirection target: {:?}",
            &args[position + 2..]
        );
    }

    args.truncate(position);
    if args.is_empty() {
        return Err(ErrorKind::MissingCommand.into());
    }

    Ok((args, Some(Redirection::new(mode, target))))
}
