use std::fmt;

use crate::core::tokenizer::CommandLine;
use crate::shell::builtins::{self, prelude::*};

pub struct Bookmark;

#[derive(Debug, Deserialize)]
struct BookmarkArgs {
    arg_command: Vec<String>,
    arg_index: Option<usize>,
    flag_l: bool,
    flag_d: bool,
    flag_i: bool,
}

impl builtins::BuiltinCommand for Bookmark {
    const NAME: &'static str = builtins::BOOKMARK_NAME;

    const HELP: &'static str = "\
bookmark: bookmark \"<command>\" | -l | -d <index> | -i <index>
    Remember command lines for the rest of the session.

    Without options the quoted COMMAND is added to the bookmarks.

Usage:
    bookmark -l
    bookmark -d <index>
    bookmark -i <index>
    bookmark <command>...

Options:
    -l      list bookmarks with their index
    -d      delete the bookmark at INDEX
    -i      run the bookmark at INDEX";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let args: BookmarkArgs =
            parse_args(Self::HELP, Self::NAME, args.iter().map(AsRef::as_ref))?;
        debug!("{:?}", args);

        let usage = || Error::builtin_usage(Self::NAME);
        if args.flag_l {
            write!(stdout, "{}", shell.bookmarks())?;
        } else if args.flag_d {
            let index = args.arg_index.ok_or_else(usage)?;
            let removed = shell.bookmarks_mut().remove(index).ok_or_else(usage)?;
            info!("removed bookmark {} \"{}\"", index, removed);
        } else if args.flag_i {
            let index = args.arg_index.ok_or_else(usage)?;
            let command = shell
                .bookmarks()
                .get(index)
                .map(str::to_owned)
                .ok_or_else(usage)?;
            if CommandLine::parse(&command).program() == Some(Self::NAME) {
                return Err(Error::builtin_command(
                    "bookmark: a bookmark cannot run bookmark",
                    1,
                ));
            }
            info!("running bookmark {} \"{}\"", index, command);
            shell.execute_command_string(&command)?;
        } else {
            let command = builtins::unquote(&args.arg_command[..]).ok_or_else(usage)?;
            shell.bookmarks_mut().add(command);
        }

        Ok(())
    }
}

/// Command lines bookmarked during this session, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bookmarks {
    entries: Vec<String>,
}

impl Bookmarks {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add<T: Into<String>>(&mut self, command: T) {
        self.entries.push(command.into());
    }

    /// Removes the bookmark at `index`; later bookmarks move down by one.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Bookmarks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, command) in self.entries.iter().enumerate() {
            writeln!(f, "{} \"{}\"", index, command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_list() {
        let mut bookmarks = Bookmarks::new();
        assert!(bookmarks.is_empty());
        assert_eq!(bookmarks.to_string(), "");

        bookmarks.add("ls -l");
        bookmarks.add("echo hello world");
        assert_eq!(bookmarks.len(), 2);
        assert_eq!(
            bookmarks.to_string(),
            "0 \"ls -l\"\n1 \"echo hello world\"\n"
        );
    }

    #[test]
    fn test_remove_shifts_later_bookmarks() {
        let mut bookmarks = Bookmarks::new();
        bookmarks.add("first");
        bookmarks.add("second");
        bookmarks.add("third");

        assert_eq!(bookmarks.remove(0), Some("first".to_string()));
        assert_eq!(bookmarks.get(0), Some("second"));
        assert_eq!(bookmarks.get(1), Some("third"));
        assert_eq!(bookmarks.get(2), None);
    }

    #[test]
    fn test_out_of_range() {
        let mut bookmarks = Bookmarks::new();
        bookmarks.add("ls");
        assert_eq!(bookmarks.remove(1), None);
        assert_eq!(bookmarks.get(5), None);
        assert_eq!(bookmarks.len(), 1);
    }

    #[test]
    fn test_usage_shapes() {
        let parse = |args: &[&str]| -> Result<BookmarkArgs> {
            parse_args(Bookmark::HELP, Bookmark::NAME, args.iter().cloned())
        };

        let args = parse(&["-l"]).unwrap();
        assert!(args.flag_l);

        let args = parse(&["-d", "3"]).unwrap();
        assert!(args.flag_d);
        assert_eq!(args.arg_index, Some(3));

        let args = parse(&["\"ls", "-l\""]).unwrap();
        assert_eq!(args.arg_command, vec!["\"ls", "-l\""]);
        assert!(!args.flag_l);

        assert!(parse(&[]).is_err());
        assert!(parse(&["-l", "extra"]).is_err());
        assert!(parse(&["-d"]).is_err());
        assert!(parse(&["-i", "first"]).is_err());
        assert!(parse(&["-d", "-1"]).is_err());
    }
}
