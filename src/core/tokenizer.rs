//! Splits one line of input into an argument vector and a background flag.

use std::io::{self, BufRead};

use crate::errors::{ErrorKind, Result};

/// Default maximum number of bytes accepted on one command line.
pub const MAX_LINE: usize = 80;

/// Trailing marker that runs the command in the background.
pub const BACKGROUND_MARKER: char = '&';

const LINE_TERMINATOR: u8 = b'\n';

/// A tokenized command line.
///
/// The arguments borrow from the line they were parsed from, so they cannot
/// outlive it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// Command name followed by its arguments; never contains empty tokens.
    pub args: Vec<&'a str>,
    /// `true` if the line ended with the background marker.
    pub background: bool,
}

impl<'a> CommandLine<'a> {
    /// Tokenizes `line` on blanks (spaces and tabs).
    ///
    /// A trailing `&` sets the background flag and is removed, whether it is
    /// a token of its own (`sleep 5 &`) or glued to the last one (`sleep 5&`).
    /// A `&` anywhere else is an ordinary character.
    pub fn parse(line: &'a str) -> Self {
        let mut args: Vec<&str> = line
            .split(|c: char| c == ' ' || c == '\t')
            .filter(|token| !token.is_empty())
            .collect();

        let mut background = false;
        if let Some(last) = args.pop() {
            match last.strip_suffix(BACKGROUND_MARKER) {
                Some(rest) => {
                    background = true;
                    if !rest.is_empty() {
                        args.push(rest);
                    }
                }
                None => args.push(last),
            }
        }

        CommandLine { args, background }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// The command name, if there is one.
    pub fn program(&self) -> Option<&'a str> {
        self.args.first().cloned()
    }
}

/// Reads the next command line from `reader`.
///
/// Returns `Ok(None)` at end of input. The line terminator is not part of the
/// returned line. At most `max_len` bytes of a line are buffered; reads
/// interrupted by a signal are retried.
///
/// # Errors
/// - `LineTooLong` if the line is longer than `max_len` bytes; the whole
///   line is consumed so the next call starts on the following line.
/// - `InvalidInput` if the line is not valid UTF-8.
/// - `Io` if reading fails.
pub fn read_command_line<R: BufRead + ?Sized>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<String>> {
    let mut buffer = Vec::new();
    let mut line_len = 0;
    let mut terminated = false;

    while !terminated {
        let consumed = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if available.is_empty() {
                break;
            }

            let chunk = match available.iter().position(|&b| b == LINE_TERMINATOR) {
                Some(end) => {
                    terminated = true;
                    &available[..end]
                }
                None => available,
            };
            let room = max_len.saturating_sub(buffer.len());
            buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
            line_len += chunk.len();
            chunk.len() + terminated as usize
        };
        reader.consume(consumed);
    }

    if line_len == 0 && !terminated {
        return Ok(None);
    }

    if line_len > max_len {
        return Err(ErrorKind::LineTooLong(line_len, max_len).into());
    }

    match String::from_utf8(buffer) {
        Ok(line) => Ok(Some(line)),
        Err(_) => Err(ErrorKind::InvalidInput.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor};

    use super::*;

    fn parse(line: &str) -> (Vec<&str>, bool) {
        let command_line = CommandLine::parse(line);
        (command_line.args, command_line.background)
    }

    #[test]
    fn test_blank_separated_tokens() {
        assert_eq!(parse("ls -l /tmp"), (vec!["ls", "-l", "/tmp"], false));
        assert_eq!(parse("  ls \t\t -l  "), (vec!["ls", "-l"], false));
        assert_eq!(parse(""), (vec![], false));
        assert_eq!(parse(" \t "), (vec![], false));
    }

    #[test]
    fn test_rejoining_tokens_reproduces_the_line() {
        for line in &["echo hello world", "ls   -la\t/usr/bin", " cat < in.txt "] {
            let normalized = line.split_whitespace().collect::<Vec<_>>().join(" ");
            assert_eq!(CommandLine::parse(line).args.join(" "), normalized);
        }
    }

    #[test]
    fn test_background_marker() {
        assert_eq!(parse("sleep 5 &"), (vec!["sleep", "5"], true));
        assert_eq!(parse("sleep 5 &  "), (vec!["sleep", "5"], true));
        assert_eq!(parse("sleep 5&"), parse("sleep 5 &"));
        assert_eq!(parse("ls&"), (vec!["ls"], true));
        assert_eq!(parse("&"), (vec![], true));
    }

    #[test]
    fn test_marker_inside_a_token_is_not_background() {
        assert_eq!(parse("echo a&b"), (vec!["echo", "a&b"], false));
        assert_eq!(parse("sleep 1 & ls"), (vec!["sleep", "1", "&", "ls"], false));
    }

    #[test]
    fn test_program() {
        assert_eq!(CommandLine::parse("ls -l").program(), Some("ls"));
        assert_eq!(CommandLine::parse("").program(), None);
        assert!(CommandLine::parse("   ").is_empty());
    }

    #[test]
    fn test_read_lines_until_end_of_input() {
        let mut input = Cursor::new("ls -l\n\necho done");
        assert_eq!(
            read_command_line(&mut input, MAX_LINE).unwrap(),
            Some("ls -l".to_string())
        );
        assert_eq!(
            read_command_line(&mut input, MAX_LINE).unwrap(),
            Some(String::new())
        );
        assert_eq!(
            read_command_line(&mut input, MAX_LINE).unwrap(),
            Some("echo done".to_string())
        );
        assert_eq!(read_command_line(&mut input, MAX_LINE).unwrap(), None);
    }

    #[test]
    fn test_line_length_limit() {
        let exact = "x".repeat(MAX_LINE);
        let long = "y".repeat(MAX_LINE + 1);
        let mut input = Cursor::new(format!("{}\n{}\nnext\n", exact, long));

        assert_eq!(read_command_line(&mut input, MAX_LINE).unwrap(), Some(exact));
        let error = read_command_line(&mut input, MAX_LINE).unwrap_err();
        match *error.kind() {
            ErrorKind::LineTooLong(len, max) => assert_eq!((len, max), (MAX_LINE + 1, MAX_LINE)),
            ref kind => panic!("unexpected error: {}", kind),
        }
        // the rejected line is consumed entirely
        assert_eq!(
            read_command_line(&mut input, MAX_LINE).unwrap(),
            Some("next".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut input = Cursor::new(vec![0x66, 0xff, 0xfe, b'\n', b'l', b's', b'\n']);
        let error = read_command_line(&mut input, MAX_LINE).unwrap_err();
        assert!(!error.is_fatal());
        assert_eq!(
            read_command_line(&mut input, MAX_LINE).unwrap(),
            Some("ls".to_string())
        );
    }

    #[test]
    fn test_long_line_is_discarded_in_chunks() {
        let long = "z".repeat(64 * 1024);
        let input = Cursor::new(format!("{}\nls\n", long));
        let mut input = BufReader::with_capacity(16, input);

        let error = read_command_line(&mut input, MAX_LINE).unwrap_err();
        match *error.kind() {
            ErrorKind::LineTooLong(len, max) => assert_eq!((len, max), (long.len(), MAX_LINE)),
            ref kind => panic!("unexpected error: {}", kind),
        }
        assert_eq!(
            read_command_line(&mut input, MAX_LINE).unwrap(),
            Some("ls".to_string())
        );
        assert_eq!(read_command_line(&mut input, MAX_LINE).unwrap(), None);
    }
}
