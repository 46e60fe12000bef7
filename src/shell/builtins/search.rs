use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::shell::builtins::{self, prelude::*};

pub struct Search;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    arg_text: Vec<String>,
    flag_r: bool,
}

impl builtins::BuiltinCommand for Search {
    const NAME: &'static str = builtins::SEARCH_NAME;

    const HELP: &'static str = "\
search: search [-r] \"<text>\"
    Print the lines of C source and header files that contain TEXT.

    Files in the current directory whose name contains .c or .h are
    searched. Each match is printed as `line: path -> contents`.

Usage:
    search [-r] <text>...

Options:
    -r      search sub-directories too";

    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let args: SearchArgs = parse_args(Self::HELP, Self::NAME, args.iter().map(AsRef::as_ref))?;
        debug!("{:?}", args);

        let text = builtins::unquote(&args.arg_text[..])
            .ok_or_else(|| Error::builtin_usage(Self::NAME))?;
        search_directory(Path::new("."), &text, args.flag_r, stdout).chain_err(|| {
            ErrorKind::BuiltinCommand(
                "search: failed to search the current directory".to_string(),
                1,
            )
        })
    }
}

/// Searches the matching files of `directory` for `text`, in file name order.
///
/// Symbolic links are never followed. Unreadable files and sub-directories are
/// reported and skipped.
fn search_directory(
    directory: &Path,
    text: &str,
    recursive: bool,
    stdout: &mut dyn Write,
) -> Result<()> {
    let mut entries = fs::read_dir(directory)?.collect::<::std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive {
                let temp_result = search_directory(&path, text, recursive, stdout);
                if let Err(e) = temp_result {
                    warn!("skipping {}: {}", path.display(), e);
                    eprintln!("search: {}: {}", path.display(), e);
                }
            }
        } else if file_type.is_file() && is_source_file(&entry.file_name().to_string_lossy()) {
            let temp_result = search_file(&path, text, stdout);
            if let Err(e) = temp_result {
                warn!("skipping {}: {}", path.display(), e);
                eprintln!("search: cannot open file {}: {}", path.display(), e);
            }
        }
    }

    Ok(())
}

fn is_source_file(name: &str) -> bool {
    name.contains(".c") || name.contains(".h")
}

fn search_file(path: &Path, text: &str, stdout: &mut dyn Write) -> Result<()> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buffer = Vec::new();
    let mut line_number = 0;
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        line_number += 1;

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end_matches('\n');
        if line.contains(text) {
            writeln!(stdout, "{}: {} -> {}", line_number, path.display(), line)?;
        }
    }
    Ok(())
}
