extern crate dirs;
extern crate docopt;
extern crate fern;
#[macro_use]
extern crate log;
extern crate myshell;
extern crate nix;
#[macro_use]
extern crate serde_derive;

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::process::{self, ExitStatus};

use docopt::Docopt;
use log::LevelFilter;
use nix::libc;
use nix::unistd::{self, Pid};

use myshell::errors::*;
use myshell::{Shell, ShellConfig, ShellExitStatusExt};

const LOG_FILE_NAME: &str = ".myshell_log";

const USAGE: &str = "
myshell.

Usage:
    myshell [options]
    myshell [options] -c <command>
    myshell (-h | --help)
    myshell --version

Options:
    -h --help               Show this screen.
    --version               Show version.
    -c                      If the -c option is present, then the command line is read from
                                the first non-option argument command.
    --log=<path>            File to write log to, defaults to ~/.myshell_log
    --log-level=<level>     Least severe log level written [default: info].
    --stderr=<path>         Redirect the shell's standard error, and that of its commands,
                                to a file.
    --max-line=<n>          Longest command line accepted, in bytes [default: 80].
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    flag_version: bool,
    flag_c: bool,
    flag_log: Option<String>,
    flag_log_level: String,
    flag_stderr: Option<String>,
    flag_max_line: usize,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if let Some(ref path) = args.flag_stderr {
        redirect_stderr(path).unwrap_or_else(|e| display_error_and_exit(&e));
    }

    if let Err(e) = init_logger(&args.flag_log, &args.flag_log_level) {
        eprintln!("myshell: logging disabled: {}", e.display_chain_inline());
    }
    debug!("{:?}", args);

    if args.flag_version {
        println!("myshell version {}", env!("CARGO_PKG_VERSION"));
    } else if args.flag_c {
        execute_from_command_string(&args);
    } else {
        execute_from_stdin(&args);
    }
}

fn init_logger(path: &Option<String>, level: &str) -> Result<()> {
    let log_path = match path.clone().map(PathBuf::from).or_else(default_log_path) {
        Some(log_path) => log_path,
        None => return Err("unable to get home directory".into()),
    };

    let level = level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!("myshell: unknown log level {}, using info", level);
        LevelFilter::Info
    });

    let pid = Pid::this();
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(fern::log_file(log_path)?)
        .apply()
        .map_err(|e| Error::from(format!("failed to install logger: {}", e)))
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_FILE_NAME))
}

/// Points this process's standard error at `path`; children inherit it.
fn redirect_stderr(path: &str) -> Result<()> {
    let file = File::create(path).chain_err(|| format!("cannot open {}", path))?;
    unistd::dup2(file.as_raw_fd(), libc::STDERR_FILENO)?;
    Ok(())
}

fn config(args: &Args, config: ShellConfig) -> ShellConfig {
    config.with_max_line_length(args.flag_max_line)
}

fn execute_from_command_string(args: &Args) -> ! {
    let shell_config = config(args, ShellConfig::noninteractive());
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));

    let command = args.arg_command.as_ref().map(String::as_str).unwrap_or("");
    exit(shell.execute_command_string(command), &mut shell);
}

fn execute_from_stdin(args: &Args) -> ! {
    let shell_config = config(args, ShellConfig::interactive());
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));
    let result = shell.execute_from_stdin();
    exit(result, &mut shell);
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error.display_chain_inline());
    eprintln!("myshell: {}", error.display_chain_inline());
    process::exit(ExitStatus::from_failure().code().unwrap_or(1));
}

fn exit(result: Result<()>, shell: &mut Shell) -> ! {
    if let Err(e) = result {
        error!("{}", e.display_chain_inline());
        eprintln!("myshell: {}", e.display_chain_inline());
        shell.exit(Some(ExitStatus::from_failure()));
    } else {
        shell.exit(None);
    }
}
