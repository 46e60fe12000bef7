//! myshell - Shell Module
//!
//! The Shell reads command lines, runs builtins in-process and everything
//! else as child processes, and keeps track of background jobs.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::process::{self, ExitStatus};
use std::sync::Arc;

use crate::core::redirection;
use crate::core::resolver;
use crate::core::tokenizer::{self, CommandLine};
use crate::errors::{Error, Result};
use crate::shell::builtins::{self, Bookmarks};
use crate::shell::execute_command::{self, SpawnRequest};
use crate::shell::job_control::{self, JobTable};
use crate::shell::signals::SignalReactor;
use crate::shell::ShellConfig;
use crate::util;

const PROMPT: &str = "myshell: ";

/// The command dispatcher.
pub struct Shell {
    input: Box<dyn BufRead>,
    jobs: Arc<JobTable>,
    _reactor: SignalReactor,
    bookmarks: Bookmarks,
    config: ShellConfig,
    /// Is `false` if stdin is not a terminal or if initializing job control
    /// fails.
    is_interactive: bool,
}

impl Shell {
    /// Constructs a new Shell reading commands from stdin.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        Shell::with_input(config, Box::new(io::stdin().lock()))
    }

    /// Constructs a new Shell reading commands from `input`.
    ///
    /// Installs the signal reactor, which reaps *every* child of this
    /// process from then on.
    pub fn with_input(config: ShellConfig, input: Box<dyn BufRead>) -> Result<Shell> {
        let jobs = Arc::new(JobTable::new());
        let reactor = SignalReactor::install(Arc::clone(&jobs))?;
        let mut shell = Shell {
            input,
            jobs,
            _reactor: reactor,
            bookmarks: Bookmarks::new(),
            config,
            is_interactive: config.enable_job_control && util::isatty(),
        };

        if shell.is_interactive {
            let result = job_control::initialize_job_control();
            if let Err(e) = result {
                error!(
                    "failed to initialize shell for job control despite isatty: {}",
                    e
                );
                shell.is_interactive = false;
            }
        }

        info!("myshell started up, interactive: {}", shell.is_interactive);
        Ok(shell)
    }

    pub fn is_interactive(&self) -> bool {
        self.is_interactive
    }

    /// Prints the prompt and reads the next command line.
    /// Returns `None` when end of file is reached.
    pub fn prompt(&mut self) -> Result<Option<String>> {
        print!("{}", PROMPT);
        io::stdout().flush()?;
        tokenizer::read_command_line(&mut *self.input, self.config.max_line_length)
    }

    /// Runs one command line.
    ///
    /// Errors that only affect this command line are returned as well; use
    /// `Error::is_fatal` to tell whether the shell can go on.
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let command_line = CommandLine::parse(input);
        let program = match command_line.program() {
            Some(program) => program,
            None => return Ok(()),
        };

        if builtins::is_builtin(program) {
            let (status, result) =
                builtins::run(self, program, &command_line.args[1..], &mut io::stdout());
            debug!("{} finished with {}", program, status);
            return result;
        }

        let (args, redirection) = redirection::resolve(command_line.args)?;
        let executable = resolver::resolve_executable(program)?;
        let request = SpawnRequest {
            program,
            executable: &executable,
            args: &args[1..],
            redirection: redirection.as_ref(),
        };

        let job_control = self.is_interactive;
        if redirection.is_some() {
            if command_line.background {
                warn!("running {:?} in the foreground because of its redirection", request);
            }
            execute_command::run_foreground(&self.jobs, &request, job_control)
        } else if command_line.background {
            let pid = execute_command::run_background(&self.jobs, &request, job_control)?;
            info!("[{}] {} running in the background", pid, input.trim());
            Ok(())
        } else {
            execute_command::run_foreground(&self.jobs, &request, job_control)
        }
    }

    /// Runs command lines from the shell's input until end of file is
    /// received.
    ///
    /// Returns the first fatal error; every other error is reported and the
    /// next line is read.
    pub fn execute_from_stdin(&mut self) -> Result<()> {
        loop {
            let result = match self.prompt() {
                Ok(Some(line)) => self.execute_command_string(&line),
                Ok(None) => break,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                if e.is_fatal() {
                    return Err(e);
                }
                report_error(&e);
            }
        }

        info!("end of input");
        Ok(())
    }

    /// Returns `true` if the shell has background jobs.
    pub fn has_background_jobs(&self) -> bool {
        self.jobs.has_background_jobs()
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    pub fn bookmarks_mut(&mut self) -> &mut Bookmarks {
        &mut self.bookmarks
    }

    /// Exit the shell.
    ///
    /// Valid exit codes are between 0 and 255. Exit the shell with a status of
    /// n. If n is None, then the exit status is 0.
    pub fn exit(&mut self, n: Option<ExitStatus>) -> ! {
        if self.is_interactive && self.config.display_messages {
            println!("exit");
        }

        let code = n
            .and_then(|n| n.code())
            .map(util::fold_exit_code)
            .unwrap_or(0);

        info!("myshell has shut down with {}", code);
        process::exit(code);
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} jobs\n{:?}", self.jobs, self.bookmarks)
    }
}

/// Prints an error that does not stop the shell.
fn report_error(error: &Error) {
    warn!("{}", error.display_chain_inline());
    eprintln!("myshell: {}", error.display_chain_inline());
}
