use std::fmt;
use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, Pid};

use crate::core::redirection::{RedirectMode, Redirection};
use crate::errors::{Error, ErrorKind, Result};
use crate::shell::job_control::{JobTable, Role, TerminalState};
use crate::util;

#[derive(Debug)]
enum Stdin {
    Inherit,
    File(File),
}

#[derive(Debug)]
enum Output {
    Inherit,
    File(File),
}

impl From<File> for Stdin {
    fn from(file: File) -> Self {
        Stdin::File(file)
    }
}

impl AsRawFd for Stdin {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            Stdin::Inherit => libc::STDIN_FILENO,
            Stdin::File(f) => f.as_raw_fd(),
        }
    }
}

impl From<File> for Output {
    fn from(file: File) -> Self {
        Output::File(file)
    }
}

impl From<Output> for Stdio {
    fn from(output: Output) -> Self {
        match output {
            Output::Inherit => Self::inherit(),
            Output::File(file) => file.into(),
        }
    }
}

/// The three standard streams of a child after applying its redirection.
#[derive(Debug)]
struct Streams {
    stdin: Stdin,
    stdout: Output,
    stderr: Output,
}

impl Streams {
    fn new(redirection: Option<&Redirection>) -> Result<Self> {
        let mut streams = Streams {
            stdin: Stdin::Inherit,
            stdout: Output::Inherit,
            stderr: Output::Inherit,
        };
        if let Some(redirection) = redirection {
            let file = redirection.open()?;
            match redirection.mode {
                RedirectMode::Input => streams.stdin = file.into(),
                RedirectMode::Output | RedirectMode::Append => streams.stdout = file.into(),
                RedirectMode::Stderr => streams.stderr = file.into(),
            }
        }
        Ok(streams)
    }
}

/// Everything needed to start one external command.
pub struct SpawnRequest<'a> {
    /// Name the command was typed as; becomes `argv[0]`.
    pub program: &'a str,
    /// Resolved executable.
    pub executable: &'a Path,
    /// Arguments after the command name.
    pub args: &'a [&'a str],
    pub redirection: Option<&'a Redirection>,
}

impl<'a> fmt::Debug for SpawnRequest<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {:?}", self.program, self.executable.display(), self.args)?;
        if let Some(redirection) = self.redirection {
            write!(f, " {}", redirection)?;
        }
        Ok(())
    }
}

/// Starts the command in its own process group and returns its pid.
///
/// With job control a foreground child takes the terminal before it execs
/// and gets the default disposition back for the signals the shell ignores.
///
/// # Errors
/// - `Redirection` if the redirection target cannot be opened.
/// - `ProcessCreation` if the system is out of processes or memory.
/// - `ExecFailed` if the executable could not be started.
pub fn spawn_process(request: &SpawnRequest, role: Role, job_control: bool) -> Result<Pid> {
    let streams = Streams::new(request.redirection)?;

    let mut command = Command::new(request.executable);
    command.arg0(request.program).args(request.args);

    // Configure stdout and stderr only. stdin is set up manually in pre_exec
    // *after* tcsetpgrp, which needs the original stdin to still be the tty.
    command.stdout(streams.stdout);
    command.stderr(streams.stderr);

    let stdin = streams.stdin.as_raw_fd();
    let shell_terminal = util::get_terminal();
    let take_terminal = job_control && role == Role::Foreground;
    unsafe {
        command.pre_exec(move || {
            let pid = unistd::getpid();
            // also done by the parent; whichever runs first wins
            unistd::setpgid(pid, pid)?;

            if job_control {
                if take_terminal {
                    unistd::tcsetpgrp(shell_terminal, pid)?;
                }

                signal::signal(Signal::SIGINT, SigHandler::SigDfl)?;
                signal::signal(Signal::SIGQUIT, SigHandler::SigDfl)?;
                signal::signal(Signal::SIGTSTP, SigHandler::SigDfl)?;
                signal::signal(Signal::SIGTTIN, SigHandler::SigDfl)?;
                signal::signal(Signal::SIGTTOU, SigHandler::SigDfl)?;
            }

            if stdin != libc::STDIN_FILENO {
                unistd::dup2(stdin, libc::STDIN_FILENO)?;
            }

            Ok(())
        });
    }

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            if take_terminal {
                warn!("failed to spawn child, resetting terminal's pgrp");
                let temp_result = unistd::tcsetpgrp(shell_terminal, unistd::getpgrp());
                log_if_err!(temp_result, "failed to take back control of terminal");
            }
            return Err(spawn_error(request.program, e));
        }
    };

    let pid = Pid::from_raw(child.id() as libc::pid_t);
    let temp_result = unistd::setpgid(pid, pid);
    // EACCES once the child has already exec'd; it did setpgid itself by then
    if let Err(e) = temp_result {
        debug!("setpgid for {} from the parent: {}", pid, e);
    }

    info!("spawned {:?} as {}", request, pid);
    Ok(pid)
}

/// Runs the command and waits until the reactor reports it gone.
pub fn run_foreground(jobs: &JobTable, request: &SpawnRequest, job_control: bool) -> Result<()> {
    let _terminal_state = if job_control {
        Some(TerminalState::save())
    } else {
        None
    };

    let pid = jobs.launch(Role::Foreground, || {
        spawn_process(request, Role::Foreground, job_control)
    })?;
    jobs.wait_for_foreground(pid);
    Ok(())
}

/// Starts the command without waiting for it.
pub fn run_background(jobs: &JobTable, request: &SpawnRequest, job_control: bool) -> Result<Pid> {
    jobs.launch(Role::Background, || {
        spawn_process(request, Role::Background, job_control)
    })
}

/// Out of processes or memory means no further command can run either.
fn spawn_error(program: &str, error: io::Error) -> Error {
    let kind = match error.raw_os_error() {
        Some(libc::EAGAIN) | Some(libc::ENOMEM) => ErrorKind::ProcessCreation(program.to_string()),
        _ => ErrorKind::ExecFailed(program.to_string()),
    };
    Error::with_chain(error, kind)
}
