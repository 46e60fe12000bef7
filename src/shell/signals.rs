//! Asynchronous signal handling.
//!
//! signal-hook's handlers only write to a self-pipe; a dedicated thread reads
//! the pipe and does the actual work (reaping children, killing the
//! foreground job) outside of signal context.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use signal_hook::consts::signal::{SIGCHLD, SIGTSTP};
use signal_hook::iterator::{Handle, Signals};

use crate::errors::Result;
use crate::shell::job_control::JobTable;

/// Owns the reactor thread; the thread stops when this is dropped.
pub struct SignalReactor {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalReactor {
    /// Registers for child termination and interactive stop signals and
    /// starts the reactor thread.
    pub fn install(jobs: Arc<JobTable>) -> Result<SignalReactor> {
        let mut signals = Signals::new(&[SIGCHLD, SIGTSTP])?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("signal-reactor".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    match signal {
                        SIGCHLD => reap_children(&jobs),
                        SIGTSTP => match jobs.interrupt_foreground() {
                            Some(pid) => info!("stop requested, killed foreground job {}", pid),
                            None => debug!("stop requested without a foreground job"),
                        },
                        _ => unreachable!(),
                    }
                }
                debug!("signal reactor finished");
            })?;

        debug!("signal reactor installed");
        Ok(SignalReactor {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalReactor {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("signal reactor thread panicked");
            }
        }
    }
}

impl fmt::Debug for SignalReactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalReactor {{ running: {} }}", self.thread.is_some())
    }
}

/// Collects every child that has changed state since the last call.
///
/// Several terminations can be reported by a single notification, so
/// `waitpid` is repeated until nothing is left.
pub fn reap_children(jobs: &JobTable) {
    jobs.reap_with(next_child_status);
}

fn next_child_status() -> Option<WaitStatus> {
    loop {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED;
        match wait::waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::StillAlive) => return None,
            Ok(wait_status) => return Some(wait_status),
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return None,
            Err(e) => {
                error!("failed to wait for children: {}", e);
                return None;
            }
        }
    }
}
