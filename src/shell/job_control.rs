//! Job bookkeeping shared between the read-eval loop and the signal reactor.
//!
//! The `JobTable` holds the single foreground slot and the set of live
//! background process ids behind one mutex. The loop inserts, the reactor
//! removes; spawning happens while the lock is held so a child can never be
//! reaped before it has been recorded.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::termios::{self, Termios};
use nix::sys::wait::WaitStatus;
use nix::unistd::{self, Pid};

use crate::errors::Result;
use crate::util;

/// Whether the dispatcher waits for a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Foreground,
    Background,
}

#[derive(Debug, Default)]
struct Jobs {
    foreground: Option<Pid>,
    background: BTreeSet<Pid>,
}

impl Jobs {
    /// Records the outcome of `waitpid`.
    ///
    /// Returns the process group to kill when the foreground job was stopped
    /// from the terminal; stopped jobs are never resumed.
    fn mark_process_status(&mut self, wait_status: &WaitStatus) -> Option<Pid> {
        match *wait_status {
            WaitStatus::Exited(pid, status_code) => {
                debug!("{} exited with {}.", pid, status_code);
                self.forget(pid);
                None
            }
            WaitStatus::Signaled(pid, signal, ..) => {
                debug!("{} terminated by signal {:?}.", pid, signal);
                self.forget(pid);
                None
            }
            WaitStatus::Stopped(pid, signal) => {
                debug!("{} was signaled to stop {:?}.", pid, signal);
                if self.foreground == Some(pid) {
                    self.foreground = None;
                    Some(pid)
                } else {
                    warn!("background job {} stopped and cannot be resumed", pid);
                    None
                }
            }
            _ => None,
        }
    }

    fn forget(&mut self, pid: Pid) {
        if self.foreground == Some(pid) {
            self.foreground = None;
        } else if self.background.remove(&pid) {
            info!("background job {} finished", pid);
        } else {
            debug!("{} was not tracked", pid);
        }
    }
}

/// Foreground slot and background job collection.
#[derive(Default)]
pub struct JobTable {
    jobs: Mutex<Jobs>,
    foreground_cleared: Condvar,
}

impl JobTable {
    pub fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, Jobs> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `spawn` with the table locked and records the new process with
    /// the given `role`.
    pub fn launch<F>(&self, role: Role, spawn: F) -> Result<Pid>
    where
        F: FnOnce() -> Result<Pid>,
    {
        let mut jobs = self.lock();
        let pid = spawn()?;
        match role {
            Role::Foreground => {
                debug_assert!(jobs.foreground.is_none(), "foreground slot is taken");
                jobs.background.remove(&pid);
                jobs.foreground = Some(pid);
            }
            Role::Background => {
                debug_assert!(jobs.foreground != Some(pid));
                jobs.background.insert(pid);
            }
        }
        debug!("launched {} in the {:?}", pid, role);
        Ok(pid)
    }

    /// Blocks until `pid` no longer occupies the foreground slot.
    pub fn wait_for_foreground(&self, pid: Pid) {
        let mut jobs = self.lock();
        while jobs.foreground == Some(pid) {
            jobs = self
                .foreground_cleared
                .wait(jobs)
                .unwrap_or_else(PoisonError::into_inner);
        }
        debug!("foreground job {} is done", pid);
    }

    /// Kills the foreground job's process group and clears the slot.
    ///
    /// Returns the killed job, or `None` if there was no foreground job.
    pub fn interrupt_foreground(&self) -> Option<Pid> {
        let pid = self.lock().foreground.take();
        if let Some(pid) = pid {
            kill_process_group(pid);
            self.foreground_cleared.notify_all();
        }
        pid
    }

    /// Applies every status produced by `next_status` while holding the lock.
    ///
    /// `next_status` is called until it returns `None`, which lets the caller
    /// drain several coalesced child notifications at once.
    pub fn reap_with<F>(&self, mut next_status: F)
    where
        F: FnMut() -> Option<WaitStatus>,
    {
        let mut jobs = self.lock();
        let foreground = jobs.foreground;
        while let Some(wait_status) = next_status() {
            if let Some(pid) = jobs.mark_process_status(&wait_status) {
                kill_process_group(pid);
            }
        }

        if jobs.foreground != foreground {
            self.foreground_cleared.notify_all();
        }
    }

    pub fn foreground(&self) -> Option<Pid> {
        self.lock().foreground
    }

    pub fn has_background_jobs(&self) -> bool {
        !self.lock().background.is_empty()
    }

    /// Live background jobs, in ascending pid order.
    pub fn background_jobs(&self) -> Vec<Pid> {
        self.lock().background.iter().cloned().collect()
    }
}

impl fmt::Debug for JobTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let jobs = self.lock();
        write!(
            f,
            "foreground: {:?}\tbackground: {:?}",
            jobs.foreground, jobs.background
        )
    }
}

fn kill_process_group(pgid: Pid) {
    info!("killing process group {}", pgid);
    let temp_result = signal::killpg(pgid, Signal::SIGKILL);
    log_if_err!(temp_result, "failed to kill process group {}", pgid);
}

/// Puts the shell in its own process group in control of the terminal.
///
/// Interactive and job-control signals are ignored by the shell itself; the
/// interactive stop signal is left to the signal reactor.
pub fn initialize_job_control() -> Result<()> {
    let shell_terminal = util::get_terminal();

    // Loop until the shell is in the foreground
    loop {
        let shell_pgid = unistd::getpgrp();
        if unistd::tcgetpgrp(shell_terminal)? == shell_pgid {
            break;
        }
        signal::killpg(shell_pgid, Signal::SIGTTIN)?;
    }

    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::SigIgn)?;
        signal::signal(Signal::SIGQUIT, SigHandler::SigIgn)?;
        signal::signal(Signal::SIGTTIN, SigHandler::SigIgn)?;
        signal::signal(Signal::SIGTTOU, SigHandler::SigIgn)?;
    }

    // Put ourselves in our own process group; this fails harmlessly when the
    // shell already leads its session.
    let shell_pgid = Pid::this();
    let temp_result = unistd::setpgid(shell_pgid, shell_pgid);
    log_if_err!(temp_result, "failed to put the shell in its own process group");

    let temp_result = unistd::tcsetpgrp(shell_terminal, unistd::getpgrp());
    log_if_err!(temp_result, "failed to grab control of terminal");

    Ok(())
}

/// RAII struct to encapsulate manipulating terminal state.
///
/// A foreground job takes the terminal itself before it execs; dropping the
/// guard gives the terminal back to the shell along with the shell's
/// terminal modes.
pub struct TerminalState {
    prev_pgid: Pid,
    prev_tmodes: Option<Termios>,
}

impl TerminalState {
    pub fn save() -> TerminalState {
        let shell_terminal = util::get_terminal();
        TerminalState {
            prev_pgid: unistd::getpgrp(),
            prev_tmodes: termios::tcgetattr(shell_terminal).ok(),
        }
    }
}

impl Drop for TerminalState {
    fn drop(&mut self) {
        debug!("putting shell back into foreground and restoring shell's terminal modes");
        let shell_terminal = util::get_terminal();
        let temp_result = unistd::tcsetpgrp(shell_terminal, self.prev_pgid);
        log_if_err!(temp_result, "failed to take back control of terminal");
        if let Some(ref prev_tmodes) = self.prev_tmodes {
            let temp_result =
                termios::tcsetattr(shell_terminal, termios::SetArg::TCSADRAIN, prev_tmodes);
            log_if_err!(
                temp_result,
                "error restoring terminal configuration for shell"
            );
        }
    }
}

impl fmt::Debug for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TerminalState {{ prev_pgid: {} }}", self.prev_pgid)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    fn launch(table: &JobTable, role: Role, raw: i32) -> Pid {
        table.launch(role, || Ok(pid(raw))).unwrap()
    }

    /// Feeds `statuses` to the table as one coalesced notification.
    fn reap(table: &JobTable, statuses: Vec<WaitStatus>) {
        let mut statuses = statuses.into_iter();
        table.reap_with(|| statuses.next());
    }

    #[test]
    fn test_background_jobs_are_tracked_until_they_exit() {
        let table = JobTable::new();
        launch(&table, Role::Background, 100);
        launch(&table, Role::Background, 101);
        assert!(table.has_background_jobs());
        assert_eq!(table.background_jobs(), vec![pid(100), pid(101)]);

        reap(&table, vec![WaitStatus::Exited(pid(100), 0)]);
        assert_eq!(table.background_jobs(), vec![pid(101)]);

        reap(&table, vec![WaitStatus::Exited(pid(101), 1)]);
        assert!(!table.has_background_jobs());
    }

    #[test]
    fn test_coalesced_notifications_are_drained() {
        let table = JobTable::new();
        for raw in 200..210 {
            launch(&table, Role::Background, raw);
        }

        reap(
            &table,
            (200..210).map(|raw| WaitStatus::Exited(pid(raw), 0)).collect(),
        );
        assert!(table.background_jobs().is_empty());
    }

    #[test]
    fn test_signaled_background_job_is_removed() {
        let table = JobTable::new();
        launch(&table, Role::Background, 300);
        reap(
            &table,
            vec![WaitStatus::Signaled(pid(300), Signal::SIGTERM, false)],
        );
        assert!(!table.has_background_jobs());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let table = JobTable::new();
        launch(&table, Role::Background, 400);
        launch(&table, Role::Background, 402);
        reap(
            &table,
            vec![
                WaitStatus::Exited(pid(400), 0),
                WaitStatus::Exited(pid(400), 0),
                WaitStatus::Exited(pid(401), 0),
            ],
        );
        assert_eq!(table.background_jobs(), vec![pid(402)]);
        reap(&table, vec![WaitStatus::Exited(pid(400), 0)]);
        assert_eq!(table.background_jobs(), vec![pid(402)]);
    }

    #[test]
    fn test_stopped_foreground_job_is_cleared() {
        // beyond the kernel's pid limit, so killing its group reaches nothing
        let job = pid(5_000_000);
        let table = Arc::new(JobTable::new());
        launch(&table, Role::Background, 450);
        table.launch(Role::Foreground, || Ok(job)).unwrap();

        let reaper = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                reap(&table, vec![WaitStatus::Stopped(job, Signal::SIGTSTP)]);
            })
        };

        table.wait_for_foreground(job);
        assert_eq!(table.foreground(), None);
        assert_eq!(table.background_jobs(), vec![pid(450)]);
        reaper.join().unwrap();
    }

    #[test]
    fn test_stopped_background_job_stays_tracked() {
        let table = JobTable::new();
        launch(&table, Role::Background, 460);
        reap(&table, vec![WaitStatus::Stopped(pid(460), Signal::SIGTTIN)]);
        assert_eq!(table.background_jobs(), vec![pid(460)]);
        assert_eq!(table.foreground(), None);

        reap(
            &table,
            vec![WaitStatus::Signaled(pid(460), Signal::SIGKILL, false)],
        );
        assert!(!table.has_background_jobs());
    }

    #[test]
    fn test_duplicate_launch_is_tracked_once() {
        let table = JobTable::new();
        launch(&table, Role::Background, 500);
        launch(&table, Role::Background, 500);
        assert_eq!(table.background_jobs(), vec![pid(500)]);
    }

    #[test]
    fn test_foreground_exit_leaves_background_untouched() {
        let table = JobTable::new();
        launch(&table, Role::Background, 600);
        launch(&table, Role::Foreground, 601);
        assert_eq!(table.foreground(), Some(pid(601)));
        assert_eq!(table.background_jobs(), vec![pid(600)]);

        reap(&table, vec![WaitStatus::Exited(pid(601), 0)]);
        assert_eq!(table.foreground(), None);
        assert_eq!(table.background_jobs(), vec![pid(600)]);
    }

    #[test]
    fn test_interrupt_without_foreground_is_a_noop() {
        let table = JobTable::new();
        launch(&table, Role::Background, 700);
        assert_eq!(table.interrupt_foreground(), None);
        assert_eq!(table.background_jobs(), vec![pid(700)]);
    }

    #[test]
    fn test_failed_spawn_records_nothing() {
        let table = JobTable::new();
        let result = table.launch(Role::Background, || {
            Err(crate::errors::ErrorKind::ExecFailed("nope".into()).into())
        });
        assert!(result.is_err());
        assert!(!table.has_background_jobs());
        assert_eq!(table.foreground(), None);
    }

    #[test]
    fn test_wait_for_foreground_returns_once_reaped() {
        let table = Arc::new(JobTable::new());
        let job = launch(&table, Role::Foreground, 800);

        let reaper = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                reap(&table, vec![WaitStatus::Exited(job, 0)]);
            })
        };

        table.wait_for_foreground(job);
        assert_eq!(table.foreground(), None);
        reaper.join().unwrap();
    }

    #[test]
    fn test_concurrent_launch_and_reap() {
        let table = Arc::new(JobTable::new());
        let reaper = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let mut remaining: Vec<i32> = (1000..1200).collect();
                while !remaining.is_empty() {
                    let batch: Vec<WaitStatus> = remaining
                        .drain(..remaining.len().min(7))
                        .map(|raw| WaitStatus::Exited(pid(raw), 0))
                        .collect();
                    reap(&table, batch);
                }
            })
        };

        for raw in 1000..1200 {
            launch(&table, Role::Background, raw);
        }
        reaper.join().unwrap();

        // exits reaped before their launch was recorded leave stale entries;
        // the launch lock makes that impossible for real children, so only
        // reap what is left once everything is launched.
        let left = table.background_jobs();
        reap(
            &table,
            left.iter().map(|&pid| WaitStatus::Exited(pid, 0)).collect(),
        );
        assert!(table.background_jobs().is_empty());
    }
}
