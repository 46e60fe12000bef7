use crate::core::tokenizer::MAX_LINE;

pub use self::shell::Shell;

pub mod builtins;
pub mod execute_command;
pub mod job_control;
mod shell;
pub mod signals;

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Determines if foreground jobs get the terminal and the shell ignores
    /// interactive signals. Only honored when stdin is a terminal.
    enable_job_control: bool,

    /// Determines if some messages (e.g. "exit") should be displayed.
    display_messages: bool,

    /// Longest command line accepted, in bytes.
    max_line_length: usize,
}

impl ShellConfig {
    /// Creates an interactive shell, e.g. job control
    ///
    /// # Complete List
    /// - Job Control is enabled
    /// - Some additional messages are displayed
    pub fn interactive() -> Self {
        Self {
            enable_job_control: true,
            display_messages: true,
            ..Default::default()
        }
    }

    /// Creates a noninteractive shell, e.g. no job control
    ///
    /// # Complete List
    /// - Job Control is disabled.
    /// - Fewer messages are displayed
    pub fn noninteractive() -> Self {
        Default::default()
    }

    pub fn with_max_line_length(self, max_line_length: usize) -> Self {
        Self {
            max_line_length,
            ..self
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            enable_job_control: false,
            display_messages: false,
            max_line_length: MAX_LINE,
        }
    }
}
