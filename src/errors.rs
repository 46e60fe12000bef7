//! Error module. See the [error-chain](https://crates.io/crates/error-chain) crate for details.

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Nix(::nix::Error);
        Docopt(::docopt::Error);
    }

    errors {
        /// Command line exceeds the configured maximum length
        LineTooLong(len: usize, max: usize) {
            description("command line too long")
            display("command line too long ({} bytes, maximum is {})", len, max)
        }
        /// Command line is not valid UTF-8
        InvalidInput {
            description("invalid input")
            display("input is not valid UTF-8")
        }
        /// Redirection operator without a file name after it
        MissingRedirectTarget(operator: String) {
            description("missing redirection target")
            display("{}: missing file name", operator)
        }
        /// Nothing left to run once the redirection is stripped
        MissingCommand {
            description("missing command")
            display("missing command before redirection")
        }
        /// Redirection target could not be opened
        Redirection(path: String) {
            description("redirection failed")
            display("{}: cannot open for redirection", path)
        }
        /// Command name does not resolve to an executable file
        CommandNotExecutable(command: String) {
            description("command not executable")
            display("{}: command not executable", command)
        }
        /// Fork failed, e.g. the process table is full
        ProcessCreation(command: String) {
            description("process creation failed")
            display("{}: failed to create process", command)
        }
        /// The child was created but the executable could not be started
        ExecFailed(command: String) {
            description("exec failed")
            display("{}: failed to execute", command)
        }
        /// Builtin invoked with the wrong arguments
        BuiltinUsage(name: String) {
            description("wrong builtin usage")
            display("Wrong usage of {}", name)
        }
        /// Builtin failed with a message and an exit code
        BuiltinCommand(message: String, code: i32) {
            description("builtin command failed")
            display("{}", message)
        }
    }
}

impl Error {
    /// Returns `true` if the interpreter cannot continue after this error.
    ///
    /// Only process creation failures and failures to read standard input are
    /// fatal; every other error is confined to the command line that caused it.
    pub fn is_fatal(&self) -> bool {
        match *self.kind() {
            ErrorKind::ProcessCreation(_) | ErrorKind::Io(_) => true,
            _ => false,
        }
    }

    /// Formats the error and its causes on one line.
    pub fn display_chain_inline(&self) -> String {
        self.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ")
    }

    pub(crate) fn builtin_usage<T: AsRef<str>>(name: T) -> Error {
        ErrorKind::BuiltinUsage(name.as_ref().to_string()).into()
    }

    pub(crate) fn builtin_command<T: AsRef<str>>(message: T, code: i32) -> Error {
        ErrorKind::BuiltinCommand(message.as_ref().to_string(), code).into()
    }

    pub(crate) fn command_not_executable<T: AsRef<str>>(command: T) -> Error {
        ErrorKind::CommandNotExecutable(command.as_ref().to_string()).into()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn only_creation_and_read_failures_are_fatal() {
        assert!(Error::from(ErrorKind::ProcessCreation("ls".into())).is_fatal());
        assert!(Error::from(io::Error::new(io::ErrorKind::Other, "read")).is_fatal());

        assert!(!Error::command_not_executable("nope").is_fatal());
        assert!(!Error::from(ErrorKind::LineTooLong(81, 80)).is_fatal());
        assert!(!Error::from(ErrorKind::MissingRedirectTarget(">".into())).is_fatal());
        assert!(!Error::from(ErrorKind::ExecFailed("ls".into())).is_fatal());
        assert!(!Error::builtin_usage("search").is_fatal());
    }

    #[test]
    fn chained_causes_are_joined() {
        let cause = io::Error::new(io::ErrorKind::NotFound, "No such file or directory");
        let error = Error::with_chain(cause, ErrorKind::Redirection("in.txt".into()));
        assert_eq!(
            error.display_chain_inline(),
            "in.txt: cannot open for redirection: No such file or directory"
        );
    }
}
