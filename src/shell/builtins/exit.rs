use crate::shell::builtins::{self, prelude::*};
use crate::util;

pub struct Exit;

const BACKGROUND_JOBS_MESSAGE: &str =
    "There are background processes running. Please terminate them first.";
const NUMERIC_ARGUMENT_REQUIRED_STATUS: i32 = 2;

impl builtins::BuiltinCommand for Exit {
    const NAME: &'static str = builtins::EXIT_NAME;

    const HELP: &'static str = "\
exit: exit [n]
    Exit the shell with a status of N. If N is omitted, the exit status
    is 0. The shell refuses to exit while background jobs are running.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        if args.len() > 1 {
            return Err(Error::builtin_command("exit: too many arguments", 1));
        }

        if shell.has_background_jobs() {
            info!("exit refused, background jobs: {:?}", shell.jobs().background_jobs());
            writeln!(stdout, "{}", BACKGROUND_JOBS_MESSAGE)?;
            return Ok(());
        }

        let status_code = args
            .get(0)
            .map(|arg| {
                arg.as_ref()
                    .parse::<i32>()
                    .map(util::fold_exit_code)
                    .unwrap_or_else(|_| {
                        eprintln!("myshell: exit: {}: numeric argument required", arg.as_ref());
                        NUMERIC_ARGUMENT_REQUIRED_STATUS
                    })
            })
            .map(ExitStatus::from_status);
        shell.exit(status_code);
    }
}
