use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use tempdir::TempDir;

/// WorkDir represents a directory in which a shell session is run.
///
/// The session's stdout and stderr are written to files outside of the
/// directory, so background jobs that outlive the shell never keep a test
/// waiting on a pipe.
#[derive(Debug)]
pub struct WorkDir {
    /// The directory in which the shell runs.
    dir: TempDir,
    /// Log file and captured output of the shell.
    output: TempDir,
}

/// What a finished shell session left behind.
#[derive(Debug)]
pub struct Session {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl WorkDir {
    pub fn new(name: &str) -> WorkDir {
        WorkDir {
            dir: TempDir::new(name).expect("work directory"),
            output: TempDir::new(&format!("{}-output", name)).expect("output directory"),
        }
    }

    /// Creates a file in the work directory.
    pub fn create(&self, name: &str, contents: &str) {
        fs::write(self.dir.path().join(name), contents).expect("create file");
    }

    /// Creates a file in the work directory that its owner may execute.
    pub fn create_executable(&self, name: &str, contents: &str) {
        self.create(name, contents);
        let path = self.dir.path().join(name);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("set permissions");
    }

    /// Reads a file from the work directory.
    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).expect("read file")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Builds a command running the shell in this directory.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(self.bin());
        cmd.current_dir(self.dir.path());
        cmd.arg(format!("--log={}", self.output.path().join("myshell.log").display()));
        cmd.arg("--log-level=debug");
        cmd.stdin(Stdio::piped());
        cmd.stdout(self.output_file("stdout.txt"));
        cmd.stderr(self.output_file("stderr.txt"));
        cmd
    }

    /// Starts a shell whose stdin is a pipe.
    pub fn spawn(&self) -> Child {
        self.command().spawn().expect("spawn myshell")
    }

    /// Feeds `input` to a new shell, closes its stdin and waits for it.
    pub fn run(&self, input: &str) -> Session {
        let mut child = self.spawn();
        write_input(&mut child, input);
        drop(child.stdin.take());
        self.finish(child)
    }

    /// Waits for the shell and collects its output.
    pub fn finish(&self, mut child: Child) -> Session {
        let status = child.wait().expect("wait for myshell");
        Session {
            status,
            stdout: self.read_output("stdout.txt"),
            stderr: self.read_output("stderr.txt"),
        }
    }

    fn bin(&self) -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_myshell"))
    }

    fn output_file(&self, name: &str) -> File {
        File::create(self.output.path().join(name)).expect("create output file")
    }

    fn read_output(&self, name: &str) -> String {
        fs::read_to_string(self.output.path().join(name)).expect("read output file")
    }
}

/// Writes to a running shell's stdin.
pub fn write_input(child: &mut Child, input: &str) {
    child
        .stdin
        .as_mut()
        .expect("piped stdin")
        .write_all(input.as_bytes())
        .expect("write to myshell");
}
