//! Compile and run primitives shared by the engine and the recorder.
//!
//! Both steps are blocking child processes; stdout and stderr are captured in
//! full before the caller sees the result.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use serde::Serialize;

use crate::config::ORDINARY_FAILURE_CODE;
use crate::error::HarnessError;

/// Abnormal termination of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Crash {
    pub signal: i32,
}

impl Crash {
    /// Short operator-facing description (`segfault`, `aborted`, `signal N`).
    #[must_use]
    pub fn describe(self) -> String {
        match self.signal {
            libc::SIGSEGV => "segfault".to_string(),
            libc::SIGABRT => "aborted".to_string(),
            other => format!("signal {other}"),
        }
    }
}

/// How the compiler terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerVerdict {
    Success,
    /// Exit code [`ORDINARY_FAILURE_CODE`]: the compiler rejected the fixture.
    OrdinaryFailure,
    /// Any other exit code.
    UnexpectedExit(i32),
    Crashed(Crash),
}

/// Captured result of one compiler invocation.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub verdict: CompilerVerdict,
    /// Exit code, or the negated signal number on a crash.
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Captured result of running a built program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRun {
    /// Exit code, or the negated signal number if the program was killed.
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Invoke `compiler [flags..] -o output source`.
pub fn compile(
    compiler: &Path,
    flags: &[&str],
    output: &Path,
    source: &Path,
) -> Result<Compilation, HarnessError> {
    let out = Command::new(compiler)
        .args(flags)
        .arg("-o")
        .arg(output)
        .arg(source)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| HarnessError::Spawn {
            program: compiler.to_path_buf(),
            source,
        })?;

    Ok(Compilation {
        verdict: classify(out.status),
        code: exit_code(out.status),
        stdout: out.stdout,
        stderr: out.stderr,
    })
}

/// Run `program argv..` with `stdin` piped in.
pub fn run_program(
    program: &Path,
    argv: &[String],
    stdin: &[u8],
) -> Result<ProgramRun, HarnessError> {
    let spawn_err = |source| HarnessError::Spawn {
        program: PathBuf::from(program),
        source,
    };

    let mut child = Command::new(program)
        .args(argv)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    // The writer runs beside the wait so a program that fills its stdout pipe
    // before draining stdin cannot deadlock us.
    let output = std::thread::scope(|scope| {
        if let Some(mut pipe) = child.stdin.take() {
            scope.spawn(move || {
                // A program that exits without reading its input closes the pipe early.
                let _ = pipe.write_all(stdin);
            });
        }
        child.wait_with_output()
    })
    .map_err(spawn_err)?;

    Ok(ProgramRun {
        code: exit_code(output.status),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Classify a compiler exit status.
#[must_use]
pub fn classify(status: ExitStatus) -> CompilerVerdict {
    if let Some(signal) = termination_signal(status) {
        return CompilerVerdict::Crashed(Crash { signal });
    }
    match status.code() {
        Some(0) => CompilerVerdict::Success,
        Some(ORDINARY_FAILURE_CODE) => CompilerVerdict::OrdinaryFailure,
        Some(code) => CompilerVerdict::UnexpectedExit(code),
        None => CompilerVerdict::UnexpectedExit(-1),
    }
}

/// Exit code, or `-signal` for a signal-terminated process.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), termination_signal(status)) {
        (Some(code), _) => code,
        (None, Some(signal)) => -signal,
        (None, None) => -1,
    }
}

#[cfg(unix)]
fn termination_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: ExitStatus) -> Option<i32> {
    None
}
