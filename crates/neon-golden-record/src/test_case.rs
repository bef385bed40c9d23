//! In-memory shape of one fixture's recorded expectation.

/// Recorded inputs and expected outputs for a single fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Whether the fixture is expected to compile.
    pub builds: bool,
    /// Arguments passed to the compiled program.
    pub argv: Vec<String>,
    /// Bytes fed to the compiled program's stdin.
    pub stdin: Vec<u8>,
    /// Expected exit code. Only checked when `builds` is true.
    ///
    /// A program terminated by a signal is recorded as the negated signal number.
    pub returncode: i32,
    /// Expected stdout.
    pub stdout: Vec<u8>,
    /// Expected stderr.
    pub stderr: Vec<u8>,
}

impl Default for TestCase {
    fn default() -> Self {
        Self {
            builds: true,
            argv: Vec::new(),
            stdin: Vec::new(),
            returncode: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }
}

impl TestCase {
    /// Replace the program inputs, keeping the recorded outputs.
    #[must_use]
    pub fn with_input(mut self, argv: Vec<String>, stdin: Vec<u8>) -> Self {
        self.argv = argv;
        self.stdin = stdin;
        self
    }

    /// Replace the recorded outcome, keeping the program inputs.
    #[must_use]
    pub fn with_outcome(
        mut self,
        builds: bool,
        returncode: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    ) -> Self {
        self.builds = builds;
        self.returncode = returncode;
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }
}
