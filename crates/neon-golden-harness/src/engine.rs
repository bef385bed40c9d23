//! Test execution engine.
//!
//! Resolves each fixture to pass, fail, or ignored:
//!
//! - no record: ignored, but the compiler is still run once to make sure it
//!   does not crash;
//! - `builds == false`: the compiler must reject the fixture with the ordinary
//!   failure code;
//! - `builds == true`: every configured build mode must compile, and the
//!   program's exit code, stdout, and stderr must match the record exactly.
//!
//! A compiler killed by a signal is always a failure and is labeled as a crash.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use neon_golden_record::TestCase;

use crate::config::{BuildMode, FixtureLayout, HarnessConfig};
use crate::console::{Console, Tag};
use crate::diff;
use crate::error::HarnessError;
use crate::process::{self, Compilation, CompilerVerdict, Crash, ProgramRun};
use crate::stats::RunStats;
use crate::structured_log::{LogEmitter, LogLevel, Outcome};
use crate::walk;

/// A recorded program output that disagrees with what the program did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    ReturnCode { expected: i32, actual: i32 },
    Stdout { expected: Vec<u8>, actual: Vec<u8> },
    Stderr { expected: Vec<u8>, actual: Vec<u8> },
}

impl Mismatch {
    #[must_use]
    pub fn stream(&self) -> &'static str {
        match self {
            Self::ReturnCode { .. } => "return code",
            Self::Stdout { .. } => "stdout",
            Self::Stderr { .. } => "stderr",
        }
    }
}

/// Why a fixture (or one build mode of it) failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The compiler was terminated by a signal.
    CompilerCrash(Crash),
    /// The compiler exited with a code that is neither success nor the
    /// ordinary failure code, where a rejection was expected or tolerated.
    AbnormalExit(i32),
    /// The build succeeded or failed contrary to the record.
    BuildMismatch { expected_build: bool, exit_code: i32 },
    OutputMismatch(Mismatch),
    /// The compiler reported success but its artifact could not be run.
    ProgramDidNotRun(String),
}

impl Failure {
    /// Stable machine-readable kind for logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CompilerCrash(_) => "compiler_crash",
            Self::AbnormalExit(_) => "abnormal_exit",
            Self::BuildMismatch { .. } => "build_mismatch",
            Self::OutputMismatch(_) => "output_mismatch",
            Self::ProgramDidNotRun(_) => "program_did_not_run",
        }
    }

    /// Parenthesized detail appended to the fixture label.
    fn label_detail(&self) -> Option<String> {
        match self {
            Self::CompilerCrash(crash) => Some(format!("compiler crash, {}", crash.describe())),
            Self::AbnormalExit(code) => Some(format!("abnormal compiler exit, code {code}")),
            Self::BuildMismatch {
                expected_build: true,
                ..
            } => None,
            Self::BuildMismatch {
                expected_build: false,
                ..
            } => Some("expected build fail".to_string()),
            Self::OutputMismatch(mismatch) => Some(mismatch.stream().to_string()),
            Self::ProgramDidNotRun(_) => Some("program did not run".to_string()),
        }
    }

    /// Label recorded in [`RunStats::failed_files`].
    #[must_use]
    pub fn label(&self, fixture: &str, mode: Option<BuildMode>) -> String {
        let parts: Vec<String> = mode
            .map(|m| m.label().to_string())
            .into_iter()
            .chain(self.label_detail())
            .collect();
        if parts.is_empty() {
            fixture.to_string()
        } else {
            format!("{fixture} ({})", parts.join(", "))
        }
    }
}

/// Classification of one fixture evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Failure),
    /// No record on file. Carries the smoke-test failure, if the compiler
    /// misbehaved.
    Ignored(Option<Failure>),
}

impl Verdict {
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Pass => None,
            Self::Fail(failure) => Some(failure),
            Self::Ignored(failure) => failure.as_ref(),
        }
    }
}

/// Result of one configuration of one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeResult {
    /// `None` for single-shot evaluations (smoke test, expected build failure).
    pub mode: Option<BuildMode>,
    pub verdict: Verdict,
}

/// Compare a program run with its record. The first disagreement wins, checked
/// in order: return code, stdout, stderr.
#[must_use]
pub fn compare_run(case: &TestCase, run: &ProgramRun) -> Option<Mismatch> {
    if run.code != case.returncode {
        return Some(Mismatch::ReturnCode {
            expected: case.returncode,
            actual: run.code,
        });
    }
    if run.stdout != case.stdout {
        return Some(Mismatch::Stdout {
            expected: case.stdout.clone(),
            actual: run.stdout.clone(),
        });
    }
    if run.stderr != case.stderr {
        return Some(Mismatch::Stderr {
            expected: case.stderr.clone(),
            actual: run.stderr.clone(),
        });
    }
    None
}

/// Drives compile+run cycles and classifies fixtures.
pub struct Engine {
    config: HarnessConfig,
    console: Console,
    log: LogEmitter,
}

impl Engine {
    /// Console output goes to `out`, colored with `config.palette`.
    #[must_use]
    pub fn new(config: HarnessConfig, out: Box<dyn Write>, log: LogEmitter) -> Self {
        Self {
            console: Console::to_writer(out, config.palette),
            config,
            log,
        }
    }

    /// Run a single fixture file or every fixture under a directory.
    pub fn run_target(&mut self, target: &Path, stats: &mut RunStats) -> Result<(), HarnessError> {
        if target.is_dir() {
            for fixture in walk::collect_fixtures(target, &self.config.fixture_extension)? {
                self.run_fixture(&fixture, stats)?;
            }
        } else {
            self.run_fixture(target, stats)?;
        }
        Ok(())
    }

    /// Print the batch summary and close out the structured log.
    pub fn summarize(&mut self, stats: &RunStats) -> Result<(), HarnessError> {
        self.console.summary(stats);
        let level = if stats.all_passed() {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        let entry = self
            .log
            .entry(level, "batch_summary")
            .with_outcome(if stats.all_passed() {
                Outcome::Pass
            } else {
                Outcome::Fail
            })
            .with_details(serde_json::json!({
                "passed": stats.passed,
                "failed": stats.failed,
                "ignored": stats.ignored,
            }));
        self.log.emit_entry(entry).map_err(HarnessError::Log)?;
        self.log.flush().map_err(HarnessError::Log)
    }

    /// Evaluate one fixture, updating `stats` once per result.
    ///
    /// A malformed record is fatal; every other problem is a counted failure.
    pub fn run_fixture(
        &mut self,
        fixture: &Path,
        stats: &mut RunStats,
    ) -> Result<Vec<ModeResult>, HarnessError> {
        let layout = self.config.layout(fixture)?;
        let case = neon_golden_record::load(&layout.record)
            .map_err(|e| HarnessError::record(&layout.record, e))?;

        // A fixture expected to fail may still leave an artifact behind.
        layout.prepare_output()?;

        let entry = self
            .log
            .entry(LogLevel::Debug, "fixture_start")
            .with_fixture(&layout.label)
            .with_details(serde_json::json!({
                "record": layout.record.display().to_string(),
                "has_record": case.is_some(),
            }));
        self.log.emit_entry(entry).map_err(HarnessError::Log)?;

        match case {
            None => Ok(vec![self.smoke_test(&layout, stats)?]),
            Some(case) if !case.builds => Ok(vec![self.expect_build_failure(&layout, stats)?]),
            Some(case) => {
                let modes = self.config.modes.clone();
                modes
                    .into_iter()
                    .map(|mode| self.run_mode(&layout, &case, mode, stats))
                    .collect()
            }
        }
    }

    fn smoke_test(
        &mut self,
        layout: &FixtureLayout,
        stats: &mut RunStats,
    ) -> Result<ModeResult, HarnessError> {
        self.console.begin(
            Tag::Warning,
            format_args!(
                "Could not find test case data for {}. Only making sure the compiler doesn't crash: ",
                layout.label
            ),
        );
        let started = Instant::now();
        let compilation = self.compile(layout, &[])?;

        let failure = match compilation.verdict {
            CompilerVerdict::Success | CompilerVerdict::OrdinaryFailure => {
                self.console.verdict(Tag::DidntCrash);
                None
            }
            CompilerVerdict::Crashed(crash) => {
                self.console.verdict(Tag::CompilerCrash);
                Some(Failure::CompilerCrash(crash))
            }
            CompilerVerdict::UnexpectedExit(code) => {
                self.console.verdict(Tag::Failure);
                self.compiler_output(&compilation);
                Some(Failure::AbnormalExit(code))
            }
        };

        stats.record_ignored(&layout.label);
        if let Some(failure) = &failure {
            stats.record_failure(failure.label(&layout.label, None));
        }
        let verdict = Verdict::Ignored(failure);
        self.log_result(layout, None, &verdict, compilation.code, started)?;
        Ok(ModeResult {
            mode: None,
            verdict,
        })
    }

    fn expect_build_failure(
        &mut self,
        layout: &FixtureLayout,
        stats: &mut RunStats,
    ) -> Result<ModeResult, HarnessError> {
        self.console.begin(
            Tag::Info,
            format_args!("Testing {} expected build fail: ", layout.label),
        );
        let started = Instant::now();
        let compilation = self.compile(layout, &[])?;

        let verdict = match compilation.verdict {
            CompilerVerdict::OrdinaryFailure => {
                self.console.verdict(Tag::Pass);
                Verdict::Pass
            }
            CompilerVerdict::Success => {
                self.console.verdict(Tag::Failure);
                self.console.line(
                    Tag::Error,
                    format_args!("Compiler accepted a fixture recorded as not building"),
                );
                Verdict::Fail(Failure::BuildMismatch {
                    expected_build: false,
                    exit_code: compilation.code,
                })
            }
            CompilerVerdict::Crashed(crash) => {
                self.console.verdict(Tag::CompilerCrash);
                Verdict::Fail(Failure::CompilerCrash(crash))
            }
            CompilerVerdict::UnexpectedExit(code) => {
                self.console.verdict(Tag::Failure);
                self.compiler_output(&compilation);
                Verdict::Fail(Failure::AbnormalExit(code))
            }
        };

        self.settle(layout, None, verdict, compilation.code, started, stats)
    }

    fn run_mode(
        &mut self,
        layout: &FixtureLayout,
        case: &TestCase,
        mode: BuildMode,
        stats: &mut RunStats,
    ) -> Result<ModeResult, HarnessError> {
        self.console.begin(
            Tag::Info,
            format_args!("Testing {} ({}): ", layout.label, mode.label()),
        );
        let started = Instant::now();
        let compilation = self.compile(layout, mode.flags())?;

        let (verdict, exit_code) = match compilation.verdict {
            CompilerVerdict::Crashed(crash) => {
                self.console.verdict(Tag::CompilerCrash);
                (
                    Verdict::Fail(Failure::CompilerCrash(crash)),
                    compilation.code,
                )
            }
            CompilerVerdict::OrdinaryFailure | CompilerVerdict::UnexpectedExit(_) => {
                self.console.verdict(Tag::DoesntBuild);
                self.compiler_output(&compilation);
                (
                    Verdict::Fail(Failure::BuildMismatch {
                        expected_build: true,
                        exit_code: compilation.code,
                    }),
                    compilation.code,
                )
            }
            CompilerVerdict::Success => {
                match process::run_program(&layout.artifact, &case.argv, &case.stdin) {
                    Err(err) => {
                        self.console.verdict(Tag::Failure);
                        self.console
                            .line(Tag::Error, format_args!("Could not run program: {err}"));
                        (
                            Verdict::Fail(Failure::ProgramDidNotRun(err.to_string())),
                            compilation.code,
                        )
                    }
                    Ok(run) => match compare_run(case, &run) {
                        None => {
                            self.console.verdict(Tag::Pass);
                            (Verdict::Pass, run.code)
                        }
                        Some(mismatch) => {
                            self.console.verdict(Tag::Failure);
                            self.report_mismatch(&mismatch);
                            (
                                Verdict::Fail(Failure::OutputMismatch(mismatch)),
                                run.code,
                            )
                        }
                    },
                }
            }
        };

        self.settle(layout, Some(mode), verdict, exit_code, started, stats)
    }

    fn compile(
        &self,
        layout: &FixtureLayout,
        flags: &[&str],
    ) -> Result<Compilation, HarnessError> {
        process::compile(&self.config.compiler, flags, &layout.artifact, &layout.source)
    }

    /// Count a pass/fail verdict and log it.
    fn settle(
        &mut self,
        layout: &FixtureLayout,
        mode: Option<BuildMode>,
        verdict: Verdict,
        exit_code: i32,
        started: Instant,
        stats: &mut RunStats,
    ) -> Result<ModeResult, HarnessError> {
        match &verdict {
            Verdict::Pass => stats.record_pass(),
            Verdict::Fail(failure) => stats.record_failure(failure.label(&layout.label, mode)),
            Verdict::Ignored(_) => stats.record_ignored(&layout.label),
        }
        self.log_result(layout, mode, &verdict, exit_code, started)?;
        Ok(ModeResult { mode, verdict })
    }

    fn log_result(
        &mut self,
        layout: &FixtureLayout,
        mode: Option<BuildMode>,
        verdict: &Verdict,
        exit_code: i32,
        started: Instant,
    ) -> Result<(), HarnessError> {
        let (level, outcome, event) = match verdict {
            Verdict::Pass => (LogLevel::Info, Outcome::Pass, "mode_result"),
            Verdict::Fail(_) => (LogLevel::Error, Outcome::Fail, "mode_result"),
            Verdict::Ignored(None) => (LogLevel::Warn, Outcome::Skip, "fixture_ignored"),
            Verdict::Ignored(Some(_)) => (LogLevel::Error, Outcome::Skip, "fixture_ignored"),
        };
        let mut entry = self
            .log
            .entry(level, event)
            .with_fixture(&layout.label)
            .with_outcome(outcome)
            .with_exit_code(exit_code)
            .with_duration_ms(started.elapsed().as_millis() as u64)
            .with_artifacts(vec![layout.artifact.display().to_string()]);
        if let Some(mode) = mode {
            entry = entry.with_mode(mode.label());
        }
        if let Some(failure) = verdict.failure() {
            entry = entry.with_details(serde_json::json!({
                "failure": failure.kind(),
                "label": failure.label(&layout.label, mode),
            }));
        }
        self.log.emit_entry(entry).map_err(HarnessError::Log)
    }

    fn report_mismatch(&mut self, mismatch: &Mismatch) {
        self.console.line(
            Tag::Error,
            format_args!("Unexpected {}:", mismatch.stream()),
        );
        match mismatch {
            Mismatch::ReturnCode { expected, actual } => {
                self.console.detail(format_args!("Expected: {expected}"));
                self.console.detail(format_args!("Actual: {actual}"));
            }
            Mismatch::Stdout { expected, actual } | Mismatch::Stderr { expected, actual } => {
                self.console
                    .detail(format_args!("Expected: {}", diff::render_bytes(expected)));
                self.console
                    .detail(format_args!("Actual: {}", diff::render_bytes(actual)));
                if let Some(text_diff) = diff::render_stream_diff(expected, actual) {
                    for line in text_diff.lines() {
                        self.console.detail(format_args!("{line}"));
                    }
                }
            }
        }
    }

    fn compiler_output(&mut self, compilation: &Compilation) {
        self.console.detail(format_args!("Compiler exit code: {}", compilation.code));
        if !compilation.stderr.is_empty() {
            self.console.detail(format_args!(
                "Compiler stderr: {}",
                diff::render_bytes(&compilation.stderr)
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(stdout: &[u8]) -> TestCase {
        TestCase {
            stdout: stdout.to_vec(),
            ..TestCase::default()
        }
    }

    fn run(code: i32, stdout: &[u8], stderr: &[u8]) -> ProgramRun {
        ProgramRun {
            code,
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
        }
    }

    #[test]
    fn exact_match_has_no_mismatch() {
        assert_eq!(compare_run(&recorded(b"42\n"), &run(0, b"42\n", b"")), None);
    }

    #[test]
    fn return_code_is_checked_first() {
        let mismatch = compare_run(&recorded(b"42\n"), &run(3, b"43\n", b"x")).unwrap();
        assert_eq!(
            mismatch,
            Mismatch::ReturnCode {
                expected: 0,
                actual: 3
            }
        );
    }

    #[test]
    fn single_byte_changes_flip_the_result() {
        let case = TestCase {
            returncode: 5,
            stdout: b"abc\n".to_vec(),
            stderr: b"warn\n".to_vec(),
            ..TestCase::default()
        };
        assert!(compare_run(&case, &run(5, b"abc\n", b"warn\n")).is_none());
        assert_eq!(
            compare_run(&case, &run(5, b"abd\n", b"warn\n")).map(|m| m.stream()),
            Some("stdout")
        );
        assert_eq!(
            compare_run(&case, &run(5, b"abc\n", b"warm\n")).map(|m| m.stream()),
            Some("stderr")
        );
        assert_eq!(
            compare_run(&case, &run(4, b"abc\n", b"warn\n")).map(|m| m.stream()),
            Some("return code")
        );
        assert_eq!(
            compare_run(&case, &run(5, b"abc", b"warn\n")).map(|m| m.stream()),
            Some("stdout")
        );
    }

    #[test]
    fn failure_labels() {
        let crash = Failure::CompilerCrash(Crash {
            signal: libc::SIGSEGV,
        });
        assert_eq!(
            crash.label("`a`", Some(BuildMode::Optimized)),
            "`a` (optimized, compiler crash, segfault)"
        );
        assert_eq!(crash.label("`a`", None), "`a` (compiler crash, segfault)");

        let no_build = Failure::BuildMismatch {
            expected_build: true,
            exit_code: 1,
        };
        assert_eq!(
            no_build.label("`a`", Some(BuildMode::NonOptimized)),
            "`a` (non-optimized)"
        );

        let accepted = Failure::BuildMismatch {
            expected_build: false,
            exit_code: 0,
        };
        assert_eq!(accepted.label("`a`", None), "`a` (expected build fail)");

        let stdout = Failure::OutputMismatch(Mismatch::Stdout {
            expected: Vec::new(),
            actual: Vec::new(),
        });
        assert_eq!(
            stdout.label("`a`", Some(BuildMode::DebugSymbols)),
            "`a` (with debug symbols, stdout)"
        );
        assert_eq!(
            Failure::AbnormalExit(2).label("`a`", None),
            "`a` (abnormal compiler exit, code 2)"
        );
    }

    #[test]
    fn verdict_accessors() {
        assert!(Verdict::Pass.is_pass());
        assert!(Verdict::Pass.failure().is_none());
        assert!(Verdict::Ignored(None).failure().is_none());
        let crash = Failure::CompilerCrash(Crash {
            signal: libc::SIGABRT,
        });
        assert_eq!(
            Verdict::Ignored(Some(crash.clone())).failure(),
            Some(&crash)
        );
        assert_eq!(crash.kind(), "compiler_crash");
    }
}
