//! Re-baselining: capture what the toolchain actually does into records.
//!
//! This is the only path that writes records. A compiler crash is never
//! recorded as expected behavior.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use neon_golden_record::TestCase;

use crate::config::{FixtureLayout, HarnessConfig};
use crate::console::{Console, Tag};
use crate::error::HarnessError;
use crate::process::{self, CompilerVerdict, Crash};
use crate::structured_log::{LogEmitter, LogLevel};
use crate::walk;

/// What [`Recorder::record_output`] did for one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Saved { record: PathBuf, case: TestCase },
    /// Nothing was written.
    CompilerCrashed(Crash),
    /// The build succeeded but its artifact could not be launched. Nothing
    /// was written.
    ProgramDidNotRun(String),
}

pub struct Recorder {
    config: HarnessConfig,
    console: Console,
    log: LogEmitter,
}

impl Recorder {
    #[must_use]
    pub fn new(config: HarnessConfig, out: Box<dyn Write>, log: LogEmitter) -> Self {
        Self {
            console: Console::to_writer(out, config.palette),
            config,
            log,
        }
    }

    /// Record outputs for a single fixture or every fixture under a directory.
    pub fn record_output_target(
        &mut self,
        target: &Path,
    ) -> Result<Vec<RecordOutcome>, HarnessError> {
        let outcomes = if target.is_dir() {
            walk::collect_fixtures(target, &self.config.fixture_extension)?
                .iter()
                .map(|fixture| self.record_output(fixture))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![self.record_output(target)?]
        };
        self.log.flush().map_err(HarnessError::Log)?;
        Ok(outcomes)
    }

    /// Compile the fixture and record what happened.
    ///
    /// On a successful build the program is run with the recorded argv/stdin
    /// and its exit code and output become the expectation. On an ordinary
    /// build failure the compiler's own exit code and output are stored with
    /// `builds = false`. On a crash, or when the built program cannot be
    /// launched, nothing is written and the batch moves on.
    pub fn record_output(&mut self, fixture: &Path) -> Result<RecordOutcome, HarnessError> {
        let layout = self.config.layout(fixture)?;
        let existing = self.load_or_default(&layout)?;
        layout.prepare_output()?;

        let compilation = process::compile(
            &self.config.compiler,
            &[],
            &layout.artifact,
            &layout.source,
        )?;

        let case = match compilation.verdict {
            CompilerVerdict::Crashed(crash) => {
                self.console.line(
                    Tag::Warning,
                    format_args!(
                        "Compiler crashed on {} ({}). Not saving the output.",
                        layout.label,
                        crash.describe()
                    ),
                );
                let entry = self
                    .log
                    .entry(LogLevel::Warn, "record_skipped")
                    .with_fixture(&layout.label)
                    .with_exit_code(compilation.code)
                    .with_details(serde_json::json!({
                        "reason": "compiler_crash",
                        "crash": crash.describe(),
                    }));
                self.log.emit_entry(entry).map_err(HarnessError::Log)?;
                return Ok(RecordOutcome::CompilerCrashed(crash));
            }
            CompilerVerdict::Success => {
                match process::run_program(&layout.artifact, &existing.argv, &existing.stdin) {
                    Ok(run) => existing.with_outcome(true, run.code, run.stdout, run.stderr),
                    Err(err) => {
                        let reason = err.to_string();
                        self.console.line(
                            Tag::Warning,
                            format_args!(
                                "Could not run {}: {reason}. Not saving the output.",
                                layout.label
                            ),
                        );
                        let entry = self
                            .log
                            .entry(LogLevel::Warn, "record_skipped")
                            .with_fixture(&layout.label)
                            .with_details(serde_json::json!({
                                "reason": "program_did_not_run",
                                "error": reason,
                            }));
                        self.log.emit_entry(entry).map_err(HarnessError::Log)?;
                        return Ok(RecordOutcome::ProgramDidNotRun(reason));
                    }
                }
            }
            CompilerVerdict::OrdinaryFailure | CompilerVerdict::UnexpectedExit(_) => existing
                .with_outcome(
                    false,
                    compilation.code,
                    compilation.stdout,
                    compilation.stderr,
                ),
        };

        self.console.line(
            Tag::Info,
            format_args!(
                "Saving output for {} to {}",
                layout.label,
                layout.record.display()
            ),
        );
        self.save(&layout, &case, "record_output")?;
        Ok(RecordOutcome::Saved {
            record: layout.record,
            case,
        })
    }

    /// Replace the program inputs of a record, leaving its outputs untouched.
    ///
    /// `input` is read to end of stream and becomes the recorded stdin.
    pub fn record_input(
        &mut self,
        fixture: &Path,
        argv: Vec<String>,
        input: &mut dyn Read,
    ) -> Result<TestCase, HarnessError> {
        let layout = self.config.layout(fixture)?;
        let existing = self.load_or_default(&layout)?;

        self.console.line(
            Tag::Info,
            format_args!("Provide the stdin for the test case. Press ^D when you are done..."),
        );
        let mut stdin = Vec::new();
        input
            .read_to_end(&mut stdin)
            .map_err(|e| HarnessError::io("<stdin>", e))?;

        self.console.line(
            Tag::Info,
            format_args!("Saving input to {}", layout.record.display()),
        );
        let case = existing.with_input(argv, stdin);
        self.save(&layout, &case, "record_input")?;
        self.log.flush().map_err(HarnessError::Log)?;
        Ok(case)
    }

    fn load_or_default(&self, layout: &FixtureLayout) -> Result<TestCase, HarnessError> {
        Ok(neon_golden_record::load(&layout.record)
            .map_err(|e| HarnessError::record(&layout.record, e))?
            .unwrap_or_default())
    }

    fn save(
        &mut self,
        layout: &FixtureLayout,
        case: &TestCase,
        source: &str,
    ) -> Result<(), HarnessError> {
        neon_golden_record::save(&layout.record, case)
            .map_err(|e| HarnessError::record(&layout.record, e))?;

        let bytes = case.to_bytes();
        let entry = self
            .log
            .entry(LogLevel::Info, "record_saved")
            .with_fixture(&layout.label)
            .with_exit_code(case.returncode)
            .with_artifacts(vec![layout.record.display().to_string()])
            .with_details(serde_json::json!({
                "source": source,
                "builds": case.builds,
                "argc": case.argv.len(),
                "bytes": bytes.len(),
                "sha256": sha256_hex(&bytes),
            }));
        self.log.emit_entry(entry).map_err(HarnessError::Log)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::Digest;
    use std::fmt::Write;
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
