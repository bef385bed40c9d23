//! Integration test: re-baselining records from actual behavior
//!
//! Validates that:
//! 1. Recording a building fixture stores the program's exit code and output,
//!    using the argv/stdin already on record.
//! 2. Recording a rejected fixture stores `builds = false` with the compiler's
//!    own exit code and output.
//! 3. A compiler crash writes nothing and leaves an existing record intact.
//! 4. Updating input replaces argv/stdin only.
//! 5. A freshly recorded fixture passes a subsequent run.
//! 6. An abnormal compiler exit is recorded as not building, with its code.
//! 7. A program that cannot be launched is skipped without aborting the batch.
//!
//! Run: cargo test -p neon-golden-harness --test recorder_test

#![cfg(unix)]

mod support;

use std::io::Cursor;

use neon_golden_harness::structured_log::LogEmitter;
use neon_golden_harness::{Engine, RecordOutcome, Recorder, RunStats};
use neon_golden_record::TestCase;

use support::{Captured, Workspace};

fn recorder(ws: &Workspace, console: &Captured) -> Recorder {
    Recorder::new(ws.config(), console.writer(), LogEmitter::disabled())
}

#[test]
fn records_program_output_with_existing_inputs() {
    let _guard = support::serial();
    let ws = Workspace::new();
    let fixture = ws.fixture("greet", "echo \"hello $1\"\ncat\nexit 5");
    ws.record(
        &fixture,
        &TestCase {
            argv: vec!["neon".to_string()],
            stdin: b"from stdin\n".to_vec(),
            stdout: b"stale".to_vec(),
            ..TestCase::default()
        },
    );

    let out = Captured::default();
    let outcome = recorder(&ws, &out).record_output(&fixture).unwrap();

    let saved = neon_golden_record::load(&fixture.with_extension("txt"))
        .unwrap()
        .unwrap();
    assert_eq!(
        saved,
        TestCase {
            builds: true,
            argv: vec!["neon".to_string()],
            stdin: b"from stdin\n".to_vec(),
            returncode: 5,
            stdout: b"hello neon\nfrom stdin\n".to_vec(),
            stderr: Vec::new(),
        }
    );
    assert_eq!(
        outcome,
        RecordOutcome::Saved {
            record: fixture.with_extension("txt"),
            case: saved,
        }
    );
    assert!(out.text().contains("INFO: Saving output for `greet` to "));
}

#[test]
fn records_rejection_with_compiler_output() {
    let _guard = support::serial();
    let ws = Workspace::new();
    let fixture = ws.fixture("bad", "# @reject");

    let out = Captured::default();
    recorder(&ws, &out).record_output(&fixture).unwrap();

    let saved = neon_golden_record::load(&fixture.with_extension("txt"))
        .unwrap()
        .unwrap();
    assert!(!saved.builds);
    assert_eq!(saved.returncode, 1);
    assert!(saved.stdout.is_empty());
    assert_eq!(
        saved.stderr,
        format!("error: rejected {}\n", fixture.display()).into_bytes()
    );
}

#[test]
fn crash_is_never_recorded() {
    let _guard = support::serial();
    let ws = Workspace::new();
    let fresh = ws.fixture("fresh_crash", "# @segv-all");
    let known = ws.fixture("known_crash", "# @segv-all");
    let previous = TestCase {
        stdout: b"keep me\n".to_vec(),
        ..TestCase::default()
    };
    ws.record(&known, &previous);

    let out = Captured::default();
    let log = Captured::default();
    let mut recorder = Recorder::new(ws.config(), out.writer(), log.log());

    let outcome = recorder.record_output(&fresh).unwrap();
    assert!(matches!(outcome, RecordOutcome::CompilerCrashed(c) if c.describe() == "segfault"));
    assert!(!fresh.with_extension("txt").exists());

    recorder.record_output(&known).unwrap();
    let kept = neon_golden_record::load(&known.with_extension("txt"))
        .unwrap()
        .unwrap();
    assert_eq!(kept, previous);

    assert!(
        out.text()
            .contains("WARNING: Compiler crashed on `fresh_crash` (segfault). Not saving the output.\n")
    );
    drop(recorder);
    let events = log.events();
    assert!(events.iter().all(|e| e["event"] == "record_skipped"));
    assert_eq!(events.len(), 2);
}

#[test]
fn input_update_keeps_outputs() {
    let _guard = support::serial();
    let ws = Workspace::new();
    let fixture = ws.fixture("calc", "cat");
    let before = TestCase {
        builds: true,
        argv: vec!["old".to_string()],
        stdin: b"1 + 1".to_vec(),
        returncode: 0,
        stdout: b"2\n".to_vec(),
        stderr: b"note\n".to_vec(),
    };
    ws.record(&fixture, &before);

    let out = Captured::default();
    let log = Captured::default();
    let mut recorder = Recorder::new(ws.config(), out.writer(), log.log());
    let case = recorder
        .record_input(
            &fixture,
            vec!["--verbose".to_string()],
            &mut Cursor::new(b"2 * 3\n".to_vec()),
        )
        .unwrap();

    let saved = neon_golden_record::load(&fixture.with_extension("txt"))
        .unwrap()
        .unwrap();
    assert_eq!(saved, case);
    assert_eq!(saved.argv, vec!["--verbose"]);
    assert_eq!(saved.stdin, b"2 * 3\n");
    assert_eq!(saved.stdout, before.stdout);
    assert_eq!(saved.stderr, before.stderr);
    assert!(
        out.text()
            .contains("Provide the stdin for the test case. Press ^D when you are done...")
    );

    drop(recorder);
    let events = log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "record_saved");
    assert_eq!(events[0]["details"]["source"], "record_input");
    assert_eq!(
        events[0]["details"]["sha256"].as_str().map(str::len),
        Some(64)
    );
}

#[test]
fn input_update_without_record_starts_from_defaults() {
    let _guard = support::serial();
    let ws = Workspace::new();
    let fixture = ws.fixture("new", "cat");

    let out = Captured::default();
    let case = recorder(&ws, &out)
        .record_input(&fixture, Vec::new(), &mut Cursor::new(Vec::new()))
        .unwrap();
    assert_eq!(case, TestCase::default());
    assert!(fixture.with_extension("txt").is_file());
}

#[test]
fn recorded_directory_then_passes() {
    let _guard = support::serial();
    let ws = Workspace::new();
    ws.fixture("a/one", "echo 1");
    ws.fixture("a/two", "echo 2 >&2\nexit 9");
    ws.fixture("b/rejected", "# @reject");

    let out = Captured::default();
    let outcomes = recorder(&ws, &out)
        .record_output_target(&ws.tests)
        .unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, RecordOutcome::Saved { .. }))
    );

    let mut engine = Engine::new(ws.config(), out.writer(), LogEmitter::disabled());
    let mut stats = RunStats::default();
    engine.run_target(&ws.tests, &mut stats).unwrap();
    assert_eq!(stats.passed, 3 + 3 + 1, "{}", out.text());
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.ignored, 0);
}

#[test]
fn abnormal_compiler_exit_is_recorded_as_not_building() {
    let _guard = support::serial();
    let ws = Workspace::new();
    let fixture = ws.fixture("ice", "# @exit3");

    let out = Captured::default();
    let outcome = recorder(&ws, &out).record_output(&fixture).unwrap();

    let RecordOutcome::Saved { case, .. } = &outcome else {
        panic!("expected a saved record, got {outcome:?}");
    };
    assert!(!case.builds);
    assert_eq!(case.returncode, 3);
    assert_eq!(case.stderr, b"internal error\n");
    assert_eq!(
        neon_golden_record::load(&fixture.with_extension("txt"))
            .unwrap()
            .as_ref(),
        Some(case)
    );
}

#[test]
fn unlaunchable_program_is_skipped() {
    let _guard = support::serial();
    let ws = Workspace::new();
    let ghost = ws.fixture("a_ghost", "# @no-artifact");
    let fine = ws.fixture("b_fine", "echo fine");

    let out = Captured::default();
    let log = Captured::default();
    let mut recorder = Recorder::new(ws.config(), out.writer(), log.log());
    let outcomes = recorder.record_output_target(&ws.tests).unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], RecordOutcome::ProgramDidNotRun(_)));
    assert!(matches!(outcomes[1], RecordOutcome::Saved { .. }));
    assert!(!ghost.with_extension("txt").exists());
    assert!(fine.with_extension("txt").is_file());
    assert!(
        out.text()
            .contains("WARNING: Could not run `a_ghost`: "),
        "{}",
        out.text()
    );

    drop(recorder);
    let events = log.events();
    assert_eq!(events[0]["event"], "record_skipped");
    assert_eq!(events[0]["details"]["reason"], "program_did_not_run");
}
