//! Shared fixtures for harness integration tests.
//!
//! The fake compiler is a shell script. It copies the fixture source to the
//! `-o` path and marks it executable, so fixtures are themselves shell
//! programs. Markers inside a fixture change what the compiler does:
//!
//! - `@reject`: print a diagnostic and exit 1
//! - `@exit3`: exit 3
//! - `@segv-all`: die with SIGSEGV
//! - `@segv-opt`: die with SIGSEGV only when `-O` is passed
//! - `@abrt`: die with SIGABRT
//! - `@no-artifact`: exit 0 without writing the output

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};

use neon_golden_harness::config::Palette;
use neon_golden_harness::structured_log::LogEmitter;
use neon_golden_harness::HarnessConfig;
use neon_golden_record::TestCase;

/// Scripts written in one thread must not be held open by a child forked in
/// another thread when they are executed, so process-spawning tests run serially.
static TEST_LOCK: Mutex<()> = Mutex::new(());

const FAKE_COMPILER: &str = r#"#!/bin/sh
out=""
src=""
opt=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -O) opt=1; shift ;;
    -g) shift ;;
    *) src="$1"; shift ;;
  esac
done
if grep -q '@segv-all' "$src"; then
  kill -SEGV $$
fi
if [ -n "$opt" ] && grep -q '@segv-opt' "$src"; then
  kill -SEGV $$
fi
if grep -q '@abrt' "$src"; then
  kill -ABRT $$
fi
if grep -q '@reject' "$src"; then
  echo "error: rejected $src" >&2
  exit 1
fi
if grep -q '@exit3' "$src"; then
  echo "internal error" >&2
  exit 3
fi
if grep -q '@no-artifact' "$src"; then
  exit 0
fi
cp "$src" "$out" && chmod +x "$out"
"#;

pub fn serial() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A scratch project: fixture tree, output tree, and the fake compiler.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub tests: PathBuf,
    pub output: PathBuf,
    pub compiler: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tests = dir.path().join("tests");
        let output = dir.path().join("tests_build");
        std::fs::create_dir_all(&tests).unwrap();

        let compiler = dir.path().join("fake-neon");
        std::fs::write(&compiler, FAKE_COMPILER).unwrap();
        std::fs::set_permissions(&compiler, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            dir,
            tests,
            output,
            compiler,
        }
    }

    /// Write `tests/<rel>.ne` containing a shell program.
    pub fn fixture(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.tests.join(format!("{rel}.ne"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        path
    }

    pub fn record(&self, fixture: &Path, case: &TestCase) {
        neon_golden_record::save(&fixture.with_extension("txt"), case).unwrap();
    }

    pub fn config(&self) -> HarnessConfig {
        HarnessConfig::new(&self.compiler, &self.tests, &self.output).with_palette(Palette::plain())
    }
}

/// In-memory sink shared between the writer under test and the assertions.
#[derive(Clone, Default)]
pub struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn writer(&self) -> Box<dyn Write> {
        Box::new(self.clone())
    }

    pub fn log(&self) -> LogEmitter {
        LogEmitter::to_writer(Box::new(self.clone()), "it")
    }

    /// Parse captured JSONL.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.text()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
