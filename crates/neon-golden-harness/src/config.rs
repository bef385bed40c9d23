//! Harness configuration.
//!
//! Everything the engine and recorder need to locate the compiler, fixtures,
//! records, and build artifacts is carried in [`HarnessConfig`] and passed in
//! at construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

pub const DEFAULT_COMPILER: &str = "./build/Neon";
pub const DEFAULT_TARGET: &str = "./tests/";
pub const DEFAULT_OUTPUT: &str = "./tests_build/";
pub const FIXTURE_EXTENSION: &str = "ne";
pub const RECORD_EXTENSION: &str = "txt";

/// Exit code the compiler uses for an ordinary, non-crash rejection.
pub const ORDINARY_FAILURE_CODE: i32 = 1;

/// Compiler configuration a fixture is built under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    NonOptimized,
    Optimized,
    DebugSymbols,
}

impl BuildMode {
    pub const ALL: [BuildMode; 3] = [
        BuildMode::NonOptimized,
        BuildMode::Optimized,
        BuildMode::DebugSymbols,
    ];

    /// Extra compiler flags for this mode.
    #[must_use]
    pub const fn flags(self) -> &'static [&'static str] {
        match self {
            Self::NonOptimized => &[],
            Self::Optimized => &["-O"],
            Self::DebugSymbols => &["-g"],
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NonOptimized => "non-optimized",
            Self::Optimized => "optimized",
            Self::DebugSymbols => "with debug symbols",
        }
    }

    /// Parse a mode name as accepted on the command line.
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "non-optimized" | "nonoptimized" | "plain" | "o0" => Some(Self::NonOptimized),
            "optimized" | "opt" | "o" => Some(Self::Optimized),
            "debug" | "debug-symbols" | "g" => Some(Self::DebugSymbols),
            _ => None,
        }
    }
}

/// ANSI escape sequences used for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub ok: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub reset: &'static str,
}

impl Palette {
    #[must_use]
    pub const fn ansi() -> Self {
        Self {
            ok: "\x1b[92m",
            warning: "\x1b[93m",
            error: "\x1b[91m",
            reset: "\x1b[0m",
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            ok: "",
            warning: "",
            error: "",
            reset: "",
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::ansi()
    }
}

/// Paths and policy for one harness invocation.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Compiler binary under test.
    pub compiler: PathBuf,
    /// Directory fixture labels and output paths are computed relative to.
    pub fixture_root: PathBuf,
    /// Root of the build artifact tree.
    pub output_root: PathBuf,
    pub fixture_extension: String,
    pub record_extension: String,
    /// Modes a building fixture is evaluated under, in order.
    pub modes: Vec<BuildMode>,
    pub palette: Palette,
}

impl HarnessConfig {
    #[must_use]
    pub fn new(
        compiler: impl Into<PathBuf>,
        fixture_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            compiler: compiler.into(),
            fixture_root: fixture_root.into(),
            output_root: output_root.into(),
            fixture_extension: FIXTURE_EXTENSION.to_string(),
            record_extension: RECORD_EXTENSION.to_string(),
            modes: BuildMode::ALL.to_vec(),
            palette: Palette::default(),
        }
    }

    #[must_use]
    pub fn with_modes(mut self, modes: Vec<BuildMode>) -> Self {
        self.modes = modes;
        self
    }

    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Returns true if `path` has the fixture extension.
    #[must_use]
    pub fn is_fixture(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.fixture_extension)
    }

    /// Compute where a fixture's record and artifacts live.
    pub fn layout(&self, fixture: &Path) -> Result<FixtureLayout, HarnessError> {
        if !self.is_fixture(fixture) {
            return Err(HarnessError::NotAFixture {
                path: fixture.to_path_buf(),
                extension: self.fixture_extension.clone(),
            });
        }

        let relative = match fixture.strip_prefix(&self.fixture_root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => fixture
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| fixture.to_path_buf()),
        };
        let output_dir = match relative.parent() {
            Some(parent) => self.output_root.join(parent),
            None => self.output_root.clone(),
        };
        let stem = fixture.file_stem().unwrap_or_default();

        Ok(FixtureLayout {
            source: fixture.to_path_buf(),
            record: fixture.with_extension(&self.record_extension),
            artifact: output_dir.join(stem),
            label: format!("`{}`", relative.with_extension("").display()),
            output_dir,
        })
    }
}

/// Where one fixture's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureLayout {
    /// Fixture source file.
    pub source: PathBuf,
    /// Golden record beside the source.
    pub record: PathBuf,
    /// Directory mirroring the fixture's location under the output root.
    pub output_dir: PathBuf,
    /// Executable the compiler is asked to produce.
    pub artifact: PathBuf,
    /// Human-readable name: the relative path without extension, in backticks.
    pub label: String,
}

impl FixtureLayout {
    /// Create the artifact directory. Safe to repeat.
    pub fn prepare_output(&self) -> Result<(), HarnessError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| HarnessError::io(&self.output_dir, e))
    }
}

/// Refuse to run when the fixture tree and artifact tree would coincide.
pub fn check_target_and_output(target: &Path, output: &Path) -> Result<(), HarnessError> {
    let same = target == output
        || match (target.canonicalize(), output.canonicalize()) {
            (Ok(t), Ok(o)) => t == o,
            _ => false,
        };
    if same {
        return Err(HarnessError::SameTargetAndOutput(target.to_path_buf()));
    }
    if !target.exists() {
        return Err(HarnessError::MissingTarget(target.to_path_buf()));
    }
    Ok(())
}

/// Directory that labels and output paths are relative to for a given target.
#[must_use]
pub fn fixture_root_for(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.to_path_buf()
    } else {
        target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
