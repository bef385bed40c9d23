//! Human-facing console output.

use std::fmt;
use std::io::Write;

use crate::config::Palette;
use crate::stats::RunStats;

/// Status words printed in front of or after console lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Info,
    Warning,
    Error,
    Pass,
    Failure,
    DoesntBuild,
    CompilerCrash,
    DidntCrash,
}

impl Tag {
    const fn text(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Pass => "PASS",
            Self::Failure => "FAILURE",
            Self::DoesntBuild => "FAILURE (doesn't build)",
            Self::CompilerCrash => "FAILURE (compiler crashed)",
            Self::DidntCrash => "PASS (didn't crash)",
        }
    }

    fn color(self, palette: &Palette) -> &'static str {
        match self {
            Self::Info | Self::Pass | Self::DidntCrash => palette.ok,
            Self::Warning => palette.warning,
            Self::Error | Self::Failure | Self::DoesntBuild | Self::CompilerCrash => palette.error,
        }
    }
}

/// Colored line-oriented output.
///
/// Writes are best-effort: a closed terminal must not abort a test batch.
pub struct Console {
    out: Box<dyn Write>,
    palette: Palette,
}

impl Console {
    #[must_use]
    pub fn stdout(palette: Palette) -> Self {
        Self::to_writer(Box::new(std::io::stdout()), palette)
    }

    #[must_use]
    pub fn to_writer(out: Box<dyn Write>, palette: Palette) -> Self {
        Self { out, palette }
    }

    #[must_use]
    pub fn paint(&self, tag: Tag) -> String {
        format!("{}{}{}", tag.color(&self.palette), tag.text(), self.palette.reset)
    }

    /// `TAG: message` without a line break; the verdict follows on the same line.
    pub fn begin(&mut self, tag: Tag, args: fmt::Arguments<'_>) {
        let painted = self.paint(tag);
        let _ = write!(self.out, "{painted}: {args}");
        let _ = self.out.flush();
    }

    /// Finish a line started with [`Console::begin`].
    pub fn verdict(&mut self, tag: Tag) {
        let painted = self.paint(tag);
        let _ = writeln!(self.out, "{painted}");
    }

    /// `TAG: message` on its own line.
    pub fn line(&mut self, tag: Tag, args: fmt::Arguments<'_>) {
        let painted = self.paint(tag);
        let _ = writeln!(self.out, "{painted}: {args}");
    }

    /// Indented detail line.
    pub fn detail(&mut self, args: fmt::Arguments<'_>) {
        let _ = writeln!(self.out, "  {args}");
    }

    /// Batch summary: counters, then ignored and failed labels.
    pub fn summary(&mut self, stats: &RunStats) {
        let p = self.palette;
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "Passed: {}{}{}", p.ok, stats.passed, p.reset);
        let _ = writeln!(self.out, "Ignored: {}{}{}", p.warning, stats.ignored, p.reset);
        let _ = writeln!(self.out, "Failed: {}{}{}", p.error, stats.failed, p.reset);
        let _ = writeln!(self.out);

        if !stats.ignored_files.is_empty() {
            let _ = writeln!(self.out, "Ignored files:");
            for label in &stats.ignored_files {
                let _ = writeln!(self.out, "    {label}");
            }
            if !stats.failed_files.is_empty() {
                let _ = writeln!(self.out);
            }
        }

        if !stats.failed_files.is_empty() {
            let _ = writeln!(self.out, "Failed files:");
            for label in &stats.failed_files {
                let _ = writeln!(self.out, "    {label}");
            }
        }
        let _ = self.out.flush();
    }
}
