//! Terminal output for a build run.
//!
//! Banners and per-phase summary lines. Diagnostics go through `tracing`;
//! this module only prints what a user always sees.

use crate::orchestrator::{BuildReport, PhaseReport, PhaseStatus};

const HEADER: &str = "\x1b[44;39m";
const ERROR: &str = "\x1b[41;39m";
const SUCCESS: &str = "\x1b[42;39m";
const RESET: &str = "\x1b[0m";

/// Prints banners, optionally in color.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    color: bool,
    enabled: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            enabled: true,
        }
    }

    /// A reporter that prints nothing.
    pub fn silent() -> Self {
        Self {
            color: false,
            enabled: false,
        }
    }

    pub fn header(&self, msg: &str) {
        self.emit(HEADER, &format!("\n{}\n", msg));
    }

    /// Fatal diagnostic. Does not exit; the caller owns the exit code.
    pub fn error(&self, msg: &str) {
        self.emit(ERROR, &format!("\n! {}\n", msg));
    }

    pub fn phase_summary(&self, phase: &PhaseReport) {
        if self.enabled {
            println!("{}", format_phase_summary(phase));
        }
    }

    pub fn final_banner(&self, report: &BuildReport) {
        if report.succeeded() {
            self.emit(SUCCESS, "\n* Build succeeded\n");
        } else {
            self.emit(ERROR, "\n! Build failed\n");
        }
    }

    fn emit(&self, code: &str, text: &str) {
        if self.enabled {
            println!("{}", self.paint(code, text));
        }
    }

    /// Wrap `text` in `code`, resetting at every line break so the
    /// background does not bleed past the end of each line.
    pub fn paint(&self, code: &str, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let body = text.replace('\n', &format!("{RESET}\n{code}"));
        format!("{code}{body}{RESET}")
    }
}

/// One line describing a finished phase.
pub fn format_phase_summary(phase: &PhaseReport) -> String {
    let total = phase.results.len();
    let ok = phase.results.iter().filter(|r| r.succeeded).count();
    let name = phase.phase.as_str();

    match phase.status() {
        PhaseStatus::Skipped => format!("{name}: skipped"),
        PhaseStatus::Passed if total == 0 => format!("{name}: nothing to build"),
        PhaseStatus::Passed => format!("{name}: passed ({ok}/{total})"),
        PhaseStatus::Partial | PhaseStatus::Failed => {
            let failed = phase
                .results
                .iter()
                .filter(|r| !r.succeeded)
                .map(|r| format!("{} [exit {}]", r.target.short_name, r.exit_code))
                .collect::<Vec<_>>()
                .join(", ");
            let label = if phase.status() == PhaseStatus::Partial {
                "partial"
            } else {
                "failed"
            };
            format!("{name}: {label} ({ok}/{total} succeeded; failed: {failed})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::BuildResult;
    use crate::orchestrator::Phase;
    use crate::target::{HOST_TARGETS, NATIVE_ABIS};

    #[test]
    fn test_paint_without_color() {
        let r = Reporter::new(false);
        assert_eq!(r.paint(HEADER, "\nhi\n"), "\nhi\n");
    }

    #[test]
    fn test_paint_resets_each_line() {
        let r = Reporter::new(true);
        assert_eq!(
            r.paint(ERROR, "a\nb"),
            "\x1b[41;39ma\x1b[0m\n\x1b[41;39mb\x1b[0m"
        );
    }

    #[test]
    fn test_partial_summary_lists_failures() {
        let phase = PhaseReport {
            phase: Phase::Host,
            attempted: true,
            results: vec![
                BuildResult::from_exit_code(HOST_TARGETS[0], 0),
                BuildResult::from_exit_code(HOST_TARGETS[2], 1),
            ],
        };
        assert_eq!(
            format_phase_summary(&phase),
            "host: partial (1/2 succeeded; failed: win64 [exit 1])"
        );
    }

    #[test]
    fn test_passed_and_skipped_summaries() {
        let passed = PhaseReport {
            phase: Phase::Native,
            attempted: true,
            results: NATIVE_ABIS
                .iter()
                .map(|t| BuildResult::from_exit_code(*t, 0))
                .collect(),
        };
        assert_eq!(format_phase_summary(&passed), "native-abi: passed (4/4)");
        assert_eq!(
            format_phase_summary(&PhaseReport::skipped(Phase::Host)),
            "host: skipped"
        );
    }
}
