use crate::convergence::{ActionOutcome, ConvergenceResult};
use crate::prereq::{PrerequisiteReport, ToolStatus};
use crate::ui::icons::{BULLET, CHECK, CROSS, ROCKET, SEARCH, SPARKLE, WARN};
use console::{Emoji, style};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Terminal UI for a deployment run.
///
/// A single phase bar tracks how many of the fixed phases have completed.
/// Progress lines are printed above it through `MultiProgress`. When stdout
/// is not a terminal the bar is hidden and lines go straight to stdout, so
/// piped output still shows how far the sequence got.
pub struct DeployUI {
    multi: MultiProgress,
    phase_bar: ProgressBar,
    verbose: bool,
    quiet: bool,
}

impl DeployUI {
    /// Create the UI with a phase bar sized to `total_phases`.
    ///
    /// # Arguments
    /// * `total_phases`: number of phases in the sequence
    /// * `verbose`: when `true`, per-action notes are printed as well
    pub fn new(total_phases: u64, verbose: bool) -> Self {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::stdout());

        let phase_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        // no bar for line-only commands such as `check`
        let phase_bar = if total_phases == 0 {
            ProgressBar::hidden()
        } else {
            multi.add(ProgressBar::new(total_phases))
        };
        phase_bar.set_style(phase_style);
        phase_bar.set_prefix("Phases");

        Self {
            multi,
            phase_bar,
            verbose,
            quiet: false,
        }
    }

    /// A UI that renders nothing. Used by tests and embedders.
    pub fn quiet(total_phases: u64) -> Self {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let phase_bar = multi.add(ProgressBar::new(total_phases));
        Self {
            multi,
            phase_bar,
            verbose: false,
            quiet: true,
        }
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        if self.multi.is_hidden() {
            println!("{}", msg.as_ref());
            return;
        }
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn print_banner(&self, title: &str, subtitle: &str) {
        let width = 62;
        self.print_line("");
        self.print_line(format!("┌{}┐", "─".repeat(width)));
        self.print_line(format!("│  {:<w$}│", title, w = width - 2));
        self.print_line(format!("│  {:<w$}│", subtitle, w = width - 2));
        self.print_line(format!("└{}┘", "─".repeat(width)));
    }

    pub fn print_prerequisites_header(&self) {
        self.print_line("");
        self.print_line(format!("{}Checking prerequisites...", SEARCH));
    }

    pub fn print_prerequisite(&self, tool: &ToolStatus) {
        if tool.present {
            self.print_line(format!("  {}{}", CHECK, tool.label));
        } else {
            self.print_line(format!(
                "  {}{} - {}",
                CROSS,
                tool.label,
                style("NOT FOUND").red().bold()
            ));
            if self.verbose
                && let Some(detail) = &tool.detail
            {
                self.print_line(format!("      {}", style(detail).dim()));
            }
        }
    }

    /// Print every tool line followed by the overall verdict.
    pub fn print_prerequisite_report(&self, report: &PrerequisiteReport) {
        for tool in &report.tools {
            self.print_prerequisite(tool);
        }
        self.print_line("");
        if report.passed() {
            self.print_line(format!("{}All prerequisites satisfied!", CHECK));
        } else {
            self.print_line(format!(
                "{}Missing required tools: {}",
                CROSS,
                report.missing().join(", ")
            ));
            self.print_line("Please install them before continuing.");
        }
    }

    pub fn start_sequence(&self) {
        self.print_line("");
        self.print_line(format!("{}Initiating deployment sequence...", ROCKET));
    }

    /// Print the phase header and point the phase bar at it.
    ///
    /// Does **not** advance the bar; call [`Self::phase_complete`] for that.
    pub fn start_phase(&self, ordinal: usize, title: &str, icon: &Emoji<'_, '_>) {
        self.phase_bar
            .set_message(format!("{}: {}", style(ordinal).yellow(), title));
        self.print_line("");
        self.print_line(format!(
            "{}Phase {}: {}...",
            icon,
            style(ordinal).yellow().bold(),
            title
        ));
    }

    pub fn action_result(&self, outcome: &ActionOutcome) {
        let line = match &outcome.result {
            ConvergenceResult::Created => format!("    {}{}", CHECK, outcome.action),
            ConvergenceResult::AlreadyPresent => format!(
                "    {}{} {}",
                WARN,
                outcome.action,
                style("(already present)").yellow()
            ),
            ConvergenceResult::Failed(reason) => format!(
                "    {}{}: {}",
                CROSS,
                outcome.action,
                style(reason).red()
            ),
        };
        self.print_line(line);
    }

    /// One descriptive progress line inside the current phase.
    pub fn note(&self, msg: &str) {
        self.print_line(format!("  {}{}", BULLET, msg));
    }

    /// Dim detail line, shown only in verbose mode.
    pub fn detail(&self, msg: &str) {
        if self.verbose {
            self.print_line(format!("    {} {}", style("→").dim(), style(msg).dim()));
        }
    }

    pub fn phase_complete(&self, title: &str) {
        self.phase_bar.inc(1);
        self.print_line("");
        self.print_line(format!("  {}{} complete!", CHECK, title));
    }

    /// Print a failure line without advancing the phase bar.
    pub fn phase_aborted(&self, ordinal: usize, title: &str, reason: &str) {
        self.print_line("");
        self.print_line(format!(
            "{}Phase {} ({}) failed: {}",
            CROSS,
            style(ordinal).red().bold(),
            title,
            reason
        ));
    }

    /// Clear the phase bar once the sequence has ended either way.
    pub fn finish(&self, completed: bool) {
        if completed {
            self.phase_bar
                .finish_with_message(format!("{}all phases complete", SPARKLE));
        } else {
            self.phase_bar.abandon();
        }
    }
}
