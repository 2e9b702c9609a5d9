//! Plain-text rendering of the view model for the terminal.

use analyst_core::{AppViewModel, PhaseStatus, SessionState, Severity};

const BAR_WIDTH: usize = 20;

/// One progress line: icon, bar, percentage, phase, timing and the server message.
pub fn status_line(view: &AppViewModel) -> String {
    let filled = usize::from(view.percentage) * BAR_WIDTH / 100;
    let bar: String = "#".repeat(filled) + &".".repeat(BAR_WIDTH - filled);
    let phase = view.phase.info();

    let mut line = format!(
        "{} [{}] {:>3}% {} {}",
        view.step.icon(),
        bar,
        view.percentage,
        phase.icon,
        phase.label
    );
    if let Some(count) = view.sources_count {
        line.push_str(&format!(" | {count} sources"));
    }
    line.push_str(&format!(
        " | {} elapsed, ETA {} ({})",
        analyst_core::format_duration(view.elapsed),
        view.eta,
        view.speed.label()
    ));
    if !view.message.is_empty() {
        line.push_str(" - ");
        line.push_str(&view.message);
    }
    line
}

/// Compact phase strip, e.g. `✓ Preparing > Searching . Analyzing`.
pub fn phase_strip(view: &AppViewModel) -> String {
    view.phases
        .iter()
        .map(|row| {
            let marker = match row.status {
                PhaseStatus::Completed => "✓",
                PhaseStatus::Active if view.session == SessionState::Running => ">",
                PhaseStatus::Active => "✓",
                PhaseStatus::Pending => ".",
            };
            format!("{marker} {}", row.label)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}
