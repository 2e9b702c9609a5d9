/// Five ordered stages an analysis passes through, keyed by percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgressPhase {
    Preparing,
    Searching,
    Analyzing,
    Writing,
    Finalizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseColor {
    Slate,
    Blue,
    Violet,
    Amber,
    Green,
}

impl PhaseColor {
    pub fn hex(self) -> &'static str {
        match self {
            PhaseColor::Slate => "#64748b",
            PhaseColor::Blue => "#3b82f6",
            PhaseColor::Violet => "#8b5cf6",
            PhaseColor::Amber => "#f59e0b",
            PhaseColor::Green => "#22c55e",
        }
    }
}

/// Display metadata and inclusive percentage range of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInfo {
    pub phase: ProgressPhase,
    pub icon: &'static str,
    pub label: &'static str,
    pub low: u8,
    pub high: u8,
    pub color: PhaseColor,
}

impl PhaseInfo {
    pub fn contains(&self, percentage: u32) -> bool {
        u32::from(self.low) <= percentage && percentage <= u32::from(self.high)
    }
}

/// Contiguous ranges partitioning `0..=100`, in display order.
pub const PHASES: [PhaseInfo; 5] = [
    PhaseInfo {
        phase: ProgressPhase::Preparing,
        icon: "🚀",
        label: "Preparing analysis",
        low: 0,
        high: 10,
        color: PhaseColor::Slate,
    },
    PhaseInfo {
        phase: ProgressPhase::Searching,
        icon: "🔎",
        label: "Searching documents",
        low: 11,
        high: 40,
        color: PhaseColor::Blue,
    },
    PhaseInfo {
        phase: ProgressPhase::Analyzing,
        icon: "🧠",
        label: "Analyzing sources",
        low: 41,
        high: 70,
        color: PhaseColor::Violet,
    },
    PhaseInfo {
        phase: ProgressPhase::Writing,
        icon: "✍️",
        label: "Writing report",
        low: 71,
        high: 90,
        color: PhaseColor::Amber,
    },
    PhaseInfo {
        phase: ProgressPhase::Finalizing,
        icon: "✅",
        label: "Finalizing",
        low: 91,
        high: 100,
        color: PhaseColor::Green,
    },
];

impl ProgressPhase {
    pub fn info(self) -> &'static PhaseInfo {
        match self {
            ProgressPhase::Preparing => &PHASES[0],
            ProgressPhase::Searching => &PHASES[1],
            ProgressPhase::Analyzing => &PHASES[2],
            ProgressPhase::Writing => &PHASES[3],
            ProgressPhase::Finalizing => &PHASES[4],
        }
    }
}

/// Returns the first phase whose range contains `percentage`.
///
/// Values above the last range clamp to the last phase.
pub fn map_percentage(percentage: u32) -> ProgressPhase {
    PHASES
        .iter()
        .find(|info| info.contains(percentage))
        .map(|info| info.phase)
        .unwrap_or(ProgressPhase::Finalizing)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Completed,
    Active,
    Pending,
}

/// Status of `phase` when the job is at `percentage`.
pub fn phase_status(phase: ProgressPhase, percentage: u32) -> PhaseStatus {
    if map_percentage(percentage) == phase {
        PhaseStatus::Active
    } else if percentage > u32::from(phase.info().high) {
        PhaseStatus::Completed
    } else {
        PhaseStatus::Pending
    }
}

/// Coarse kind of a server step tag, used only for the status icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepKind {
    Starting,
    Searching,
    Analyzing,
    Generating,
    Saving,
    Complete,
    #[default]
    Working,
}

impl StepKind {
    /// Total mapping from the free-form server tag; unknown tags are `Working`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "init" | "initializing" | "start" | "starting" | "preparing" => StepKind::Starting,
            "search" | "searching" | "retrieval" | "retrieving" => StepKind::Searching,
            "analysis" | "analyze" | "analyzing" | "reasoning" => StepKind::Analyzing,
            "generate" | "generating" | "writing" | "drafting" => StepKind::Generating,
            "save" | "saving" | "persisting" => StepKind::Saving,
            "done" | "complete" | "completed" | "finished" => StepKind::Complete,
            _ => StepKind::Working,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            StepKind::Starting => "🚀",
            StepKind::Searching => "🔎",
            StepKind::Analyzing => "🧠",
            StepKind::Generating => "✍️",
            StepKind::Saving => "💾",
            StepKind::Complete => "✅",
            StepKind::Working => "⏳",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_tags_fall_back_to_working() {
        assert_eq!(StepKind::from_tag("Searching"), StepKind::Searching);
        assert_eq!(StepKind::from_tag("mystery"), StepKind::Working);
        assert_eq!(StepKind::from_tag("mystery").icon(), "⏳");
    }

    #[test]
    fn info_round_trips_through_table() {
        for info in PHASES.iter() {
            assert_eq!(info.phase.info(), info);
        }
    }
}
