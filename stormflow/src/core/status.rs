//! Stage kinds and the per-run phase machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four stages of the article pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Research the topic and build a knowledge base.
    Curation,
    /// Derive a section outline from the knowledge base.
    Outlining,
    /// Write one draft section per top-level outline section.
    Drafting,
    /// Revise the draft into the final article.
    Polishing,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [Self; 4] = [
        Self::Curation,
        Self::Outlining,
        Self::Drafting,
        Self::Polishing,
    ];

    /// Stable machine name used in logs, events and failure reasons.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Curation => "curation",
            Self::Outlining => "outlining",
            Self::Drafting => "drafting",
            Self::Polishing => "polishing",
        }
    }

    /// Human-readable progress label announced before the stage runs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Curation => "Curating knowledge",
            Self::Outlining => "Generating outline",
            Self::Drafting => "Drafting article",
            Self::Polishing => "Polishing article",
        }
    }

    /// Zero-based position in the pipeline.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Curation => 0,
            Self::Outlining => 1,
            Self::Drafting => 2,
            Self::Polishing => 3,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phase of a single pipeline run.
///
/// `Idle → Curating → Outlining → Drafting → Polishing → Done`, with an edge
/// from every non-terminal phase to `Failed`. No phase is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Not started.
    #[default]
    Idle,
    /// Curation is running.
    Curating,
    /// Outlining is running.
    Outlining,
    /// Drafting is running.
    Drafting,
    /// Polishing is running.
    Polishing,
    /// The article was produced.
    Done,
    /// A stage failed or the run was cancelled.
    Failed,
}

impl RunPhase {
    /// Phase in which the given stage executes.
    #[must_use]
    pub const fn running(stage: StageKind) -> Self {
        match stage {
            StageKind::Curation => Self::Curating,
            StageKind::Outlining => Self::Outlining,
            StageKind::Drafting => Self::Drafting,
            StageKind::Polishing => Self::Polishing,
        }
    }

    /// Stage executing in this phase, if any.
    #[must_use]
    pub const fn stage(self) -> Option<StageKind> {
        match self {
            Self::Curating => Some(StageKind::Curation),
            Self::Outlining => Some(StageKind::Outlining),
            Self::Drafting => Some(StageKind::Drafting),
            Self::Polishing => Some(StageKind::Polishing),
            Self::Idle | Self::Done | Self::Failed => None,
        }
    }

    /// Successor on the success path. Terminal phases have none.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Curating),
            Self::Curating => Some(Self::Outlining),
            Self::Outlining => Some(Self::Drafting),
            Self::Drafting => Some(Self::Polishing),
            Self::Polishing => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Returns true for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving to `to` is a legal edge.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Curating => "curating",
            Self::Outlining => "outlining",
            Self::Drafting => "drafting",
            Self::Polishing => "polishing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_labels() {
        let labels: Vec<_> = StageKind::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Curating knowledge",
                "Generating outline",
                "Drafting article",
                "Polishing article"
            ]
        );
        for (i, stage) in StageKind::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn test_stage_kind_serialize() {
        let json = serde_json::to_string(&StageKind::Drafting).unwrap();
        assert_eq!(json, r#""drafting""#);
    }

    #[test]
    fn test_phase_success_path() {
        let mut phase = RunPhase::Idle;
        let mut visited = vec![phase];
        while let Some(next) = phase.next() {
            assert!(phase.can_transition_to(next));
            phase = next;
            visited.push(phase);
        }
        assert_eq!(visited.len(), 6);
        assert_eq!(phase, RunPhase::Done);
    }

    #[test]
    fn test_phase_failure_edges() {
        assert!(RunPhase::Idle.can_transition_to(RunPhase::Failed));
        assert!(RunPhase::Drafting.can_transition_to(RunPhase::Failed));
        assert!(!RunPhase::Done.can_transition_to(RunPhase::Failed));
        assert!(!RunPhase::Failed.can_transition_to(RunPhase::Curating));
        assert!(!RunPhase::Outlining.can_transition_to(RunPhase::Curating));
    }

    #[test]
    fn test_phase_stage_mapping() {
        for stage in StageKind::ALL {
            assert_eq!(RunPhase::running(stage).stage(), Some(stage));
        }
        assert_eq!(RunPhase::Done.stage(), None);
    }
}
