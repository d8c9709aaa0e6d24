//! Export state machine
//!
//! `Idle -> Validating -> (Aborted | Mutating -> Exporting -> Reverting) -> Idle`.
//! A failure while mutating skips straight to `Reverting`.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Phase of a single export call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportPhase {
    #[default]
    Idle,
    Validating,
    /// Preconditions failed; the scene was never touched.
    Aborted,
    /// Scene state is being changed to match the entry.
    Mutating,
    Exporting,
    /// Scene edits are being undone.
    Reverting,
}

impl ExportPhase {
    pub fn can_transition_to(self, next: ExportPhase) -> bool {
        use ExportPhase::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Aborted)
                | (Validating, Mutating)
                | (Aborted, Idle)
                | (Mutating, Exporting)
                | (Mutating, Reverting)
                | (Exporting, Reverting)
                | (Reverting, Idle)
        )
    }
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportPhase::Idle => write!(f, "Idle"),
            ExportPhase::Validating => write!(f, "Validating"),
            ExportPhase::Aborted => write!(f, "Aborted"),
            ExportPhase::Mutating => write!(f, "Mutating"),
            ExportPhase::Exporting => write!(f, "Exporting"),
            ExportPhase::Reverting => write!(f, "Reverting"),
        }
    }
}

/// Current phase plus every phase passed through.
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    phase: ExportPhase,
    history: Vec<ExportPhase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub fn history(&self) -> &[ExportPhase] {
        &self.history
    }

    /// Move to `next`. Illegal transitions are refused and logged.
    pub fn advance(&mut self, next: ExportPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            warn!("[EXPORT] Refusing transition {} -> {}", self.phase, next);
            return false;
        }
        debug!("[EXPORT] {} -> {}", self.phase, next);
        self.phase = next;
        self.history.push(next);
        true
    }
}
