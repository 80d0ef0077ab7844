//! Per-generation worker lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle of one generation's worker.
///
/// `parsed → installing → installed → activating → active → superseded`,
/// with `redundant` for a worker whose install or activation failed or that
/// was replaced while still waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Constructed, nothing fetched yet.
    Parsed,
    /// Pre-caching the asset manifest.
    Installing,
    /// Manifest cached; waiting for the previous generation to let go.
    Installed,
    /// Reaping old generations.
    Activating,
    /// Serving traffic.
    Active,
    /// A newer generation became active; this one's cache is gone.
    Superseded,
    /// Never became (or stayed) eligible to serve.
    Redundant,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installing, Redundant)
                | (Installed, Activating)
                | (Installed, Redundant)
                | (Activating, Active)
                | (Activating, Redundant)
                | (Active, Superseded)
        )
    }

    /// Only an active worker intercepts fetches.
    pub fn can_intercept_fetch(self) -> bool {
        matches!(self, WorkerState::Active)
    }

    /// Whether a skip-waiting signal can still change anything.
    pub fn is_pending(self) -> bool {
        matches!(self, WorkerState::Installing | WorkerState::Installed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Superseded | WorkerState::Redundant)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Superseded => "superseded",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}
