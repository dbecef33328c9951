use crate::error::{BootstrapError, Result};
use crate::phase::RoundTrace;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Summary of one bootstrap run.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub run_id: Uuid,
    pub context_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Discovery passes of the registry mutation phase.
    pub rounds: Vec<RoundTrace>,
    pub mutation_order: Vec<String>,
    /// Registry phase customizations followed by the factory phase ones.
    pub customization_order: Vec<String>,
    pub hook_chain: Vec<String>,
    pub target_count: usize,
    /// Objects built before the hook chain was complete.
    pub premature_objects: Vec<String>,
    pub pre_instantiated: usize,
    pub listeners: Vec<String>,
}

impl BootstrapReport {
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BootstrapError::Internal(format!("failed to serialize report: {e}")))
    }
}
