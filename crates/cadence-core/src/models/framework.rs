use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::EntityId;

/// A scoring methodology under which templates are versioned.
///
/// Loaded once at startup and never mutated by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AssessmentType {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
}

impl AssessmentType {
    /// Label for a framework tab: the short name when present, else the full name.
    pub fn tab_label(&self) -> &str {
        self.short_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }
}
