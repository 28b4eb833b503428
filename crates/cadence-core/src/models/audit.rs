use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One server-generated change record for a template or its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuditEntry {
    pub changed_at: jiff::Timestamp,
    #[serde(default)]
    pub changed_by: Option<ChangedBy>,
    pub entity_type: String,
    pub field_name: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChangedBy {
    pub first_name: String,
    pub last_name: String,
}

impl ChangedBy {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
