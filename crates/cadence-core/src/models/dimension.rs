use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::EntityId;

/// A weighted grouping of questions within a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dimension {
    pub id: EntityId,
    pub template_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub display_order: i32,
}

fn default_weight() -> f64 {
    1.0
}
