use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::EntityId;
use crate::rubric::{RubricField, ScoreMaps};

pub const DEFAULT_MIN_SCORE: i32 = 1;
pub const DEFAULT_MAX_SCORE: i32 = 5;

/// A scored rubric item owned by one dimension.
///
/// The three score maps are keyed by the string form of each level in
/// `[min_score, max_score]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Question {
    pub id: EntityId,
    pub dimension_id: EntityId,
    pub question_number: String,
    pub question_text: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_min_score")]
    pub min_score: i32,
    #[serde(default = "default_max_score")]
    pub max_score: i32,
    #[serde(default)]
    pub score_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub score_descriptions: BTreeMap<String, String>,
    #[serde(default)]
    pub score_evidence: BTreeMap<String, String>,
}

fn default_min_score() -> i32 {
    DEFAULT_MIN_SCORE
}

fn default_max_score() -> i32 {
    DEFAULT_MAX_SCORE
}

impl Question {
    /// Current text of one rubric cell; empty when the level has no entry.
    pub fn cell(&self, level: i32, field: RubricField) -> &str {
        let map = match field {
            RubricField::Label => &self.score_labels,
            RubricField::Description => &self.score_descriptions,
            RubricField::Evidence => &self.score_evidence,
        };
        map.get(&level.to_string()).map(String::as_str).unwrap_or("")
    }

    /// Copy of all three score maps, the unit the scores endpoint accepts.
    pub fn score_maps(&self) -> ScoreMaps {
        ScoreMaps {
            score_labels: self.score_labels.clone(),
            score_descriptions: self.score_descriptions.clone(),
            score_evidence: self.score_evidence.clone(),
        }
    }

    /// Replace all three score maps at once.
    pub fn set_score_maps(&mut self, maps: ScoreMaps) {
        self.score_labels = maps.score_labels;
        self.score_descriptions = maps.score_descriptions;
        self.score_evidence = maps.score_evidence;
    }

    pub fn score_levels(&self) -> std::ops::RangeInclusive<i32> {
        self.min_score..=self.max_score
    }
}
