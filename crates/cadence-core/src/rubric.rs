//! Rubric cells and completeness.
//!
//! A question's rubric is a grid of score levels by three text fields. A
//! cell counts as filled when its trimmed text is non-empty; keys outside
//! `[min_score, max_score]` never count.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::models::question::Question;

/// Number of text fields per score level.
pub const FIELDS_PER_LEVEL: u64 = 3;

/// Widest score range the editor accepts, in levels.
pub const MAX_SCORE_LEVELS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RubricField {
    Label,
    Description,
    Evidence,
}

impl RubricField {
    pub const ALL: [RubricField; 3] = [
        RubricField::Label,
        RubricField::Description,
        RubricField::Evidence,
    ];

    /// Labels are edited on a single line; the other fields allow newlines.
    pub fn is_multiline(self) -> bool {
        !matches!(self, RubricField::Label)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RubricField::Label => "label",
            RubricField::Description => "description",
            RubricField::Evidence => "evidence",
        }
    }
}

impl fmt::Display for RubricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RubricField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label" => Ok(RubricField::Label),
            "description" => Ok(RubricField::Description),
            "evidence" => Ok(RubricField::Evidence),
            other => Err(CoreError::InvalidRubricField(other.to_string())),
        }
    }
}

/// The three score maps of one question, sent whole to the scores endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreMaps {
    pub score_labels: BTreeMap<String, String>,
    pub score_descriptions: BTreeMap<String, String>,
    pub score_evidence: BTreeMap<String, String>,
}

impl ScoreMaps {
    pub fn cell(&self, level: i32, field: RubricField) -> &str {
        let map = match field {
            RubricField::Label => &self.score_labels,
            RubricField::Description => &self.score_descriptions,
            RubricField::Evidence => &self.score_evidence,
        };
        map.get(&level.to_string()).map(String::as_str).unwrap_or("")
    }

    /// Return a copy with one cell replaced. An empty value removes the key.
    pub fn with_cell(&self, level: i32, field: RubricField, value: &str) -> ScoreMaps {
        let mut next = self.clone();
        let map = match field {
            RubricField::Label => &mut next.score_labels,
            RubricField::Description => &mut next.score_descriptions,
            RubricField::Evidence => &mut next.score_evidence,
        };
        let key = level.to_string();
        if value.is_empty() {
            map.remove(&key);
        } else {
            map.insert(key, value.to_string());
        }
        next
    }
}

/// Filled/total rubric cells for one question or a whole template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Completeness {
    pub filled: u64,
    pub total: u64,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.filled == self.total
    }

    /// Whole-number percentage, 0 when there are no cells.
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.filled.saturating_mul(100) / self.total
        }
    }
}

impl std::ops::Add for Completeness {
    type Output = Completeness;

    fn add(self, rhs: Completeness) -> Completeness {
        Completeness {
            filled: self.filled.saturating_add(rhs.filled),
            total: self.total.saturating_add(rhs.total),
        }
    }
}

impl std::iter::Sum for Completeness {
    fn sum<I: Iterator<Item = Completeness>>(iter: I) -> Completeness {
        iter.fold(Completeness::default(), |acc, c| acc + c)
    }
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.filled, self.total)
    }
}

/// Number of score levels in `[min, max]`, 0 for an inverted range.
pub fn level_count(min: i32, max: i32) -> u64 {
    (i64::from(max) - i64::from(min) + 1).max(0) as u64
}

/// Validate a score range. `min` must not exceed `max` and the range may
/// span at most [`MAX_SCORE_LEVELS`] levels.
pub fn validate_range(min: i32, max: i32) -> Result<(), CoreError> {
    if min > max || level_count(min, max) > MAX_SCORE_LEVELS {
        return Err(CoreError::InvalidScoreRange { min, max });
    }
    Ok(())
}

/// Compute rubric completeness for a question.
///
/// Filled cells are counted from the map keys, so a wide range stored by
/// the server costs nothing extra.
pub fn completeness(question: &Question) -> Completeness {
    let (min, max) = (question.min_score, question.max_score);
    if min > max {
        return Completeness::default();
    }

    let filled: u64 = [
        &question.score_labels,
        &question.score_descriptions,
        &question.score_evidence,
    ]
    .into_iter()
    .map(|map| {
        map.iter()
            .filter(|(key, value)| {
                key.parse::<i32>().is_ok_and(|level| {
                    (min..=max).contains(&level) && level.to_string() == **key
                }) && !value.trim().is_empty()
            })
            .count() as u64
    })
    .sum();

    Completeness {
        filled,
        total: level_count(min, max) * FIELDS_PER_LEVEL,
    }
}
