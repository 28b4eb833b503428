use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::EntityId;
use super::dimension::Dimension;
use super::question::Question;
use crate::error::CoreError;
use crate::rubric::{self, Completeness};

/// Lifecycle status of a template version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TemplateStatus {
    Draft,
    Active,
    Archived,
}

impl TemplateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateStatus::Draft => "draft",
            TemplateStatus::Active => "active",
            TemplateStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TemplateStatus::Draft),
            "active" => Ok(TemplateStatus::Active),
            "archived" => Ok(TemplateStatus::Archived),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// List-form template, as returned when listing a framework's versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemplateSummary {
    pub id: EntityId,
    pub type_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    pub status: TemplateStatus,
    #[serde(default)]
    pub updated_at: Option<jiff::Timestamp>,
}

/// Full template detail with its nested dimensions and questions.
///
/// This is the working snapshot the builder renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Template {
    pub id: EntityId,
    pub type_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    pub status: TemplateStatus,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub updated_at: Option<jiff::Timestamp>,
}

impl Template {
    pub fn is_draft(&self) -> bool {
        self.status == TemplateStatus::Draft
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id,
            type_code: self.type_code.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            status: self.status,
            updated_at: self.updated_at,
        }
    }

    pub fn dimension(&self, id: EntityId) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    pub fn question(&self, id: EntityId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn question_mut(&mut self, id: EntityId) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| q.id == id)
    }

    /// Dimensions in tab order: by `display_order`, ties by array position.
    pub fn ordered_dimensions(&self) -> Vec<&Dimension> {
        let mut dims: Vec<&Dimension> = self.dimensions.iter().collect();
        // sort_by_key is stable, so equal orders keep array position.
        dims.sort_by_key(|d| d.display_order);
        dims
    }

    /// Zero-based tab index of a dimension.
    pub fn dimension_index(&self, id: EntityId) -> Option<usize> {
        self.ordered_dimensions().iter().position(|d| d.id == id)
    }

    /// Questions in card order, optionally restricted to one dimension.
    pub fn ordered_questions(&self, dimension_id: Option<EntityId>) -> Vec<&Question> {
        let mut questions: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| dimension_id.is_none_or(|id| q.dimension_id == id))
            .collect();
        questions.sort_by_key(|q| q.display_order);
        questions
    }

    pub fn question_count(&self, dimension_id: EntityId) -> usize {
        self.questions
            .iter()
            .filter(|q| q.dimension_id == dimension_id)
            .count()
    }

    /// Highest question `display_order`, or `None` for an empty template.
    pub fn max_question_order(&self) -> Option<i32> {
        self.questions.iter().map(|q| q.display_order).max()
    }

    /// Rubric completeness summed over every question.
    pub fn completeness(&self) -> Completeness {
        self.questions.iter().map(rubric::completeness).sum()
    }
}
