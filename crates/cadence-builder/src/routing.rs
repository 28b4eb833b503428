//! Save routing.
//!
//! Which backend endpoint an edit goes to depends on the template's status
//! and the field being edited. The whole policy is the table in [`route`]:
//!
//! | status       | template / dimension / question structure | question text, number | rubric cell |
//! |--------------|-------------------------------------------|-----------------------|-------------|
//! | draft        | General                                   | General               | Scores      |
//! | active       | Rejected                                  | Minor                 | Scores      |
//! | archived     | Rejected                                  | Minor                 | Scores      |

use std::fmt;

use serde::Serialize;

use cadence_core::models::template::TemplateStatus;
use cadence_core::rubric::RubricField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateField {
    Name,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionField {
    Name,
    Description,
    Weight,
    DisplayOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionField {
    Text,
    Number,
    IsRequired,
    DisplayOrder,
    MinScore,
    MaxScore,
    Dimension,
}

impl QuestionField {
    /// Fields that may change on a live template.
    pub fn is_minor(self) -> bool {
        matches!(self, QuestionField::Text | QuestionField::Number)
    }
}

/// Any editable field the builder can save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "entity", content = "field", rename_all = "snake_case")]
pub enum EditField {
    Template(TemplateField),
    Dimension(DimensionField),
    Question(QuestionField),
    Rubric(RubricField),
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditField::Template(field) => write!(f, "template {}", template_name(*field)),
            EditField::Dimension(field) => write!(f, "dimension {}", dimension_name(*field)),
            EditField::Question(field) => write!(f, "question {}", question_name(*field)),
            EditField::Rubric(field) => write!(f, "rubric {field}"),
        }
    }
}

fn template_name(field: TemplateField) -> &'static str {
    match field {
        TemplateField::Name => "name",
        TemplateField::Description => "description",
    }
}

fn dimension_name(field: DimensionField) -> &'static str {
    match field {
        DimensionField::Name => "name",
        DimensionField::Description => "description",
        DimensionField::Weight => "weight",
        DimensionField::DisplayOrder => "display_order",
    }
}

fn question_name(field: QuestionField) -> &'static str {
    match field {
        QuestionField::Text => "question_text",
        QuestionField::Number => "question_number",
        QuestionField::IsRequired => "is_required",
        QuestionField::DisplayOrder => "display_order",
        QuestionField::MinScore => "min_score",
        QuestionField::MaxScore => "max_score",
        QuestionField::Dimension => "dimension_id",
    }
}

/// Endpoint an edit is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Unrestricted update of the owning entity.
    General,
    /// Text/number-only question update.
    Minor,
    /// Whole-question score map replacement.
    Scores,
    /// Not allowed; never sent.
    Rejected,
}

pub fn route(status: TemplateStatus, field: EditField) -> Route {
    match (status, field) {
        (_, EditField::Rubric(_)) => Route::Scores,
        (TemplateStatus::Draft, _) => Route::General,
        (_, EditField::Question(q)) if q.is_minor() => Route::Minor,
        _ => Route::Rejected,
    }
}
