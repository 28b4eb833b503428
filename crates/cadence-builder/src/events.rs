use serde::Serialize;

use cadence_core::models::EntityId;
use cadence_core::models::template::TemplateStatus;
use cadence_core::rubric::Completeness;

use crate::state::{DimensionFilter, Phase};
use crate::status::SaveStatus;

/// Notifications for renderers. The builder owns state; subscribers redraw
/// the affected fragment when an event arrives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuilderEvent {
    PhaseChanged { phase: Phase },
    FrameworksLoaded { count: usize },
    TemplatesLoaded { type_code: String, count: usize },
    TemplateLoaded { template_id: EntityId, status: TemplateStatus },
    /// The selected template no longer exists; nothing to display.
    TemplateCleared,
    /// First edit attempt on a template that is not a draft.
    ActiveEditWarning { template_id: EntityId },
    TemplateUpdated { template_id: EntityId },
    QuestionAdded { question_id: EntityId },
    QuestionUpdated { question_id: EntityId },
    QuestionRemoved { question_id: EntityId },
    QuestionsReordered { count: usize },
    FocusQuestionText { question_id: EntityId },
    CompletenessChanged {
        question_id: EntityId,
        completeness: Completeness,
    },
    DimensionFilterChanged { filter: DimensionFilter },
    SaveStatusChanged(SaveStatus),
    Failed {
        operation: &'static str,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(BuilderEvent::SaveStatusChanged(SaveStatus::Failed(
            "request timed out".to_string(),
        )))
        .unwrap();
        assert_eq!(json["event"], "save_status_changed");

        let json = serde_json::to_value(BuilderEvent::QuestionAdded { question_id: 9 }).unwrap();
        assert_eq!(json, serde_json::json!({"event": "question_added", "question_id": 9}));
    }
}
