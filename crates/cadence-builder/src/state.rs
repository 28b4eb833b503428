use std::collections::{HashMap, HashSet};

use serde::Serialize;

use cadence_core::models::EntityId;
use cadence_core::models::framework::AssessmentType;
use cadence_core::models::template::{Template, TemplateStatus, TemplateSummary};
use cadence_core::rubric::ScoreMaps;

use crate::error::BuilderError;

/// Where the builder is in its navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    NoFramework,
    FrameworkSelected {
        type_code: String,
    },
    TemplateSelected {
        type_code: String,
        template_id: EntityId,
        status: TemplateStatus,
    },
}

/// Which dimension's questions the card list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DimensionFilter {
    #[default]
    All,
    Dimension(EntityId),
}

impl DimensionFilter {
    pub fn dimension_id(self) -> Option<EntityId> {
        match self {
            DimensionFilter::All => None,
            DimensionFilter::Dimension(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectedType {
    pub id: EntityId,
    pub code: String,
}

#[derive(Debug, Default)]
pub(crate) struct BuilderState {
    pub frameworks: Vec<AssessmentType>,
    pub selected_type: Option<SelectedType>,
    pub templates: Vec<TemplateSummary>,
    pub selected_template_id: Option<EntityId>,
    pub template: Option<Template>,
    pub expanded: HashSet<EntityId>,
    pub dimension_filter: DimensionFilter,
    pub active_edit_warning_shown: bool,
    /// Question whose text field should take focus after creation.
    pub editing_text: Option<EntityId>,
    /// Score maps sent but not yet acknowledged, so concurrent cell saves
    /// on one question build on each other instead of on stale data.
    pub pending_scores: HashMap<EntityId, ScoreMaps>,
}

impl BuilderState {
    pub fn phase(&self) -> Phase {
        match (&self.selected_type, &self.template) {
            (None, _) => Phase::NoFramework,
            (Some(selected), None) => Phase::FrameworkSelected {
                type_code: selected.code.clone(),
            },
            (Some(selected), Some(template)) => Phase::TemplateSelected {
                type_code: selected.code.clone(),
                template_id: template.id,
                status: template.status,
            },
        }
    }

    pub fn is_draft(&self) -> bool {
        self.template.as_ref().is_some_and(Template::is_draft)
    }

    pub fn current(&self) -> Result<&Template, BuilderError> {
        self.template.as_ref().ok_or(BuilderError::NoTemplate)
    }

    pub fn current_mut(&mut self) -> Result<&mut Template, BuilderError> {
        self.template.as_mut().ok_or(BuilderError::NoTemplate)
    }

    /// Current template, required to be a draft.
    pub fn draft(&self) -> Result<&Template, BuilderError> {
        let template = self.current()?;
        if !template.is_draft() {
            return Err(BuilderError::NotDraft {
                template_id: template.id,
            });
        }
        Ok(template)
    }

    /// Snapshot for `template_id`, if it is still the one on screen.
    pub fn snapshot_for(&mut self, template_id: EntityId) -> Option<&mut Template> {
        self.template.as_mut().filter(|t| t.id == template_id)
    }

    /// Record an edit attempt. Returns the template id the first time an
    /// edit is attempted on a non-draft template.
    pub fn note_edit_attempt(&mut self) -> Option<EntityId> {
        let template = self.template.as_ref()?;
        if template.is_draft() || self.active_edit_warning_shown {
            return None;
        }
        self.active_edit_warning_shown = true;
        Some(template.id)
    }

    /// Clear per-template UI state when a different template is shown.
    pub fn reset_transient(&mut self) {
        self.expanded.clear();
        self.dimension_filter = DimensionFilter::All;
        self.active_edit_warning_shown = false;
        self.editing_text = None;
        self.pending_scores.clear();
    }
}
