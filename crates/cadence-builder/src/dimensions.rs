//! Dimension create/edit form and deletion.

use serde::Serialize;
use tracing::{info, warn};

use cadence_client::payload::{DimensionPatch, NewDimension};
use cadence_core::models::EntityId;
use cadence_core::models::dimension::Dimension;

use crate::controller::TemplateBuilder;
use crate::error::BuilderError;
use crate::events::BuilderEvent;
use crate::routing::{self, DimensionField, EditField, Route};
use crate::state::DimensionFilter;

/// Contents of the dimension dialog. `id` is `None` when creating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionForm {
    pub id: Option<EntityId>,
    pub name: String,
    pub description: String,
    pub weight: f64,
    pub display_order: i32,
}

impl DimensionForm {
    fn from_dimension(dimension: &Dimension) -> Self {
        Self {
            id: Some(dimension.id),
            name: dimension.name.clone(),
            description: dimension.description.clone().unwrap_or_default(),
            weight: dimension.weight,
            display_order: dimension.display_order,
        }
    }

    fn description(&self) -> Option<String> {
        let description = self.description.trim();
        (!description.is_empty()).then(|| description.to_string())
    }

    /// Fields that differ from `current`, as a patch.
    fn diff(&self, current: &Dimension) -> (DimensionPatch, Vec<DimensionField>) {
        let mut patch = DimensionPatch::default();
        let mut fields = Vec::new();

        let name = self.name.trim();
        if name != current.name {
            patch.name = Some(name.to_string());
            fields.push(DimensionField::Name);
        }
        let description = self.description();
        if description != current.description {
            patch.description = Some(description.unwrap_or_default());
            fields.push(DimensionField::Description);
        }
        if self.weight != current.weight {
            patch.weight = Some(self.weight);
            fields.push(DimensionField::Weight);
        }
        if self.display_order != current.display_order {
            patch.display_order = Some(self.display_order);
            fields.push(DimensionField::DisplayOrder);
        }
        (patch, fields)
    }
}

impl TemplateBuilder {
    /// Blank form for a new dimension, ordered after the existing ones.
    pub async fn new_dimension_form(&self) -> Result<DimensionForm, BuilderError> {
        let state = self.state().await;
        let template = state.draft()?;
        Ok(DimensionForm {
            id: None,
            name: String::new(),
            description: String::new(),
            weight: 1.0,
            display_order: template.dimensions.len() as i32,
        })
    }

    pub async fn edit_dimension_form(&self, dimension_id: EntityId) -> Result<DimensionForm, BuilderError> {
        let state = self.state().await;
        let dimension = state
            .draft()?
            .dimension(dimension_id)
            .ok_or(BuilderError::UnknownDimension(dimension_id))?;
        Ok(DimensionForm::from_dimension(dimension))
    }

    /// Create or update a dimension from the dialog, then reload.
    pub async fn submit_dimension(&self, form: DimensionForm) -> Result<Dimension, BuilderError> {
        if form.name.trim().is_empty() {
            return Err(BuilderError::Validation("dimension name is required".to_string()));
        }
        if !form.weight.is_finite() || form.weight < 0.0 {
            return Err(BuilderError::Validation(
                "weight must be a non-negative number".to_string(),
            ));
        }

        enum Request {
            Create(EntityId, NewDimension),
            Update(EntityId, DimensionPatch),
        }

        let request = {
            let mut state = self.state().await;
            let warning = state.note_edit_attempt();
            self.emit_warning(warning);
            let template = state.current()?;

            match form.id {
                None => {
                    if !template.is_draft() {
                        return Err(BuilderError::NotDraft {
                            template_id: template.id,
                        });
                    }
                    Request::Create(
                        template.id,
                        NewDimension {
                            name: form.name.trim().to_string(),
                            description: form.description(),
                            weight: form.weight,
                            display_order: form.display_order,
                        },
                    )
                }
                Some(id) => {
                    let current = template
                        .dimension(id)
                        .ok_or(BuilderError::UnknownDimension(id))?;
                    let (patch, fields) = form.diff(current);
                    for field in fields.iter().copied().map(EditField::Dimension) {
                        if routing::route(template.status, field) == Route::Rejected {
                            warn!(template_id = template.id, dimension_id = id, %field, "edit rejected by status");
                            return Err(BuilderError::Rejected {
                                field,
                                status: template.status,
                            });
                        }
                    }
                    if fields.is_empty() {
                        return Ok(current.clone());
                    }
                    Request::Update(id, patch)
                }
            }
        };

        let dimension = match request {
            Request::Create(template_id, body) => {
                let dimension = self
                    .call("create_dimension", self.api.create_dimension(template_id, body))
                    .await?;
                info!(template_id, dimension_id = dimension.id, "dimension created");
                dimension
            }
            Request::Update(id, patch) => {
                let dimension = self
                    .call("update_dimension", self.api.update_dimension(id, patch))
                    .await?;
                info!(dimension_id = id, "dimension updated");
                dimension
            }
        };

        {
            let mut state = self.state().await;
            if let Some(template) = state.snapshot_for(dimension.template_id) {
                match template.dimensions.iter_mut().find(|d| d.id == dimension.id) {
                    Some(slot) => *slot = dimension.clone(),
                    None => template.dimensions.push(dimension.clone()),
                }
            }
        }
        self.refresh_after("submit_dimension", None).await;
        Ok(dimension)
    }

    /// Delete a dimension and, on the backend, all of its questions. The
    /// confirmation prompt states how many questions go with it.
    pub async fn delete_dimension(&self, dimension_id: EntityId) -> Result<(), BuilderError> {
        let prompt = {
            let state = self.state().await;
            let template = state.draft()?;
            let dimension = template
                .dimension(dimension_id)
                .ok_or(BuilderError::UnknownDimension(dimension_id))?;
            let count = template.question_count(dimension_id);
            format!(
                "Delete dimension \"{}\"? This also deletes its {count} question{}.",
                dimension.name,
                if count == 1 { "" } else { "s" }
            )
        };
        self.require_confirmation(&prompt).await?;

        self.call("delete_dimension", self.api.delete_dimension(dimension_id))
            .await?;
        info!(dimension_id, "dimension deleted");

        {
            let mut state = self.state().await;
            if let Ok(template) = state.current_mut() {
                template.dimensions.retain(|d| d.id != dimension_id);
                template.questions.retain(|q| q.dimension_id != dimension_id);
            }
            state.dimension_filter = DimensionFilter::All;
        }
        self.emit(BuilderEvent::DimensionFilterChanged {
            filter: DimensionFilter::All,
        });
        self.refresh_after("delete_dimension", None).await;
        Ok(())
    }
}
