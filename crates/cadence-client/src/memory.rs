//! In-process [`TemplateApi`] backend.
//!
//! Holds full templates in memory and enforces the guarantees the builder
//! relies on from a real server:
//!
//! - at most one active template per framework (promotion archives the
//!   previous one)
//! - general edits and structural changes only on drafts; minor edits and
//!   rubric scores on any status
//! - deleting a dimension deletes its questions
//! - cloning deep-copies dimensions and questions with fresh ids
//! - every accepted change appends an audit entry

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use cadence_core::models::EntityId;
use cadence_core::models::audit::{AuditEntry, ChangedBy};
use cadence_core::models::dimension::Dimension;
use cadence_core::models::framework::AssessmentType;
use cadence_core::models::question::Question;
use cadence_core::models::template::{Template, TemplateStatus, TemplateSummary};
use cadence_core::rubric::{self, ScoreMaps};

use crate::api::{BoxFuture, TemplateApi};
use crate::error::ClientError;
use crate::payload::{
    CloneTemplate, DimensionPatch, MinorQuestionPatch, NewDimension, NewQuestion, NewTemplate,
    QuestionOrder, QuestionPatch, TemplatePatch,
};

#[derive(Clone, Default)]
pub struct MemoryTemplateApi {
    store: Arc<Mutex<Store>>,
}

#[derive(Default)]
struct Store {
    next_id: EntityId,
    types: Vec<AssessmentType>,
    templates: Vec<Template>,
    audit: Vec<(EntityId, AuditEntry)>,
    actor: Option<ChangedBy>,
}

impl MemoryTemplateApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a framework. Templates may only be created for known codes.
    pub fn add_assessment_type(&self, assessment_type: AssessmentType) {
        let mut store = self.lock();
        store.bump_past(assessment_type.id);
        store.types.push(assessment_type);
    }

    /// Seed a template as-is, ids included.
    pub fn insert_template(&self, template: Template) {
        let mut store = self.lock();
        store.bump_past(template.id);
        for d in &template.dimensions {
            store.bump_past(d.id);
        }
        for q in &template.questions {
            store.bump_past(q.id);
        }
        store.templates.push(template);
    }

    /// Attribute subsequent audit entries to this user.
    pub fn set_actor(&self, first_name: &str, last_name: &str) {
        self.lock().actor = Some(ChangedBy {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        });
    }

    /// Server-side copy of a template, for inspection.
    pub fn template(&self, id: EntityId) -> Option<Template> {
        self.lock().templates.iter().find(|t| t.id == id).cloned()
    }

    pub fn templates_for(&self, type_code: &str) -> Vec<Template> {
        self.lock()
            .templates
            .iter()
            .filter(|t| t.type_code == type_code)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut Store) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut store = self.lock();
        f(&mut store)
    }
}

impl Store {
    fn bump_past(&mut self, id: EntityId) {
        self.next_id = self.next_id.max(id);
    }

    fn allocate(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    fn record(
        &mut self,
        template_id: EntityId,
        entity_type: &str,
        field_name: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        let entry = AuditEntry {
            changed_at: jiff::Timestamp::now(),
            changed_by: self.actor.clone(),
            entity_type: entity_type.to_string(),
            field_name: field_name.to_string(),
            old_value,
            new_value,
        };
        self.audit.push((template_id, entry));
    }

    fn template_mut(&mut self, id: EntityId) -> Result<&mut Template, ClientError> {
        self.templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ClientError::not_found("assessment-templates", id))
    }

    fn draft_mut(&mut self, id: EntityId) -> Result<&mut Template, ClientError> {
        let template = self.template_mut(id)?;
        require_draft(template)?;
        Ok(template)
    }

    fn owner_of_dimension(&self, dimension_id: EntityId) -> Result<EntityId, ClientError> {
        self.templates
            .iter()
            .find(|t| t.dimensions.iter().any(|d| d.id == dimension_id))
            .map(|t| t.id)
            .ok_or_else(|| ClientError::not_found("assessment-dimensions", dimension_id))
    }

    fn owner_of_question(&self, question_id: EntityId) -> Result<EntityId, ClientError> {
        self.templates
            .iter()
            .find(|t| t.questions.iter().any(|q| q.id == question_id))
            .map(|t| t.id)
            .ok_or_else(|| ClientError::not_found("assessment-questions", question_id))
    }

    fn touch(&mut self, template_id: EntityId) -> Result<(), ClientError> {
        self.template_mut(template_id)?.updated_at = Some(jiff::Timestamp::now());
        Ok(())
    }
}

fn require_draft(template: &Template) -> Result<(), ClientError> {
    if template.is_draft() {
        Ok(())
    } else {
        Err(ClientError::conflict(format!(
            "template {} is {}; only drafts accept this change",
            template.id, template.status
        )))
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        Err(ClientError::bad_request(format!("{field} must not be blank")))
    } else {
        Ok(())
    }
}

fn question_in(template: &mut Template, id: EntityId) -> Result<&mut Question, ClientError> {
    template
        .question_mut(id)
        .ok_or_else(|| ClientError::not_found("assessment-questions", id))
}

fn set_field<T: PartialEq + ToString>(
    changes: &mut Vec<(&'static str, Option<String>, Option<String>)>,
    name: &'static str,
    slot: &mut T,
    value: Option<T>,
) {
    if let Some(value) = value
        && *slot != value
    {
        changes.push((name, Some(slot.to_string()), Some(value.to_string())));
        *slot = value;
    }
}

impl TemplateApi for MemoryTemplateApi {
    fn list_assessment_types(&self) -> BoxFuture<'_, Result<Vec<AssessmentType>, ClientError>> {
        Box::pin(async move { self.with_store(|s| Ok(s.types.clone())) })
    }

    fn list_templates(
        &self,
        type_code: String,
    ) -> BoxFuture<'_, Result<Vec<TemplateSummary>, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                Ok(s.templates
                    .iter()
                    .filter(|t| t.type_code == type_code)
                    .map(Template::summary)
                    .collect())
            })
        })
    }

    fn get_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move { self.with_store(|s| s.template_mut(id).map(|t| t.clone())) })
    }

    fn create_template(&self, body: NewTemplate) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                require_text("name", &body.name)?;
                require_text("version", &body.version)?;
                if !s.types.iter().any(|t| t.code == body.type_code) {
                    return Err(ClientError::bad_request(format!(
                        "unknown assessment type '{}'",
                        body.type_code
                    )));
                }

                let template = Template {
                    id: s.allocate(),
                    type_code: body.type_code,
                    name: body.name,
                    description: body.description,
                    version: body.version,
                    status: TemplateStatus::Draft,
                    dimensions: Vec::new(),
                    questions: Vec::new(),
                    updated_at: Some(jiff::Timestamp::now()),
                };
                s.record(
                    template.id,
                    "template",
                    "created",
                    None,
                    Some(template.version.clone()),
                );
                s.templates.push(template.clone());
                debug!(template_id = template.id, "template created");
                Ok(template)
            })
        })
    }

    fn update_template(
        &self,
        id: EntityId,
        patch: TemplatePatch,
    ) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                if let Some(name) = &patch.name {
                    require_text("name", name)?;
                }
                let template = s.draft_mut(id)?;
                let mut changes = Vec::new();
                set_field(&mut changes, "name", &mut template.name, patch.name);
                if let Some(description) = patch.description
                    && template.description.as_deref() != Some(description.as_str())
                {
                    changes.push((
                        "description",
                        template.description.clone(),
                        Some(description.clone()),
                    ));
                    template.description = Some(description);
                }
                for (field, old, new) in changes {
                    s.record(id, "template", field, old, new);
                }
                s.touch(id)?;
                s.template_mut(id).map(|t| t.clone())
            })
        })
    }

    fn delete_template(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let before = s.templates.len();
                s.templates.retain(|t| t.id != id);
                if s.templates.len() == before {
                    return Err(ClientError::not_found("assessment-templates", id));
                }
                s.audit.retain(|(template_id, _)| *template_id != id);
                Ok(())
            })
        })
    }

    fn clone_template(
        &self,
        source_id: EntityId,
        body: CloneTemplate,
    ) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                require_text("new_version", &body.new_version)?;
                let source = s.template_mut(source_id)?.clone();
                if s
                    .templates
                    .iter()
                    .any(|t| t.type_code == source.type_code && t.version == body.new_version)
                {
                    return Err(ClientError::conflict(format!(
                        "version '{}' already exists for '{}'",
                        body.new_version, source.type_code
                    )));
                }

                let template_id = s.allocate();
                let mut dimensions = Vec::with_capacity(source.dimensions.len());
                let mut id_map = Vec::with_capacity(source.dimensions.len());
                for d in &source.dimensions {
                    let new_id = s.allocate();
                    id_map.push((d.id, new_id));
                    dimensions.push(Dimension {
                        id: new_id,
                        template_id,
                        ..d.clone()
                    });
                }

                let mut questions = Vec::with_capacity(source.questions.len());
                for q in &source.questions {
                    let dimension_id = id_map
                        .iter()
                        .find(|(old, _)| *old == q.dimension_id)
                        .map(|(_, new)| *new)
                        .unwrap_or(q.dimension_id);
                    questions.push(Question {
                        id: s.allocate(),
                        dimension_id,
                        ..q.clone()
                    });
                }

                let template = Template {
                    id: template_id,
                    version: body.new_version,
                    status: TemplateStatus::Draft,
                    dimensions,
                    questions,
                    updated_at: Some(jiff::Timestamp::now()),
                    ..source
                };
                s.record(
                    template_id,
                    "template",
                    "cloned_from",
                    None,
                    Some(source_id.to_string()),
                );
                s.templates.push(template.clone());
                debug!(source_id, template_id, "template cloned");
                Ok(template)
            })
        })
    }

    fn promote_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let type_code = s.draft_mut(id)?.type_code.clone();

                let demoted: Vec<EntityId> = s
                    .templates
                    .iter_mut()
                    .filter(|t| t.type_code == type_code && t.status == TemplateStatus::Active)
                    .map(|t| {
                        t.status = TemplateStatus::Archived;
                        t.id
                    })
                    .collect();
                for previous in demoted {
                    s.record(
                        previous,
                        "template",
                        "status",
                        Some(TemplateStatus::Active.to_string()),
                        Some(TemplateStatus::Archived.to_string()),
                    );
                }

                s.template_mut(id)?.status = TemplateStatus::Active;
                s.record(
                    id,
                    "template",
                    "status",
                    Some(TemplateStatus::Draft.to_string()),
                    Some(TemplateStatus::Active.to_string()),
                );
                s.touch(id)?;
                s.template_mut(id).map(|t| t.clone())
            })
        })
    }

    fn create_dimension(
        &self,
        template_id: EntityId,
        body: NewDimension,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                require_text("name", &body.name)?;
                s.draft_mut(template_id)?;
                let dimension = Dimension {
                    id: s.allocate(),
                    template_id,
                    name: body.name,
                    description: body.description,
                    weight: body.weight,
                    display_order: body.display_order,
                };
                s.template_mut(template_id)?.dimensions.push(dimension.clone());
                s.record(
                    template_id,
                    "dimension",
                    "created",
                    None,
                    Some(dimension.name.clone()),
                );
                s.touch(template_id)?;
                Ok(dimension)
            })
        })
    }

    fn update_dimension(
        &self,
        id: EntityId,
        patch: DimensionPatch,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                if let Some(name) = &patch.name {
                    require_text("name", name)?;
                }
                let template_id = s.owner_of_dimension(id)?;
                let template = s.draft_mut(template_id)?;
                let dimension = template
                    .dimensions
                    .iter_mut()
                    .find(|d| d.id == id)
                    .ok_or_else(|| ClientError::not_found("assessment-dimensions", id))?;

                let mut changes = Vec::new();
                set_field(&mut changes, "name", &mut dimension.name, patch.name);
                set_field(&mut changes, "weight", &mut dimension.weight, patch.weight);
                set_field(
                    &mut changes,
                    "display_order",
                    &mut dimension.display_order,
                    patch.display_order,
                );
                if let Some(description) = patch.description {
                    changes.push((
                        "description",
                        dimension.description.clone(),
                        Some(description.clone()),
                    ));
                    dimension.description = Some(description);
                }
                let updated = dimension.clone();

                for (field, old, new) in changes {
                    s.record(template_id, "dimension", field, old, new);
                }
                s.touch(template_id)?;
                Ok(updated)
            })
        })
    }

    fn delete_dimension(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let template_id = s.owner_of_dimension(id)?;
                let template = s.draft_mut(template_id)?;
                let name = template
                    .dimension(id)
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                template.dimensions.retain(|d| d.id != id);
                template.questions.retain(|q| q.dimension_id != id);
                s.record(template_id, "dimension", "deleted", Some(name), None);
                s.touch(template_id)
            })
        })
    }

    fn create_question(
        &self,
        template_id: EntityId,
        body: NewQuestion,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                rubric::validate_range(body.min_score, body.max_score)
                    .map_err(|e| ClientError::bad_request(e.to_string()))?;
                let template = s.draft_mut(template_id)?;
                if template.dimension(body.dimension_id).is_none() {
                    return Err(ClientError::bad_request(format!(
                        "dimension {} does not belong to template {template_id}",
                        body.dimension_id
                    )));
                }

                let question = Question {
                    id: s.allocate(),
                    dimension_id: body.dimension_id,
                    question_number: body.question_number,
                    question_text: body.question_text,
                    display_order: body.display_order,
                    is_required: body.is_required,
                    min_score: body.min_score,
                    max_score: body.max_score,
                    score_labels: Default::default(),
                    score_descriptions: Default::default(),
                    score_evidence: Default::default(),
                };
                s.template_mut(template_id)?.questions.push(question.clone());
                s.record(
                    template_id,
                    "question",
                    "created",
                    None,
                    Some(question.question_number.clone()),
                );
                s.touch(template_id)?;
                Ok(question)
            })
        })
    }

    fn update_question(
        &self,
        id: EntityId,
        patch: QuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let template_id = s.owner_of_question(id)?;
                let template = s.draft_mut(template_id)?;
                if let Some(dimension_id) = patch.dimension_id
                    && template.dimension(dimension_id).is_none()
                {
                    return Err(ClientError::bad_request(format!(
                        "dimension {dimension_id} does not belong to template {template_id}"
                    )));
                }

                let question = question_in(template, id)?;
                let min = patch.min_score.unwrap_or(question.min_score);
                let max = patch.max_score.unwrap_or(question.max_score);
                rubric::validate_range(min, max)
                    .map_err(|e| ClientError::bad_request(e.to_string()))?;

                let mut changes = Vec::new();
                set_field(
                    &mut changes,
                    "question_text",
                    &mut question.question_text,
                    patch.question_text,
                );
                set_field(
                    &mut changes,
                    "question_number",
                    &mut question.question_number,
                    patch.question_number,
                );
                set_field(
                    &mut changes,
                    "is_required",
                    &mut question.is_required,
                    patch.is_required,
                );
                set_field(
                    &mut changes,
                    "display_order",
                    &mut question.display_order,
                    patch.display_order,
                );
                set_field(&mut changes, "min_score", &mut question.min_score, patch.min_score);
                set_field(&mut changes, "max_score", &mut question.max_score, patch.max_score);
                set_field(
                    &mut changes,
                    "dimension_id",
                    &mut question.dimension_id,
                    patch.dimension_id,
                );
                let updated = question.clone();

                for (field, old, new) in changes {
                    s.record(template_id, "question", field, old, new);
                }
                s.touch(template_id)?;
                Ok(updated)
            })
        })
    }

    fn update_question_minor(
        &self,
        id: EntityId,
        patch: MinorQuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let template_id = s.owner_of_question(id)?;
                let question = question_in(s.template_mut(template_id)?, id)?;

                let mut changes = Vec::new();
                set_field(
                    &mut changes,
                    "question_text",
                    &mut question.question_text,
                    patch.question_text,
                );
                set_field(
                    &mut changes,
                    "question_number",
                    &mut question.question_number,
                    patch.question_number,
                );
                let updated = question.clone();

                for (field, old, new) in changes {
                    s.record(template_id, "question", field, old, new);
                }
                s.touch(template_id)?;
                Ok(updated)
            })
        })
    }

    fn update_question_scores(
        &self,
        id: EntityId,
        scores: ScoreMaps,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let template_id = s.owner_of_question(id)?;
                let question = question_in(s.template_mut(template_id)?, id)?;
                question.set_score_maps(scores);
                let updated = question.clone();
                s.record(
                    template_id,
                    "question",
                    "scores",
                    None,
                    Some(updated.question_number.clone()),
                );
                s.touch(template_id)?;
                Ok(updated)
            })
        })
    }

    fn delete_question(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let template_id = s.owner_of_question(id)?;
                let template = s.draft_mut(template_id)?;
                let number = template
                    .question(id)
                    .map(|q| q.question_number.clone())
                    .unwrap_or_default();
                template.questions.retain(|q| q.id != id);
                s.record(template_id, "question", "deleted", Some(number), None);
                s.touch(template_id)
            })
        })
    }

    fn reorder_questions(
        &self,
        template_id: EntityId,
        orders: Vec<QuestionOrder>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                let template = s.draft_mut(template_id)?;
                if let Some(stray) = orders.iter().find(|o| template.question(o.id).is_none()) {
                    return Err(ClientError::bad_request(format!(
                        "question {} does not belong to template {template_id}",
                        stray.id
                    )));
                }
                for order in &orders {
                    if let Some(question) = template.question_mut(order.id) {
                        question.display_order = order.display_order;
                    }
                }
                s.record(
                    template_id,
                    "question",
                    "display_order",
                    None,
                    Some(format!("{} questions reordered", orders.len())),
                );
                s.touch(template_id)
            })
        })
    }

    fn list_audit(
        &self,
        template_id: EntityId,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, ClientError>> {
        Box::pin(async move {
            self.with_store(|s| {
                s.template_mut(template_id)?;
                Ok(s.audit
                    .iter()
                    .rev()
                    .filter(|(id, _)| *id == template_id)
                    .take(limit)
                    .map(|(_, entry)| entry.clone())
                    .collect())
            })
        })
    }
}
