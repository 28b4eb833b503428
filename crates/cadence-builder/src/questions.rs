//! Question cards: expansion, dimension filter, add/delete, field edits
//! and drag-and-drop reordering.

use std::collections::HashSet;

use tracing::{info, warn};

use cadence_client::payload::{MinorQuestionPatch, NewQuestion, QuestionOrder, QuestionPatch};
use cadence_core::models::EntityId;
use cadence_core::models::question::{DEFAULT_MAX_SCORE, DEFAULT_MIN_SCORE, Question};
use cadence_core::rubric;

use crate::controller::TemplateBuilder;
use crate::error::BuilderError;
use crate::events::BuilderEvent;
use crate::routing::{self, EditField, QuestionField, Route};
use crate::state::DimensionFilter;

/// A single-field question edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionEdit {
    Text(String),
    Number(String),
    Required(bool),
    MinScore(i32),
    MaxScore(i32),
    Dimension(EntityId),
}

impl QuestionEdit {
    pub fn field(&self) -> QuestionField {
        match self {
            QuestionEdit::Text(_) => QuestionField::Text,
            QuestionEdit::Number(_) => QuestionField::Number,
            QuestionEdit::Required(_) => QuestionField::IsRequired,
            QuestionEdit::MinScore(_) => QuestionField::MinScore,
            QuestionEdit::MaxScore(_) => QuestionField::MaxScore,
            QuestionEdit::Dimension(_) => QuestionField::Dimension,
        }
    }

    fn normalized(self) -> Result<Self, BuilderError> {
        Ok(match self {
            QuestionEdit::Text(text) => QuestionEdit::Text(text.trim().to_string()),
            QuestionEdit::Number(number) => {
                let number = number.trim();
                if number.is_empty() {
                    return Err(BuilderError::Validation(
                        "question number is required".to_string(),
                    ));
                }
                QuestionEdit::Number(number.to_string())
            }
            other => other,
        })
    }

    fn matches(&self, question: &Question) -> bool {
        match self {
            QuestionEdit::Text(text) => question.question_text == *text,
            QuestionEdit::Number(number) => question.question_number == *number,
            QuestionEdit::Required(required) => question.is_required == *required,
            QuestionEdit::MinScore(min) => question.min_score == *min,
            QuestionEdit::MaxScore(max) => question.max_score == *max,
            QuestionEdit::Dimension(id) => question.dimension_id == *id,
        }
    }

    fn general_patch(&self) -> QuestionPatch {
        let mut patch = QuestionPatch::default();
        match self {
            QuestionEdit::Text(text) => patch.question_text = Some(text.clone()),
            QuestionEdit::Number(number) => patch.question_number = Some(number.clone()),
            QuestionEdit::Required(required) => patch.is_required = Some(*required),
            QuestionEdit::MinScore(min) => patch.min_score = Some(*min),
            QuestionEdit::MaxScore(max) => patch.max_score = Some(*max),
            QuestionEdit::Dimension(id) => patch.dimension_id = Some(*id),
        }
        patch
    }

    fn minor_patch(&self) -> MinorQuestionPatch {
        let mut patch = MinorQuestionPatch::default();
        match self {
            QuestionEdit::Text(text) => patch.question_text = Some(text.clone()),
            QuestionEdit::Number(number) => patch.question_number = Some(number.clone()),
            _ => {}
        }
        patch
    }

    /// Copy the field this edit touched from the server's copy. Other
    /// fields, the score maps in particular, may have been saved by a
    /// concurrent request and stay as they are.
    fn merge_into(&self, acknowledged: &Question, slot: &mut Question) {
        match self {
            QuestionEdit::Text(_) => slot.question_text.clone_from(&acknowledged.question_text),
            QuestionEdit::Number(_) => slot.question_number.clone_from(&acknowledged.question_number),
            QuestionEdit::Required(_) => slot.is_required = acknowledged.is_required,
            QuestionEdit::MinScore(_) | QuestionEdit::MaxScore(_) => {
                slot.min_score = acknowledged.min_score;
                slot.max_score = acknowledged.max_score;
            }
            QuestionEdit::Dimension(_) => slot.dimension_id = acknowledged.dimension_id,
        }
    }

    fn changes_range(&self) -> bool {
        matches!(self, QuestionEdit::MinScore(_) | QuestionEdit::MaxScore(_))
    }
}

/// Number for the next question in a dimension: `"{dimension}.{question}"`,
/// both 1-based.
pub fn next_question_number(dimension_index: usize, existing: usize) -> String {
    format!("{}.{}", dimension_index + 1, existing + 1)
}

/// Order after dragging `dragged` onto position `target` of `order`.
/// A target past the end moves the item last; an unknown id leaves the
/// order unchanged.
pub fn drop_order(order: &[EntityId], dragged: EntityId, target: usize) -> Vec<EntityId> {
    let mut next: Vec<EntityId> = order.to_vec();
    let Some(from) = next.iter().position(|id| *id == dragged) else {
        return next;
    };
    next.remove(from);
    let target = target.min(next.len());
    next.insert(target, dragged);
    next
}

fn check_permutation(visible: &[EntityId], ordered: &[EntityId]) -> Result<(), BuilderError> {
    let expected: HashSet<EntityId> = visible.iter().copied().collect();
    let given: HashSet<EntityId> = ordered.iter().copied().collect();
    if ordered.len() != visible.len() || given.len() != ordered.len() || given != expected {
        return Err(BuilderError::Validation(
            "new order must list every visible question exactly once".to_string(),
        ));
    }
    Ok(())
}

impl TemplateBuilder {
    // ── Card UI state ───────────────────────────────────────────────────────

    pub async fn expanded_questions(&self) -> HashSet<EntityId> {
        self.state().await.expanded.clone()
    }

    pub async fn is_expanded(&self, question_id: EntityId) -> bool {
        self.state().await.expanded.contains(&question_id)
    }

    pub async fn expand_question(&self, question_id: EntityId) -> Result<(), BuilderError> {
        let mut state = self.state().await;
        state
            .current()?
            .question(question_id)
            .ok_or(BuilderError::UnknownQuestion(question_id))?;
        state.expanded.insert(question_id);
        Ok(())
    }

    pub async fn collapse_question(&self, question_id: EntityId) {
        self.state().await.expanded.remove(&question_id);
    }

    /// Flip a card. Returns whether it is now expanded.
    pub async fn toggle_question(&self, question_id: EntityId) -> Result<bool, BuilderError> {
        let mut state = self.state().await;
        state
            .current()?
            .question(question_id)
            .ok_or(BuilderError::UnknownQuestion(question_id))?;
        if state.expanded.remove(&question_id) {
            Ok(false)
        } else {
            state.expanded.insert(question_id);
            Ok(true)
        }
    }

    /// Question whose text field should get focus, consumed on read.
    pub async fn take_text_focus(&self) -> Option<EntityId> {
        self.state().await.editing_text.take()
    }

    pub async fn dimension_filter(&self) -> DimensionFilter {
        self.state().await.dimension_filter
    }

    pub async fn set_dimension_filter(&self, filter: DimensionFilter) -> Result<(), BuilderError> {
        {
            let mut state = self.state().await;
            let template = state.current()?;
            if let DimensionFilter::Dimension(id) = filter
                && template.dimension(id).is_none()
            {
                return Err(BuilderError::UnknownDimension(id));
            }
            state.dimension_filter = filter;
        }
        self.emit(BuilderEvent::DimensionFilterChanged { filter });
        Ok(())
    }

    /// Questions shown under the current filter, in display order.
    pub async fn visible_questions(&self) -> Vec<Question> {
        let state = self.state().await;
        let filter = state.dimension_filter.dimension_id();
        state
            .template
            .as_ref()
            .map(|t| t.ordered_questions(filter).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    // ── Structure ───────────────────────────────────────────────────────────

    /// Add a blank question to the filtered dimension. The new card opens
    /// expanded with its text field focused.
    pub async fn add_question(&self) -> Result<Question, BuilderError> {
        let (template_id, body) = {
            let state = self.state().await;
            let template = state.draft()?;
            let dimension_id = state.dimension_filter.dimension_id().ok_or_else(|| {
                BuilderError::Validation("select a dimension before adding a question".to_string())
            })?;
            let index = template
                .dimension_index(dimension_id)
                .ok_or(BuilderError::UnknownDimension(dimension_id))?;

            let body = NewQuestion {
                dimension_id,
                question_number: next_question_number(index, template.question_count(dimension_id)),
                question_text: String::new(),
                display_order: template.max_question_order().map_or(0, |max| max + 1),
                is_required: false,
                min_score: DEFAULT_MIN_SCORE,
                max_score: DEFAULT_MAX_SCORE,
            };
            (template.id, body)
        };

        let question = self
            .call("create_question", self.api.create_question(template_id, body))
            .await?;
        info!(
            template_id,
            question_id = question.id,
            number = %question.question_number,
            "question added"
        );

        {
            let mut state = self.state().await;
            if let Some(template) = state.snapshot_for(template_id) {
                template.questions.push(question.clone());
                state.expanded.insert(question.id);
                state.editing_text = Some(question.id);
            }
        }
        self.emit(BuilderEvent::QuestionAdded {
            question_id: question.id,
        });
        self.emit(BuilderEvent::FocusQuestionText {
            question_id: question.id,
        });
        Ok(question)
    }

    pub async fn delete_question(&self, question_id: EntityId) -> Result<(), BuilderError> {
        let prompt = {
            let state = self.state().await;
            let question = state
                .draft()?
                .question(question_id)
                .ok_or(BuilderError::UnknownQuestion(question_id))?;
            format!(
                "Delete question {}? This cannot be undone.",
                question.question_number
            )
        };
        self.require_confirmation(&prompt).await?;

        self.call("delete_question", self.api.delete_question(question_id))
            .await?;
        info!(question_id, "question deleted");

        {
            let mut state = self.state().await;
            if let Ok(template) = state.current_mut() {
                template.questions.retain(|q| q.id != question_id);
            }
            state.expanded.remove(&question_id);
            state.pending_scores.remove(&question_id);
            if state.editing_text == Some(question_id) {
                state.editing_text = None;
            }
        }
        self.emit(BuilderEvent::QuestionRemoved { question_id });
        self.refresh_after("delete_question", None).await;
        Ok(())
    }

    // ── Field edits ─────────────────────────────────────────────────────────

    /// Save one question field through the endpoint the template's status
    /// allows. Edits the status forbids fail without a request.
    pub async fn edit_question(&self, question_id: EntityId, edit: QuestionEdit) -> Result<(), BuilderError> {
        let edit = edit.normalized()?;
        let field = EditField::Question(edit.field());

        let (template_id, route) = {
            let mut state = self.state().await;
            let warning = state.note_edit_attempt();
            self.emit_warning(warning);

            let template = state.current()?;
            let question = template
                .question(question_id)
                .ok_or(BuilderError::UnknownQuestion(question_id))?;

            let route = routing::route(template.status, field);
            if route == Route::Rejected {
                warn!(template_id = template.id, question_id, %field, "edit rejected by status");
                return Err(BuilderError::Rejected {
                    field,
                    status: template.status,
                });
            }
            if edit.matches(question) {
                return Ok(());
            }

            match &edit {
                QuestionEdit::Dimension(id) if template.dimension(*id).is_none() => {
                    return Err(BuilderError::UnknownDimension(*id));
                }
                QuestionEdit::MinScore(min) => rubric::validate_range(*min, question.max_score)
                    .map_err(|e| BuilderError::Validation(e.to_string()))?,
                QuestionEdit::MaxScore(max) => rubric::validate_range(question.min_score, *max)
                    .map_err(|e| BuilderError::Validation(e.to_string()))?,
                _ => {}
            }
            (template.id, route)
        };

        let guard = self.saves.begin();
        let saved = if route == Route::Minor {
            self.call(
                "update_question_minor",
                self.api.update_question_minor(question_id, edit.minor_patch()),
            )
            .await
        } else {
            self.call(
                "update_question",
                self.api.update_question(question_id, edit.general_patch()),
            )
            .await
        };
        let acknowledged = match saved {
            Ok(question) => question,
            Err(e) => {
                guard.fail(e.to_string());
                return Err(e);
            }
        };

        let completeness = {
            let mut state = self.state().await;
            match state
                .snapshot_for(template_id)
                .and_then(|template| template.question_mut(question_id))
            {
                Some(slot) => {
                    edit.merge_into(&acknowledged, slot);
                    rubric::completeness(slot)
                }
                None => rubric::completeness(&acknowledged),
            }
        };
        self.emit(BuilderEvent::QuestionUpdated { question_id });
        if edit.changes_range() {
            self.emit(BuilderEvent::CompletenessChanged {
                question_id,
                completeness,
            });
        }
        drop(guard);
        Ok(())
    }

    // ── Reordering ──────────────────────────────────────────────────────────

    /// Persist a new order for the visible questions. `ordered` must list
    /// every visible question once; they receive display orders `0..N`.
    ///
    /// The new order shows immediately. If the backend refuses it the
    /// template is reloaded so the screen matches the server again.
    pub async fn reorder_questions(&self, ordered: &[EntityId]) -> Result<Vec<QuestionOrder>, BuilderError> {
        let (template_id, orders) = {
            let mut state = self.state().await;
            let filter = state.dimension_filter.dimension_id();
            let template = state.draft()?;
            let visible: Vec<EntityId> = template
                .ordered_questions(filter)
                .iter()
                .map(|q| q.id)
                .collect();
            check_permutation(&visible, ordered)?;

            let orders: Vec<QuestionOrder> = ordered
                .iter()
                .enumerate()
                .map(|(index, id)| QuestionOrder {
                    id: *id,
                    display_order: index as i32,
                })
                .collect();

            let template = state.current_mut()?;
            for order in &orders {
                if let Some(question) = template.question_mut(order.id) {
                    question.display_order = order.display_order;
                }
            }
            (template.id, orders)
        };
        self.emit(BuilderEvent::QuestionsReordered {
            count: orders.len(),
        });

        let guard = self.saves.begin();
        let sent = self
            .call(
                "reorder_questions",
                self.api.reorder_questions(template_id, orders.clone()),
            )
            .await;
        if let Err(e) = sent {
            guard.fail(e.to_string());
            drop(guard);
            if let Err(reload) = self.reload_template().await {
                warn!(template_id, error = %reload, "reload after failed reorder also failed");
            }
            return Err(e);
        }
        info!(template_id, count = orders.len(), "questions reordered");
        drop(guard);
        Ok(orders)
    }

    /// Drag `dragged` onto position `target` of the visible list.
    pub async fn move_question(&self, dragged: EntityId, target: usize) -> Result<Vec<QuestionOrder>, BuilderError> {
        let current: Vec<EntityId> = self.visible_questions().await.iter().map(|q| q.id).collect();
        if !current.contains(&dragged) {
            return Err(BuilderError::UnknownQuestion(dragged));
        }
        let next = drop_order(&current, dragged, target);
        if next == current {
            return Ok(Vec::new());
        }
        self.reorder_questions(&next).await
    }
}
