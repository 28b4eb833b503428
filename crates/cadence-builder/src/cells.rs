//! Rubric cell editing.
//!
//! A cell is one (question, score level, field) slot of the rubric grid.
//! [`CellEditor`] holds the text being typed and interprets keys; the
//! builder opens and commits cells. A commit sends all three score maps of
//! the question in one request and always goes to the scores endpoint,
//! whatever the template's status.

use serde::Serialize;
use tracing::{debug, info};

use cadence_core::models::EntityId;
use cadence_core::rubric::{self, Completeness, RubricField};

use crate::controller::TemplateBuilder;
use crate::error::BuilderError;
use crate::events::BuilderEvent;
use crate::routing::{self, EditField, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellAddress {
    pub question_id: EntityId,
    pub level: i32,
    pub field: RubricField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKey {
    Enter { shift: bool },
    Escape,
    /// Focus left the cell.
    Blur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAction {
    /// Keep editing.
    Continue,
    /// Save the current value.
    Commit,
    /// Discard the edit; the cell shows its previous text.
    Revert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellCommit {
    /// Trimmed value equals the previous text; nothing was sent.
    Unchanged,
    Saved(Completeness),
}

/// In-progress edit of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEditor {
    address: CellAddress,
    original: String,
    value: String,
}

impl CellEditor {
    pub fn address(&self) -> CellAddress {
        self.address
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Descriptions and evidence take several lines, labels one.
    pub fn is_multiline(&self) -> bool {
        self.address.field.is_multiline()
    }

    pub fn is_changed(&self) -> bool {
        self.value.trim() != self.original
    }

    /// Enter commits a single-line cell; Shift+Enter adds a line to a
    /// multi-line one. Escape restores the previous text. Blur commits.
    pub fn handle_key(&mut self, key: CellKey) -> CellAction {
        match key {
            CellKey::Escape => {
                self.value = self.original.clone();
                CellAction::Revert
            }
            CellKey::Enter { shift: true } if self.is_multiline() => {
                self.value.push('\n');
                CellAction::Continue
            }
            CellKey::Enter { .. } | CellKey::Blur => CellAction::Commit,
        }
    }
}

impl TemplateBuilder {
    /// Begin editing a cell. The editor starts from the latest text,
    /// including saves that are still in flight.
    pub async fn open_cell(&self, address: CellAddress) -> Result<CellEditor, BuilderError> {
        let mut state = self.state().await;
        let warning = state.note_edit_attempt();
        self.emit_warning(warning);

        let question = state
            .current()?
            .question(address.question_id)
            .ok_or(BuilderError::UnknownQuestion(address.question_id))?;
        if !question.score_levels().contains(&address.level) {
            return Err(BuilderError::Validation(format!(
                "score level {} is outside {}..={}",
                address.level, question.min_score, question.max_score
            )));
        }

        let original = match state.pending_scores.get(&address.question_id) {
            Some(pending) => pending.cell(address.level, address.field).to_string(),
            None => question.cell(address.level, address.field).to_string(),
        };
        Ok(CellEditor {
            address,
            value: original.clone(),
            original,
        })
    }

    /// Save a cell. An unchanged value sends nothing.
    pub async fn commit_cell(&self, editor: &CellEditor) -> Result<CellCommit, BuilderError> {
        if !editor.is_changed() {
            debug!(question_id = editor.address.question_id, "cell unchanged, not saving");
            return Ok(CellCommit::Unchanged);
        }
        let CellAddress {
            question_id,
            level,
            field,
        } = editor.address;
        let value = editor.value.trim();

        let (template_id, maps) = {
            let mut state = self.state().await;
            let template = state.current()?;
            let route = routing::route(template.status, EditField::Rubric(field));
            if route != Route::Scores {
                return Err(BuilderError::Rejected {
                    field: EditField::Rubric(field),
                    status: template.status,
                });
            }
            let template_id = template.id;
            let question = template
                .question(question_id)
                .ok_or(BuilderError::UnknownQuestion(question_id))?;
            if !question.score_levels().contains(&level) {
                return Err(BuilderError::Validation(format!(
                    "score level {level} is outside {}..={}",
                    question.min_score, question.max_score
                )));
            }

            let maps = match state.pending_scores.get(&question_id) {
                Some(pending) => pending.with_cell(level, field, value),
                None => question.score_maps().with_cell(level, field, value),
            };
            state.pending_scores.insert(question_id, maps.clone());
            (template_id, maps)
        };

        let guard = self.saves.begin();
        let saved = self
            .call(
                "update_question_scores",
                self.api.update_question_scores(question_id, maps.clone()),
            )
            .await;

        let completeness = {
            let mut state = self.state().await;
            if state.pending_scores.get(&question_id) == Some(&maps) {
                state.pending_scores.remove(&question_id);
            }
            match saved {
                Ok(question) => match state
                    .snapshot_for(template_id)
                    .and_then(|template| template.question_mut(question_id))
                {
                    Some(slot) => {
                        slot.set_score_maps(question.score_maps());
                        rubric::completeness(slot)
                    }
                    None => rubric::completeness(&question),
                },
                Err(e) => {
                    drop(state);
                    guard.fail(e.to_string());
                    return Err(e);
                }
            }
        };

        info!(question_id, level, %field, %completeness, "rubric cell saved");
        self.emit(BuilderEvent::CompletenessChanged {
            question_id,
            completeness,
        });
        drop(guard);
        Ok(CellCommit::Saved(completeness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(field: RubricField, original: &str) -> CellEditor {
        CellEditor {
            address: CellAddress {
                question_id: 7,
                level: 3,
                field,
            },
            original: original.to_string(),
            value: original.to_string(),
        }
    }

    #[test]
    fn enter_commits_label() {
        let mut cell = editor(RubricField::Label, "Fair");
        assert_eq!(cell.handle_key(CellKey::Enter { shift: true }), CellAction::Commit);
        assert_eq!(cell.value(), "Fair");
    }

    #[test]
    fn shift_enter_adds_line_to_description() {
        let mut cell = editor(RubricField::Description, "Line one");
        assert_eq!(cell.handle_key(CellKey::Enter { shift: true }), CellAction::Continue);
        assert_eq!(cell.value(), "Line one\n");
        assert_eq!(cell.handle_key(CellKey::Enter { shift: false }), CellAction::Commit);
    }

    #[test]
    fn escape_restores_previous_text() {
        let mut cell = editor(RubricField::Evidence, "Cites sources");
        cell.set_value("something else");
        assert_eq!(cell.handle_key(CellKey::Escape), CellAction::Revert);
        assert_eq!(cell.value(), "Cites sources");
        assert!(!cell.is_changed());
    }

    #[test]
    fn whitespace_only_change_is_unchanged() {
        let mut cell = editor(RubricField::Label, "Good");
        cell.set_value("  Good \n");
        assert!(!cell.is_changed());
        assert_eq!(cell.handle_key(CellKey::Blur), CellAction::Commit);
    }
}
