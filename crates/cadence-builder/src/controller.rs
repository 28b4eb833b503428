//! Template lifecycle: framework and template selection, draft creation,
//! promotion, and template metadata edits.
//!
//! All backend traffic goes through [`TemplateBuilder::call`], which bounds
//! each request by the configured timeout. The state lock is never held
//! across a backend call; results are applied to the snapshot only after
//! the backend acknowledges them, and only if the same template is still
//! on screen.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, broadcast, watch};
use tracing::{debug, info, warn};

use cadence_client::payload::{CloneTemplate, NewTemplate, TemplatePatch};
use cadence_client::{BoxFuture, ClientError, TemplateApi};
use cadence_core::models::EntityId;
use cadence_core::models::framework::AssessmentType;
use cadence_core::models::template::{Template, TemplateStatus, TemplateSummary};
use cadence_core::rubric::Completeness;

use crate::config::BuilderConfig;
use crate::confirm::Confirm;
use crate::error::BuilderError;
use crate::events::BuilderEvent;
use crate::routing::{self, EditField, Route, TemplateField};
use crate::state::{BuilderState, DimensionFilter, Phase, SelectedType};
use crate::status::{SaveStatus, SaveTracker};

pub struct TemplateBuilder {
    pub(crate) api: Arc<dyn TemplateApi>,
    confirm: Arc<dyn Confirm>,
    pub(crate) config: BuilderConfig,
    state: Mutex<BuilderState>,
    pub(crate) saves: SaveTracker,
    events: broadcast::Sender<BuilderEvent>,
}

impl TemplateBuilder {
    pub fn new(api: Arc<dyn TemplateApi>, confirm: Arc<dyn Confirm>, config: BuilderConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let saves = SaveTracker::new(events.clone());
        Self {
            api,
            confirm,
            config,
            state: Mutex::new(BuilderState::default()),
            saves,
            events,
        }
    }

    // ── Observation ─────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<BuilderEvent> {
        self.events.subscribe()
    }

    pub fn save_status(&self) -> watch::Receiver<SaveStatus> {
        self.saves.subscribe()
    }

    /// Saves currently in flight.
    pub fn pending_saves(&self) -> usize {
        self.saves.in_flight()
    }

    pub fn current_save_status(&self) -> SaveStatus {
        self.saves.current()
    }

    /// Id of the selected assessment type.
    pub async fn selected_framework(&self) -> Option<EntityId> {
        self.state().await.selected_type.as_ref().map(|t| t.id)
    }

    pub async fn phase(&self) -> Phase {
        self.state().await.phase()
    }

    pub async fn frameworks(&self) -> Vec<AssessmentType> {
        self.state().await.frameworks.clone()
    }

    pub async fn templates(&self) -> Vec<TemplateSummary> {
        self.state().await.templates.clone()
    }

    /// Copy of the working snapshot.
    pub async fn template(&self) -> Option<Template> {
        self.state().await.template.clone()
    }

    pub async fn is_draft(&self) -> bool {
        self.state().await.is_draft()
    }

    pub async fn active_edit_warning_shown(&self) -> bool {
        self.state().await.active_edit_warning_shown
    }

    pub async fn template_completeness(&self) -> Option<Completeness> {
        self.state().await.template.as_ref().map(Template::completeness)
    }

    // ── Internals shared by the other controllers ───────────────────────────

    pub(crate) async fn state(&self) -> MutexGuard<'_, BuilderState> {
        self.state.lock().await
    }

    pub(crate) fn emit(&self, event: BuilderEvent) {
        // Nobody listening is not an error.
        let _ = self.events.send(event);
    }

    pub(crate) fn emit_warning(&self, template_id: Option<EntityId>) {
        if let Some(template_id) = template_id {
            info!(template_id, "editing a template that is not a draft");
            self.emit(BuilderEvent::ActiveEditWarning { template_id });
        }
    }

    /// Run one backend call under the request timeout. Failures are logged
    /// but not published.
    async fn call_quiet<T>(
        &self,
        operation: &'static str,
        fut: BoxFuture<'_, Result<T, ClientError>>,
    ) -> Result<T, BuilderError> {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(Ok(value)) => {
                debug!(operation, "backend call ok");
                Ok(value)
            }
            Ok(Err(e)) => {
                warn!(operation, error = %e, "backend call failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "backend call timed out"
                );
                Err(BuilderError::Timeout)
            }
        }
    }

    /// Like [`call_quiet`](Self::call_quiet), and publishes failures.
    pub(crate) async fn call<T>(
        &self,
        operation: &'static str,
        fut: BoxFuture<'_, Result<T, ClientError>>,
    ) -> Result<T, BuilderError> {
        let result = self.call_quiet(operation, fut).await;
        if let Err(e) = &result {
            self.emit(BuilderEvent::Failed {
                operation,
                message: e.to_string(),
            });
        }
        result
    }

    pub(crate) async fn require_confirmation(&self, prompt: &str) -> Result<(), BuilderError> {
        if self.confirm.confirm(prompt).await {
            Ok(())
        } else {
            info!(prompt, "action cancelled by user");
            Err(BuilderError::Cancelled)
        }
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    /// Load the framework list. Failures degrade to an empty list.
    pub async fn load_frameworks(&self) -> Vec<AssessmentType> {
        let frameworks = self
            .call("list_assessment_types", self.api.list_assessment_types())
            .await
            .unwrap_or_default();

        {
            let mut state = self.state().await;
            state.frameworks = frameworks.clone();
        }
        self.emit(BuilderEvent::FrameworksLoaded {
            count: frameworks.len(),
        });
        frameworks
    }

    /// Switch to a framework, list its templates and open the active one
    /// (or the first, if none is active). Never fails: a list error shows
    /// an empty framework.
    pub async fn select_framework(&self, type_id: EntityId, type_code: &str) -> Vec<TemplateSummary> {
        let phase = {
            let mut state = self.state().await;
            state.selected_type = Some(SelectedType {
                id: type_id,
                code: type_code.to_string(),
            });
            state.templates.clear();
            state.selected_template_id = None;
            state.template = None;
            state.reset_transient();
            state.phase()
        };
        info!(type_code, "framework selected");
        self.emit(BuilderEvent::PhaseChanged { phase });

        let templates = self.reload_templates().await;
        let pick = templates
            .iter()
            .find(|t| t.status == TemplateStatus::Active)
            .or_else(|| templates.first())
            .map(|t| t.id);

        if let Some(id) = pick
            && let Err(e) = self.select_template(id).await
        {
            warn!(template_id = id, error = %e, "could not open template");
        }
        templates
    }

    /// Fetch a template's full detail and make it the working snapshot.
    ///
    /// On a transport error the previous selection stays on screen. A
    /// template that no longer exists clears the snapshot.
    pub async fn select_template(&self, id: EntityId) -> Result<(), BuilderError> {
        self.load_template(id, true).await
    }

    /// Re-fetch the current template, keeping UI state that still applies.
    pub(crate) async fn reload_template(&self) -> Result<(), BuilderError> {
        let id = self
            .state()
            .await
            .selected_template_id
            .ok_or(BuilderError::NoTemplate)?;
        self.load_template(id, false).await
    }

    /// Refresh after a change the backend has already acknowledged. A failed
    /// fetch is logged and published by the fetch itself; the change stands,
    /// so the caller still reports success.
    pub(crate) async fn refresh_after(&self, operation: &'static str, open: Option<EntityId>) {
        let refreshed = match open {
            Some(id) => self.select_template(id).await,
            None => self.reload_template().await,
        };
        if let Err(e) = refreshed {
            warn!(operation, error = %e, "refresh after saved change failed");
        }
    }

    async fn load_template(&self, id: EntityId, fresh: bool) -> Result<(), BuilderError> {
        let fetched = self
            .call_quiet("get_template", self.api.get_template(id))
            .await;

        let template = match fetched {
            Ok(template) => template,
            Err(BuilderError::Client(e)) if e.is_not_found() => {
                let phase = {
                    let mut state = self.state().await;
                    if state.selected_template_id == Some(id) || fresh {
                        state.selected_template_id = None;
                        state.template = None;
                        state.reset_transient();
                    }
                    state.phase()
                };
                info!(template_id = id, "template not found, nothing to display");
                self.emit(BuilderEvent::TemplateCleared);
                self.emit(BuilderEvent::PhaseChanged { phase });
                return Ok(());
            }
            Err(e) => {
                self.emit(BuilderEvent::Failed {
                    operation: "get_template",
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let status = template.status;
        let (phase, filter_reset) = {
            let mut state = self.state().await;
            if !fresh && state.selected_template_id != Some(id) {
                debug!(template_id = id, "selection moved on, dropping stale reload");
                return Ok(());
            }

            let mut filter_reset = false;
            if fresh {
                state.reset_transient();
            } else {
                state
                    .expanded
                    .retain(|q| template.questions.iter().any(|t| t.id == *q));
                if let Some(editing) = state.editing_text
                    && template.question(editing).is_none()
                {
                    state.editing_text = None;
                }
                if let DimensionFilter::Dimension(dim) = state.dimension_filter
                    && template.dimension(dim).is_none()
                {
                    state.dimension_filter = DimensionFilter::All;
                    filter_reset = true;
                }
            }

            if let Some(summary) = state.templates.iter_mut().find(|t| t.id == id) {
                *summary = template.summary();
            }
            state.selected_template_id = Some(id);
            state.template = Some(template);
            (state.phase(), filter_reset)
        };

        info!(template_id = id, %status, fresh, "template loaded");
        self.emit(BuilderEvent::TemplateLoaded {
            template_id: id,
            status,
        });
        if filter_reset {
            self.emit(BuilderEvent::DimensionFilterChanged {
                filter: DimensionFilter::All,
            });
        }
        if fresh {
            self.emit(BuilderEvent::PhaseChanged { phase });
        }
        Ok(())
    }

    /// Re-list the selected framework's templates. Failures degrade to an
    /// empty list.
    async fn reload_templates(&self) -> Vec<TemplateSummary> {
        let Some(code) = self
            .state()
            .await
            .selected_type
            .as_ref()
            .map(|t| t.code.clone())
        else {
            return Vec::new();
        };

        let templates = self
            .call("list_templates", self.api.list_templates(code.clone()))
            .await
            .unwrap_or_default();

        {
            let mut state = self.state().await;
            if state.selected_type.as_ref().is_some_and(|t| t.code == code) {
                state.templates = templates.clone();
            }
        }
        self.emit(BuilderEvent::TemplatesLoaded {
            type_code: code,
            count: templates.len(),
        });
        templates
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Create the first draft of the selected framework.
    pub async fn create_template(
        &self,
        name: &str,
        description: Option<&str>,
        version: &str,
    ) -> Result<Template, BuilderError> {
        let name = name.trim();
        let version = version.trim();
        if name.is_empty() {
            return Err(BuilderError::Validation("template name is required".to_string()));
        }
        if version.is_empty() {
            return Err(BuilderError::Validation("version is required".to_string()));
        }
        let type_code = self
            .state()
            .await
            .selected_type
            .as_ref()
            .map(|t| t.code.clone())
            .ok_or(BuilderError::NoFramework)?;

        let body = NewTemplate {
            type_code,
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            version: version.to_string(),
        };
        let template = self
            .call("create_template", self.api.create_template(body))
            .await?;
        info!(template_id = template.id, version = %template.version, "template created");

        self.reload_templates().await;
        self.refresh_after("create_template", Some(template.id)).await;
        Ok(template)
    }

    /// Copy `source_id` into a new draft with version `new_version` and open it.
    pub async fn create_draft_from_source(
        &self,
        source_id: Option<EntityId>,
        new_version: &str,
    ) -> Result<Template, BuilderError> {
        let new_version = new_version.trim();
        if new_version.is_empty() {
            return Err(BuilderError::Validation(
                "enter a version for the new draft".to_string(),
            ));
        }
        let source_id = source_id.ok_or_else(|| {
            BuilderError::Validation("choose a template to copy from".to_string())
        })?;

        let body = CloneTemplate {
            new_version: new_version.to_string(),
        };
        let draft = self
            .call("clone_template", self.api.clone_template(source_id, body))
            .await?;
        info!(source_id, template_id = draft.id, version = %draft.version, "draft created");

        self.reload_templates().await;
        self.refresh_after("clone_template", Some(draft.id)).await;
        Ok(draft)
    }

    /// Make the current draft the framework's active template.
    ///
    /// Requires confirmation: the backend deactivates the previously active
    /// template and the change cannot be undone.
    pub async fn promote_to_active(&self) -> Result<Template, BuilderError> {
        let (template_id, prompt) = {
            let state = self.state().await;
            let template = state.draft()?;
            (
                template.id,
                format!(
                    "Promote version {} to active? The current active template for this \
                     framework will be deactivated. This cannot be undone.",
                    template.version
                ),
            )
        };
        self.require_confirmation(&prompt).await?;

        let promoted = self
            .call("promote_template", self.api.promote_template(template_id))
            .await?;
        info!(template_id, "template promoted to active");

        self.reload_templates().await;
        self.refresh_after("promote_template", Some(template_id)).await;
        Ok(promoted)
    }

    /// Edit template name and/or description. Draft only.
    pub async fn update_template_metadata(&self, patch: TemplatePatch) -> Result<(), BuilderError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(BuilderError::Validation("template name is required".to_string()));
        }
        let patch = TemplatePatch {
            name: patch.name.map(|n| n.trim().to_string()),
            description: patch.description.map(|d| d.trim().to_string()),
        };

        let template_id = {
            let mut state = self.state().await;
            let warning = state.note_edit_attempt();
            self.emit_warning(warning);
            let template = state.current()?;

            let mut fields = Vec::new();
            if patch.name.is_some() {
                fields.push(TemplateField::Name);
            }
            if patch.description.is_some() {
                fields.push(TemplateField::Description);
            }
            for field in fields {
                let field = EditField::Template(field);
                if routing::route(template.status, field) == Route::Rejected {
                    warn!(template_id = template.id, %field, "edit rejected by status");
                    return Err(BuilderError::Rejected {
                        field,
                        status: template.status,
                    });
                }
            }
            template.id
        };

        let guard = self.saves.begin();
        let updated = match self
            .call("update_template", self.api.update_template(template_id, patch))
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                guard.fail(e.to_string());
                return Err(e);
            }
        };

        {
            let mut state = self.state().await;
            if let Some(template) = state.snapshot_for(template_id) {
                template.name = updated.name.clone();
                template.description = updated.description.clone();
                template.updated_at = updated.updated_at;
            }
            if let Some(summary) = state.templates.iter_mut().find(|t| t.id == template_id) {
                summary.name = updated.name;
                summary.description = updated.description;
                summary.updated_at = updated.updated_at;
            }
        }
        self.emit(BuilderEvent::TemplateUpdated { template_id });
        drop(guard);
        Ok(())
    }
}
