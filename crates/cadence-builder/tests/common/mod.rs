#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadence_builder::{BuilderConfig, BuilderEvent, Confirm, SaveStatus, TemplateBuilder};
use cadence_client::payload::{
    CloneTemplate, DimensionPatch, MinorQuestionPatch, NewDimension, NewQuestion, NewTemplate,
    QuestionOrder, QuestionPatch, TemplatePatch,
};
use cadence_client::{BoxFuture, ClientError, MemoryTemplateApi, TemplateApi};
use cadence_core::models::EntityId;
use cadence_core::models::audit::AuditEntry;
use cadence_core::models::dimension::Dimension;
use cadence_core::models::framework::AssessmentType;
use cadence_core::models::question::Question;
use cadence_core::models::template::{Template, TemplateStatus, TemplateSummary};
use cadence_core::rubric::ScoreMaps;
use tokio::sync::broadcast;

pub const TYPE_ID: EntityId = 1;
pub const ACTIVE_ID: EntityId = 5;
pub const DRAFT_ID: EntityId = 20;
/// Draft dimension "Adoption" with questions 31..=34.
pub const ADOPTION: EntityId = 21;
/// Draft dimension "Security" with questions 35 and 36.
pub const SECURITY: EntityId = 22;

/// Memory backend that records calls and can delay or fail them.
#[derive(Default)]
pub struct ScriptedApi {
    pub inner: MemoryTemplateApi,
    calls: Mutex<Vec<&'static str>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    settle_delays: Mutex<HashMap<&'static str, Duration>>,
    failures: Mutex<HashMap<&'static str, u16>>,
    scores_sent: Mutex<Vec<(EntityId, ScoreMaps)>>,
    reorders_sent: Mutex<Vec<Vec<QuestionOrder>>>,
}

impl ScriptedApi {
    pub fn new(inner: MemoryTemplateApi) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn delay(&self, operation: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(operation, delay);
    }

    /// Hold the response back after the backend has applied the call.
    pub fn delay_response(&self, operation: &'static str, delay: Duration) {
        self.settle_delays.lock().unwrap().insert(operation, delay);
    }

    pub fn fail(&self, operation: &'static str, status: u16) {
        self.failures.lock().unwrap().insert(operation, status);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn scores_sent(&self) -> Vec<(EntityId, ScoreMaps)> {
        self.scores_sent.lock().unwrap().clone()
    }

    pub fn reorders_sent(&self) -> Vec<Vec<QuestionOrder>> {
        self.reorders_sent.lock().unwrap().clone()
    }

    async fn gate(&self, operation: &'static str) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(operation);
        let delay = self.delays.lock().unwrap().get(operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap().get(operation).copied();
        match failure {
            Some(status) => Err(ClientError::Status {
                status,
                message: format!("{operation} failed"),
            }),
            None => Ok(()),
        }
    }

    async fn settle(&self, operation: &'static str) {
        let delay = self.settle_delays.lock().unwrap().get(operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl TemplateApi for ScriptedApi {
    fn list_assessment_types(&self) -> BoxFuture<'_, Result<Vec<AssessmentType>, ClientError>> {
        Box::pin(async move {
            self.gate("list_assessment_types").await?;
            self.inner.list_assessment_types().await
        })
    }

    fn list_templates(
        &self,
        type_code: String,
    ) -> BoxFuture<'_, Result<Vec<TemplateSummary>, ClientError>> {
        Box::pin(async move {
            self.gate("list_templates").await?;
            self.inner.list_templates(type_code).await
        })
    }

    fn get_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.gate("get_template").await?;
            self.inner.get_template(id).await
        })
    }

    fn create_template(&self, body: NewTemplate) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.gate("create_template").await?;
            self.inner.create_template(body).await
        })
    }

    fn update_template(
        &self,
        id: EntityId,
        patch: TemplatePatch,
    ) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.gate("update_template").await?;
            self.inner.update_template(id, patch).await
        })
    }

    fn delete_template(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.gate("delete_template").await?;
            self.inner.delete_template(id).await
        })
    }

    fn clone_template(
        &self,
        source_id: EntityId,
        body: CloneTemplate,
    ) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.gate("clone_template").await?;
            self.inner.clone_template(source_id, body).await
        })
    }

    fn promote_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.gate("promote_template").await?;
            self.inner.promote_template(id).await
        })
    }

    fn create_dimension(
        &self,
        template_id: EntityId,
        body: NewDimension,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>> {
        Box::pin(async move {
            self.gate("create_dimension").await?;
            self.inner.create_dimension(template_id, body).await
        })
    }

    fn update_dimension(
        &self,
        id: EntityId,
        patch: DimensionPatch,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>> {
        Box::pin(async move {
            self.gate("update_dimension").await?;
            self.inner.update_dimension(id, patch).await
        })
    }

    fn delete_dimension(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.gate("delete_dimension").await?;
            self.inner.delete_dimension(id).await
        })
    }

    fn create_question(
        &self,
        template_id: EntityId,
        body: NewQuestion,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.gate("create_question").await?;
            self.inner.create_question(template_id, body).await
        })
    }

    fn update_question(
        &self,
        id: EntityId,
        patch: QuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.gate("update_question").await?;
            let updated = self.inner.update_question(id, patch).await;
            self.settle("update_question").await;
            updated
        })
    }

    fn update_question_minor(
        &self,
        id: EntityId,
        patch: MinorQuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.gate("update_question_minor").await?;
            let updated = self.inner.update_question_minor(id, patch).await;
            self.settle("update_question_minor").await;
            updated
        })
    }

    fn update_question_scores(
        &self,
        id: EntityId,
        scores: ScoreMaps,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            self.scores_sent.lock().unwrap().push((id, scores.clone()));
            self.gate("update_question_scores").await?;
            self.inner.update_question_scores(id, scores).await
        })
    }

    fn delete_question(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.gate("delete_question").await?;
            self.inner.delete_question(id).await
        })
    }

    fn reorder_questions(
        &self,
        template_id: EntityId,
        orders: Vec<QuestionOrder>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.reorders_sent.lock().unwrap().push(orders.clone());
            self.gate("reorder_questions").await?;
            self.inner.reorder_questions(template_id, orders).await
        })
    }

    fn list_audit(
        &self,
        template_id: EntityId,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, ClientError>> {
        Box::pin(async move {
            self.gate("list_audit").await?;
            self.inner.list_audit(template_id, limit).await
        })
    }
}

/// Answers every prompt the same way and remembers what was asked.
pub struct ScriptedConfirm {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer
        })
    }
}

pub fn question(id: EntityId, dimension_id: EntityId, number: &str, order: i32) -> Question {
    Question {
        id,
        dimension_id,
        question_number: number.to_string(),
        question_text: format!("Question {number}"),
        display_order: order,
        is_required: false,
        min_score: 1,
        max_score: 5,
        score_labels: BTreeMap::new(),
        score_descriptions: BTreeMap::new(),
        score_evidence: BTreeMap::new(),
    }
}

fn dimension(id: EntityId, template_id: EntityId, name: &str, order: i32) -> Dimension {
    Dimension {
        id,
        template_id,
        name: name.to_string(),
        description: None,
        weight: 1.0,
        display_order: order,
    }
}

/// Framework "hc" with active template 5 (version 1.0) and draft
/// template 20 (version 2.0).
pub fn seeded_backend() -> MemoryTemplateApi {
    let api = MemoryTemplateApi::new();
    api.set_actor("Ada", "Byron");
    api.add_assessment_type(AssessmentType {
        id: TYPE_ID,
        code: "hc".to_string(),
        name: "Health Check".to_string(),
        short_name: Some("HC".to_string()),
    });
    api.insert_template(Template {
        id: ACTIVE_ID,
        type_code: "hc".to_string(),
        name: "Health Check".to_string(),
        description: Some("Quarterly review".to_string()),
        version: "1.0".to_string(),
        status: TemplateStatus::Active,
        dimensions: vec![dimension(3, ACTIVE_ID, "Adoption", 0)],
        questions: vec![question(7, 3, "1.1", 0), question(8, 3, "1.2", 1)],
        updated_at: None,
    });
    api.insert_template(Template {
        id: DRAFT_ID,
        type_code: "hc".to_string(),
        name: "Health Check".to_string(),
        description: None,
        version: "2.0".to_string(),
        status: TemplateStatus::Draft,
        dimensions: vec![
            dimension(ADOPTION, DRAFT_ID, "Adoption", 0),
            dimension(SECURITY, DRAFT_ID, "Security", 1),
        ],
        questions: vec![
            question(31, ADOPTION, "1.1", 0),
            question(32, ADOPTION, "1.2", 1),
            question(33, ADOPTION, "1.3", 2),
            question(34, ADOPTION, "1.4", 3),
            question(35, SECURITY, "2.1", 4),
            question(36, SECURITY, "2.2", 5),
        ],
        updated_at: None,
    });
    api
}

pub struct Harness {
    pub api: Arc<ScriptedApi>,
    pub confirm: Arc<ScriptedConfirm>,
    pub builder: TemplateBuilder,
    pub events: broadcast::Receiver<BuilderEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(BuilderConfig::default(), true)
    }

    pub fn with(config: BuilderConfig, answer: bool) -> Self {
        let api = Arc::new(ScriptedApi::new(seeded_backend()));
        let confirm = Arc::new(ScriptedConfirm::answering(answer));
        let builder = TemplateBuilder::new(api.clone(), confirm.clone(), config);
        let events = builder.subscribe();
        Self {
            api,
            confirm,
            builder,
            events,
        }
    }

    /// Select the framework (which opens the active template).
    pub async fn on_active(self) -> Self {
        self.builder.load_frameworks().await;
        self.builder.select_framework(TYPE_ID, "hc").await;
        self.api.clear_calls();
        self
    }

    pub async fn on_draft(self) -> Self {
        let harness = self.on_active().await;
        harness.builder.select_template(DRAFT_ID).await.unwrap();
        harness.api.clear_calls();
        harness
    }

    /// Events received since the last drain.
    pub fn drain(&mut self) -> Vec<BuilderEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }

    pub fn save_transitions(&mut self) -> Vec<SaveStatus> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                BuilderEvent::SaveStatusChanged(status) => Some(status),
                _ => None,
            })
            .collect()
    }
}
