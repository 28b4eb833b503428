use std::future::Future;
use std::pin::Pin;

use cadence_core::models::EntityId;
use cadence_core::models::audit::AuditEntry;
use cadence_core::models::dimension::Dimension;
use cadence_core::models::framework::AssessmentType;
use cadence_core::models::question::Question;
use cadence_core::models::template::{Template, TemplateSummary};
use cadence_core::rubric::ScoreMaps;

use crate::error::ClientError;
use crate::payload::{
    CloneTemplate, DimensionPatch, MinorQuestionPatch, NewDimension, NewQuestion, NewTemplate,
    QuestionOrder, QuestionPatch, TemplatePatch,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Backend operations the template builder depends on.
///
/// Every mutating call reports success or failure distinctly; callers must
/// not assume local state matches the server after an `Err`.
pub trait TemplateApi: Send + Sync {
    fn list_assessment_types(&self) -> BoxFuture<'_, Result<Vec<AssessmentType>, ClientError>>;

    fn list_templates(
        &self,
        type_code: String,
    ) -> BoxFuture<'_, Result<Vec<TemplateSummary>, ClientError>>;

    /// Full detail with nested dimensions and questions.
    fn get_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>>;

    fn create_template(&self, body: NewTemplate) -> BoxFuture<'_, Result<Template, ClientError>>;

    fn update_template(
        &self,
        id: EntityId,
        patch: TemplatePatch,
    ) -> BoxFuture<'_, Result<Template, ClientError>>;

    fn delete_template(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>>;

    /// Copy a template with all dimensions and questions into a new draft.
    fn clone_template(
        &self,
        source_id: EntityId,
        body: CloneTemplate,
    ) -> BoxFuture<'_, Result<Template, ClientError>>;

    /// Make a draft the active template, deactivating the previous one.
    fn promote_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>>;

    fn create_dimension(
        &self,
        template_id: EntityId,
        body: NewDimension,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>>;

    fn update_dimension(
        &self,
        id: EntityId,
        patch: DimensionPatch,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>>;

    /// Deletes the dimension and, server-side, all of its questions.
    fn delete_dimension(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>>;

    fn create_question(
        &self,
        template_id: EntityId,
        body: NewQuestion,
    ) -> BoxFuture<'_, Result<Question, ClientError>>;

    fn update_question(
        &self,
        id: EntityId,
        patch: QuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>>;

    fn update_question_minor(
        &self,
        id: EntityId,
        patch: MinorQuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>>;

    /// Replace all three score maps of a question. Accepted on any status.
    fn update_question_scores(
        &self,
        id: EntityId,
        scores: ScoreMaps,
    ) -> BoxFuture<'_, Result<Question, ClientError>>;

    fn delete_question(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>>;

    fn reorder_questions(
        &self,
        template_id: EntityId,
        orders: Vec<QuestionOrder>,
    ) -> BoxFuture<'_, Result<(), ClientError>>;

    /// Most recent change records first, at most `limit` entries.
    fn list_audit(
        &self,
        template_id: EntityId,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, ClientError>>;
}
