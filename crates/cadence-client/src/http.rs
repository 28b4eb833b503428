//! REST implementation of [`TemplateApi`].
//!
//! Paths are rooted at the configured base URL:
//!
//! ```text
//! GET    /assessment-types
//! GET    /assessment-templates?type_code={code}
//! POST   /assessment-templates
//! GET    /assessment-templates/{id}
//! PATCH  /assessment-templates/{id}
//! DELETE /assessment-templates/{id}
//! POST   /assessment-templates/{id}/clone
//! POST   /assessment-templates/{id}/promote
//! POST   /assessment-templates/{id}/dimensions
//! POST   /assessment-templates/{id}/questions
//! POST   /assessment-templates/{id}/questions/reorder
//! GET    /assessment-templates/{id}/audit?limit={n}
//! PATCH  /assessment-dimensions/{id}
//! DELETE /assessment-dimensions/{id}
//! PATCH  /assessment-questions/{id}
//! PATCH  /assessment-questions/{id}/minor
//! PUT    /assessment-questions/{id}/scores
//! DELETE /assessment-questions/{id}
//! ```

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use cadence_core::models::EntityId;
use cadence_core::models::audit::AuditEntry;
use cadence_core::models::dimension::Dimension;
use cadence_core::models::framework::AssessmentType;
use cadence_core::models::question::Question;
use cadence_core::models::template::{Template, TemplateSummary};
use cadence_core::rubric::ScoreMaps;

use crate::api::{BoxFuture, TemplateApi};
use crate::error::ClientError;
use crate::payload::{
    CloneTemplate, DimensionPatch, MinorQuestionPatch, NewDimension, NewQuestion, NewTemplate,
    QuestionOrder, QuestionPatch, ReorderQuestions, TemplatePatch,
};

pub struct HttpTemplateApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTemplateApi {
    /// Build a client with a per-request timeout and an optional bearer token.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self, ClientError> {
        if base_url.trim().is_empty() {
            return Err(ClientError::Config("base URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(
        &self,
        req: RequestBuilder,
        resource: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let response = req.send().await.map_err(|e| {
            let err = ClientError::from(e);
            warn!(resource, error = %err, "request failed");
            err
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                resource: resource.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(resource, status = status.as_u16(), "request rejected");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!(resource, status = status.as_u16(), "request ok");
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path), path).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(method, path).json(body);
        let response = self.send(req, path).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_no_content(&self, req: RequestBuilder, path: &str) -> Result<(), ClientError> {
        self.send(req, path).await?;
        Ok(())
    }
}

impl TemplateApi for HttpTemplateApi {
    fn list_assessment_types(&self) -> BoxFuture<'_, Result<Vec<AssessmentType>, ClientError>> {
        Box::pin(async move {
            self.fetch::<Vec<AssessmentType>>("/assessment-types")
                .await
        })
    }

    fn list_templates(
        &self,
        type_code: String,
    ) -> BoxFuture<'_, Result<Vec<TemplateSummary>, ClientError>> {
        Box::pin(async move {
            let path = "/assessment-templates";
            let req = self
                .request(Method::GET, path)
                .query(&[("type_code", type_code.as_str())]);
            let response = self.send(req, path).await?;
            Ok(response.json::<Vec<TemplateSummary>>().await?)
        })
    }

    fn get_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.fetch::<Template>(&format!("/assessment-templates/{id}"))
                .await
        })
    }

    fn create_template(&self, body: NewTemplate) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            self.send_json::<_, Template>(Method::POST, "/assessment-templates", &body)
                .await
        })
    }

    fn update_template(
        &self,
        id: EntityId,
        patch: TemplatePatch,
    ) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{id}");
            self.send_json::<_, Template>(Method::PATCH, &path, &patch).await
        })
    }

    fn delete_template(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{id}");
            self.send_no_content(self.request(Method::DELETE, &path), &path)
                .await
        })
    }

    fn clone_template(
        &self,
        source_id: EntityId,
        body: CloneTemplate,
    ) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{source_id}/clone");
            self.send_json::<_, Template>(Method::POST, &path, &body).await
        })
    }

    fn promote_template(&self, id: EntityId) -> BoxFuture<'_, Result<Template, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{id}/promote");
            let response = self.send(self.request(Method::POST, &path), &path).await?;
            Ok(response.json::<Template>().await?)
        })
    }

    fn create_dimension(
        &self,
        template_id: EntityId,
        body: NewDimension,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{template_id}/dimensions");
            self.send_json::<_, Dimension>(Method::POST, &path, &body).await
        })
    }

    fn update_dimension(
        &self,
        id: EntityId,
        patch: DimensionPatch,
    ) -> BoxFuture<'_, Result<Dimension, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-dimensions/{id}");
            self.send_json::<_, Dimension>(Method::PATCH, &path, &patch).await
        })
    }

    fn delete_dimension(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-dimensions/{id}");
            self.send_no_content(self.request(Method::DELETE, &path), &path)
                .await
        })
    }

    fn create_question(
        &self,
        template_id: EntityId,
        body: NewQuestion,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{template_id}/questions");
            self.send_json::<_, Question>(Method::POST, &path, &body).await
        })
    }

    fn update_question(
        &self,
        id: EntityId,
        patch: QuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-questions/{id}");
            self.send_json::<_, Question>(Method::PATCH, &path, &patch).await
        })
    }

    fn update_question_minor(
        &self,
        id: EntityId,
        patch: MinorQuestionPatch,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-questions/{id}/minor");
            self.send_json::<_, Question>(Method::PATCH, &path, &patch).await
        })
    }

    fn update_question_scores(
        &self,
        id: EntityId,
        scores: ScoreMaps,
    ) -> BoxFuture<'_, Result<Question, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-questions/{id}/scores");
            self.send_json::<_, Question>(Method::PUT, &path, &scores).await
        })
    }

    fn delete_question(&self, id: EntityId) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-questions/{id}");
            self.send_no_content(self.request(Method::DELETE, &path), &path)
                .await
        })
    }

    fn reorder_questions(
        &self,
        template_id: EntityId,
        orders: Vec<QuestionOrder>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{template_id}/questions/reorder");
            let req = self
                .request(Method::POST, &path)
                .json(&ReorderQuestions { orders });
            self.send_no_content(req, &path).await
        })
    }

    fn list_audit(
        &self,
        template_id: EntityId,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<AuditEntry>, ClientError>> {
        Box::pin(async move {
            let path = format!("/assessment-templates/{template_id}/audit");
            let req = self
                .request(Method::GET, &path)
                .query(&[("limit", limit)]);
            let response = self.send(req, &path).await?;
            Ok(response.json::<Vec<AuditEntry>>().await?)
        })
    }
}
