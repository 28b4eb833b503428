use thiserror::Error;

use cadence_client::ClientError;
use cadence_core::models::EntityId;
use cadence_core::models::template::TemplateStatus;

use crate::routing::EditField;

#[derive(Debug, Error)]
pub enum BuilderError {
    /// Input refused before any network call was made.
    #[error("{0}")]
    Validation(String),

    #[error("{field} cannot be edited on a {status} template")]
    Rejected {
        field: EditField,
        status: TemplateStatus,
    },

    #[error("template {template_id} is not a draft")]
    NotDraft { template_id: EntityId },

    #[error("no framework selected")]
    NoFramework,

    #[error("no template selected")]
    NoTemplate,

    #[error("question {0} is not part of the current template")]
    UnknownQuestion(EntityId),

    #[error("dimension {0} is not part of the current template")]
    UnknownDimension(EntityId),

    #[error("cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl BuilderError {
    /// True for errors raised before contacting the backend.
    pub fn is_local(&self) -> bool {
        !matches!(self, BuilderError::Timeout | BuilderError::Client(_))
    }
}
