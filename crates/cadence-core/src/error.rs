use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid template status: {0}")]
    InvalidStatus(String),

    #[error("invalid score range [{min}, {max}]")]
    InvalidScoreRange { min: i32, max: i32 },

    #[error("unknown rubric field: {0}")]
    InvalidRubricField(String),
}
