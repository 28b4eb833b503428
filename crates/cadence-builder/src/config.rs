use std::time::Duration;

/// Tunables for [`TemplateBuilder`](crate::TemplateBuilder).
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Upper bound on any single backend call. A save that exceeds it is
    /// reported as failed instead of leaving the indicator on "saving".
    pub request_timeout: Duration,
    /// Number of audit entries fetched per request.
    pub audit_page_size: usize,
    /// Characters kept in audit old/new value previews.
    pub audit_preview_chars: usize,
    /// Buffered events per subscriber before the slowest one lags.
    pub event_capacity: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            audit_page_size: 100,
            audit_preview_chars: 60,
            event_capacity: 256,
        }
    }
}
