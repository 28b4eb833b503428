//! Audit log viewer.

use serde::Serialize;

use cadence_core::models::audit::AuditEntry;

use crate::controller::TemplateBuilder;
use crate::error::BuilderError;

/// Shown when an entry has no recorded author.
pub const SYSTEM_AUTHOR: &str = "System";

/// One display row of the audit table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub changed_at: jiff::Timestamp,
    pub changed_by: String,
    pub entity_type: String,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
}

impl AuditRow {
    pub fn from_entry(entry: AuditEntry, preview_chars: usize) -> Self {
        Self {
            changed_at: entry.changed_at,
            changed_by: entry
                .changed_by
                .map(|by| by.display_name())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| SYSTEM_AUTHOR.to_string()),
            entity_type: entry.entity_type,
            field_name: entry.field_name,
            old_value: preview(entry.old_value.as_deref(), preview_chars),
            new_value: preview(entry.new_value.as_deref(), preview_chars),
        }
    }
}

/// First `max_chars` characters of `value`, with `...` appended when cut.
pub fn preview(value: Option<&str>, max_chars: usize) -> String {
    let value = value.unwrap_or_default();
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

impl TemplateBuilder {
    /// Most recent changes to the current template, newest first as the
    /// backend returns them.
    pub async fn audit_log(&self) -> Result<Vec<AuditRow>, BuilderError> {
        let template_id = self
            .state()
            .await
            .template
            .as_ref()
            .map(|t| t.id)
            .ok_or(BuilderError::NoTemplate)?;

        let entries = self
            .call(
                "list_audit",
                self.api.list_audit(template_id, self.config.audit_page_size),
            )
            .await?;

        let preview_chars = self.config.audit_preview_chars;
        Ok(entries
            .into_iter()
            .map(|entry| AuditRow::from_entry(entry, preview_chars))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::models::audit::ChangedBy;

    #[test]
    fn preview_cuts_long_values() {
        let long = "x".repeat(75);
        let cut = preview(Some(&long), 60);
        assert_eq!(cut, format!("{}...", "x".repeat(60)));
        assert_eq!(preview(Some(&"y".repeat(60)), 60), "y".repeat(60));
        assert_eq!(preview(None, 60), "");
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        assert_eq!(preview(Some("ééééé"), 3), "ééé...");
    }

    #[test]
    fn missing_author_is_system() {
        let entry = AuditEntry {
            changed_at: jiff::Timestamp::UNIX_EPOCH,
            changed_by: None,
            entity_type: "question".to_string(),
            field_name: "question_text".to_string(),
            old_value: None,
            new_value: Some("New".to_string()),
        };
        let row = AuditRow::from_entry(entry.clone(), 60);
        assert_eq!(row.changed_by, SYSTEM_AUTHOR);
        assert_eq!(row.old_value, "");

        let named = AuditEntry {
            changed_by: Some(ChangedBy {
                first_name: "Ada".to_string(),
                last_name: "Byron".to_string(),
            }),
            ..entry
        };
        assert_eq!(AuditRow::from_entry(named, 60).changed_by, "Ada Byron");
    }
}
