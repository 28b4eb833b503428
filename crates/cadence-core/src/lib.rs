//! cadence-core
//!
//! Pure domain types for the assessment template builder: frameworks,
//! versioned templates, dimensions, questions with their scored rubrics,
//! and audit entries. No network or UI dependency.

pub mod error;
pub mod models;
pub mod rubric;
