//! cadence-builder
//!
//! Editing state machine for versioned assessment templates. A
//! [`TemplateBuilder`] owns the working snapshot of one template, routes
//! every edit to the endpoint its status allows, tracks in-flight saves
//! for the save indicator, and publishes [`BuilderEvent`]s for renderers.

pub mod audit;
pub mod cells;
pub mod config;
pub mod confirm;
pub mod controller;
pub mod dimensions;
pub mod error;
pub mod events;
pub mod questions;
pub mod routing;
pub mod state;
pub mod status;

pub use crate::audit::AuditRow;
pub use crate::cells::{CellAction, CellAddress, CellCommit, CellEditor, CellKey};
pub use crate::config::BuilderConfig;
pub use crate::confirm::Confirm;
pub use crate::controller::TemplateBuilder;
pub use crate::dimensions::DimensionForm;
pub use crate::error::BuilderError;
pub use crate::events::BuilderEvent;
pub use crate::questions::QuestionEdit;
pub use crate::routing::{EditField, Route};
pub use crate::state::{DimensionFilter, Phase};
pub use crate::status::SaveStatus;
