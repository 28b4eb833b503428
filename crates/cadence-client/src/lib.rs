//! cadence-client
//!
//! Template repository client. The builder talks to the backend only
//! through [`TemplateApi`]; [`HttpTemplateApi`] is the REST implementation
//! and [`MemoryTemplateApi`] an in-process backend with the same
//! server-side guarantees, used for tests and offline demos.

pub mod api;
pub mod error;
pub mod http;
pub mod memory;
pub mod payload;

pub use crate::api::{BoxFuture, TemplateApi};
pub use crate::error::ClientError;
pub use crate::http::HttpTemplateApi;
pub use crate::memory::MemoryTemplateApi;
