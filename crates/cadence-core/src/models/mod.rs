pub mod audit;
pub mod dimension;
pub mod framework;
pub mod question;
pub mod template;

/// Server-assigned identifier shared by every entity in the builder.
pub type EntityId = i64;
