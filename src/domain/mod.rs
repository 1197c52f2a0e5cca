//! Domain layer types and invariants.

pub mod article;
pub mod error;
pub mod sanitize;
pub mod style;
pub mod topics;
