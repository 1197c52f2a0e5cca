//! Application services and the collaborator contracts they depend on.

pub mod articles;
pub mod error;
pub mod generator;
pub mod news;
pub mod prompt;
pub mod store;
