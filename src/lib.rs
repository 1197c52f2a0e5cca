//! Explainer articles for open scientific questions, generated on demand and
//! cached in a shared key-value store.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
