use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid topic catalog: {0}")]
    Catalog(String),
    #[error("duplicate topic id `{0}`")]
    DuplicateTopic(String),
}

impl DomainError {
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }
}
