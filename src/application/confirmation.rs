// Confirmation trait - yes/no prompt put to the user
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmError {
    #[error("another confirmation is already pending")]
    Busy,
}

#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Ask the user `prompt`, suspending until they answer.
    /// A dismissed prompt answers `false`.
    async fn confirm(&self, prompt: &str) -> Result<bool, ConfirmError>;
}
