use alloy_primitives::B256;
use stakewire_chain::{ChainError, Retryable};
use stakewire_primitives::PrimitivesError;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The certificate failed local validation; no network call was made.
    #[error("invalid certificate: {0}")]
    Certificate(#[from] PrimitivesError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Every scheduled attempt failed; carries the final attempt's error
    /// verbatim and the task id for correlation.
    #[error("submission for task {task_id} failed after {attempts} attempts: {source}")]
    Exhausted {
        task_id: B256,
        attempts: usize,
        #[source]
        source: ChainError,
    },

    #[error("submission for task {task_id} cancelled after {attempts} attempts")]
    Cancelled { task_id: B256, attempts: usize },
}

impl Retryable for SubmitError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Chain(err) => err.is_transient(),
            _ => false,
        }
    }
}
