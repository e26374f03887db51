//! Per-chain access: provider construction, the transaction-signing capability
//! trait with its local-key and remote-delegate implementations, the chain error
//! taxonomy, and the cancellable backoff primitive used for bounded retries.

pub mod backoff;
pub mod error;
pub mod provider;
pub mod signer;

pub use backoff::{retry_with_backoff, Retryable, RetryError, CERTIFICATE_SUBMISSION_SCHEDULE};
pub use error::ChainError;
pub use provider::{ChainClient, HttpProvider};
pub use signer::{LocalSigner, RemoteSigner, SignerDelegate, TransactionSigner};
