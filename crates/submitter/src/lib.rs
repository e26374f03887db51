//! Certificate submission: packages an aggregated certificate into its
//! canonical on-chain encoding, submits it to the task mailbox with bounded
//! retry, and offers a read-only threshold-verification path.

pub mod config;
pub mod error;
pub mod mailbox;
pub mod submit;
pub mod verify;

pub use config::SubmitterConfig;
pub use error::SubmitError;
pub use mailbox::{SubmitReceipt, TaskConfig, TaskMailbox, TaskMailboxClient};
pub use submit::CertificateSubmitter;
pub use verify::{CertificateVerifier, CertificateVerifierClient, VerificationResult};
