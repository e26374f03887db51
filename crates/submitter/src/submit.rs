//! Submission with bounded retry.
//!
//! A submission is two chain interactions: one read for the canonical
//! certificate bytes, one transaction carrying `{taskId, certificateBytes,
//! taskResponse}`. Both sit inside the retry loop so a re-attempt re-fetches
//! the encoding. Only transient errors are retried; reverts and local
//! validation failures cannot succeed on a later attempt.

use std::sync::Arc;

use alloy_primitives::Bytes;
use stakewire_chain::{
    retry_with_backoff, ChainError, RetryError, CERTIFICATE_SUBMISSION_SCHEDULE,
};
use stakewire_primitives::AggregatedCertificate;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::SubmitError;
use crate::mailbox::{SubmitReceipt, TaskMailbox};

pub struct CertificateSubmitter {
    mailbox: Arc<dyn TaskMailbox>,
}

impl CertificateSubmitter {
    pub fn new(mailbox: Arc<dyn TaskMailbox>) -> Self {
        Self { mailbox }
    }

    /// One submission attempt: validate locally, fetch the canonical encoding,
    /// submit, wait for the receipt.
    pub async fn submit(
        &self,
        certificate: &AggregatedCertificate,
        reference_timestamp: u32,
        cancel: CancellationToken,
    ) -> Result<SubmitReceipt, SubmitError> {
        certificate.validate()?;
        Ok(self
            .submit_validated(certificate, reference_timestamp, cancel)
            .await?)
    }

    /// Submits with the fixed backoff schedule (five attempts). Validation runs
    /// once up front; a certificate that fails it is never submitted. The final
    /// attempt's error is returned wrapped with the task id.
    pub async fn submit_retryable(
        &self,
        certificate: &AggregatedCertificate,
        reference_timestamp: u32,
        cancel: CancellationToken,
    ) -> Result<SubmitReceipt, SubmitError> {
        certificate.validate()?;
        let task_id = certificate.task_id();

        let result = retry_with_backoff(&CERTIFICATE_SUBMISSION_SCHEDULE, &cancel, |attempt| {
            let cancel = cancel.clone();
            async move {
                if attempt > 0 {
                    warn!(
                        target: "stakewire::submitter",
                        %task_id,
                        attempt = attempt + 1,
                        "retrying certificate submission"
                    );
                }
                self.submit_validated(certificate, reference_timestamp, cancel)
                    .await
            }
        })
        .await;

        match result {
            Ok(receipt) => Ok(receipt),
            Err(RetryError::Exhausted { attempts, source }) => Err(SubmitError::Exhausted {
                task_id,
                attempts,
                source,
            }),
            Err(RetryError::Fatal { source, .. }) => Err(SubmitError::Chain(source)),
            Err(RetryError::Cancelled { attempts }) => {
                Err(SubmitError::Cancelled { task_id, attempts })
            }
        }
    }

    async fn submit_validated(
        &self,
        certificate: &AggregatedCertificate,
        reference_timestamp: u32,
        cancel: CancellationToken,
    ) -> Result<SubmitReceipt, ChainError> {
        let task_id = certificate.task_id();
        let bytes = self
            .mailbox
            .certificate_bytes(certificate.clone(), reference_timestamp)
            .await?;
        let receipt = self
            .mailbox
            .submit_result(
                task_id,
                bytes,
                Bytes::clone(certificate.task_response()),
                cancel,
            )
            .await?;
        info!(
            target: "stakewire::submitter",
            %task_id,
            curve = %certificate.curve_type(),
            tx_hash = %receipt.tx_hash,
            "certificate submitted"
        );
        Ok(receipt)
    }
}
