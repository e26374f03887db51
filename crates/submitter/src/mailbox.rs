//! The task mailbox seam: canonical certificate encoding and result submission.
//!
//! Certificate bytes are always fetched from the contract's own encoding call
//! rather than encoded locally, so the off-chain encoding can never drift from
//! what the verifier will decode.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use stakewire_chain::{ChainClient, ChainError, TransactionSigner};
use stakewire_contracts::bindings::ITaskMailbox;
use stakewire_contracts::call_and_decode;
use stakewire_contracts::convert::{bn254_certificate, ecdsa_certificate};
use stakewire_primitives::{AggregatedCertificate, CurveType, OperatorSet};
use tokio_util::sync::CancellationToken;

/// The mined submission, reduced to what callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Executor-set task configuration as registered in the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    pub certificate_verifier: Address,
    pub curve_type: CurveType,
    /// Seconds a task result stays submittable.
    pub task_sla: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskMailbox: Send + Sync {
    /// Canonical on-chain byte encoding for the certificate.
    async fn certificate_bytes(
        &self,
        certificate: AggregatedCertificate,
        reference_timestamp: u32,
    ) -> Result<Bytes, ChainError>;

    async fn submit_result(
        &self,
        task_id: B256,
        certificate: Bytes,
        response: Bytes,
        cancel: CancellationToken,
    ) -> Result<SubmitReceipt, ChainError>;

    async fn executor_task_config(
        &self,
        operator_set: OperatorSet,
    ) -> Result<TaskConfig, ChainError>;
}

/// Provider-backed [`TaskMailbox`].
pub struct TaskMailboxClient {
    client: ChainClient,
    address: Address,
    signer: Arc<dyn TransactionSigner>,
}

impl TaskMailboxClient {
    pub fn new(client: ChainClient, address: Address, signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            client,
            address,
            signer,
        }
    }
}

#[async_trait]
impl TaskMailbox for TaskMailboxClient {
    async fn certificate_bytes(
        &self,
        certificate: AggregatedCertificate,
        reference_timestamp: u32,
    ) -> Result<Bytes, ChainError> {
        let bytes = match &certificate {
            AggregatedCertificate::Bn254(cert) => {
                call_and_decode(
                    ITaskMailbox::getBN254CertificateBytesCall {
                        cert: bn254_certificate(cert, reference_timestamp),
                    },
                    self.address,
                    &self.client,
                )
                .await?
                ._0
            }
            AggregatedCertificate::Ecdsa(cert) => {
                call_and_decode(
                    ITaskMailbox::getECDSACertificateBytesCall {
                        cert: ecdsa_certificate(cert, reference_timestamp),
                    },
                    self.address,
                    &self.client,
                )
                .await?
                ._0
            }
        };
        Ok(bytes)
    }

    async fn submit_result(
        &self,
        task_id: B256,
        certificate: Bytes,
        response: Bytes,
        cancel: CancellationToken,
    ) -> Result<SubmitReceipt, ChainError> {
        let call = ITaskMailbox::submitResultCall {
            taskId: task_id,
            cert: certificate,
            result: response,
        };
        let receipt = self
            .signer
            .send_transaction(&self.client, self.address, call.abi_encode().into(), &cancel)
            .await?;
        Ok(SubmitReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }

    async fn executor_task_config(
        &self,
        operator_set: OperatorSet,
    ) -> Result<TaskConfig, ChainError> {
        let ret = call_and_decode(
            ITaskMailbox::getExecutorOperatorSetTaskConfigCall {
                operatorSet: operator_set.into(),
            },
            self.address,
            &self.client,
        )
        .await?;
        let config = ret._0;
        let curve_type = CurveType::from_u8(config.curveType)
            .map_err(|e| ChainError::revert("getExecutorOperatorSetTaskConfig", e.to_string()))?;
        Ok(TaskConfig {
            certificate_verifier: config.certificateVerifier,
            curve_type,
            task_sla: config.taskSLA.to::<u64>(),
        })
    }
}
