//! Read-only threshold verification against the scheme's certificate verifier.
//!
//! Thresholds are expressed in parts per ten thousand of total stake, one entry
//! per weight position (e.g. 6667 is 66.67%).

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use stakewire_chain::{ChainClient, ChainError};
use stakewire_contracts::bindings::{IBN254CertificateVerifier, IECDSACertificateVerifier};
use stakewire_contracts::call_and_decode;
use stakewire_contracts::convert::{bn254_certificate, ecdsa_certificate};
use stakewire_primitives::{AggregatedCertificate, OperatorSet};

/// One whole, in parts per ten thousand.
pub const THRESHOLD_DENOMINATOR: u16 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub satisfied: bool,
    pub non_signers: Vec<Address>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateVerifier: Send + Sync {
    async fn certificate_digest(
        &self,
        reference_timestamp: u32,
        message_hash: B256,
    ) -> Result<B256, ChainError>;

    /// Checks the certificate's signers against per-weight-position stake
    /// thresholds. An unsatisfied quorum is a `false` result, not an error.
    async fn verify_certificate_proportion(
        &self,
        operator_set: OperatorSet,
        certificate: AggregatedCertificate,
        reference_timestamp: u32,
        thresholds: Vec<u16>,
    ) -> Result<VerificationResult, ChainError>;
}

/// Provider-backed [`CertificateVerifier`]. The address comes from the task
/// config and already matches the certificate's scheme; dispatch here follows
/// the certificate variant.
pub struct CertificateVerifierClient {
    client: ChainClient,
    address: Address,
}

impl CertificateVerifierClient {
    pub fn new(client: ChainClient, address: Address) -> Self {
        Self { client, address }
    }
}

#[async_trait]
impl CertificateVerifier for CertificateVerifierClient {
    async fn certificate_digest(
        &self,
        reference_timestamp: u32,
        message_hash: B256,
    ) -> Result<B256, ChainError> {
        let ret = call_and_decode(
            IBN254CertificateVerifier::calculateCertificateDigestCall {
                referenceTimestamp: reference_timestamp,
                messageHash: message_hash,
            },
            self.address,
            &self.client,
        )
        .await?;
        Ok(ret._0)
    }

    async fn verify_certificate_proportion(
        &self,
        operator_set: OperatorSet,
        certificate: AggregatedCertificate,
        reference_timestamp: u32,
        thresholds: Vec<u16>,
    ) -> Result<VerificationResult, ChainError> {
        let (satisfied, non_signers) = match &certificate {
            AggregatedCertificate::Bn254(cert) => {
                let ret = call_and_decode(
                    IBN254CertificateVerifier::verifyCertificateProportionCall {
                        operatorSet: operator_set.into(),
                        cert: bn254_certificate(cert, reference_timestamp),
                        totalStakeProportionThresholds: thresholds,
                    },
                    self.address,
                    &self.client,
                )
                .await?;
                (ret.satisfied, ret.nonSigners)
            }
            AggregatedCertificate::Ecdsa(cert) => {
                let ret = call_and_decode(
                    IECDSACertificateVerifier::verifyCertificateProportionCall {
                        operatorSet: operator_set.into(),
                        cert: ecdsa_certificate(cert, reference_timestamp),
                        totalStakeProportionThresholds: thresholds,
                    },
                    self.address,
                    &self.client,
                )
                .await?;
                (ret.satisfied, ret.nonSigners)
            }
        };
        Ok(VerificationResult {
            satisfied,
            non_signers,
        })
    }
}
