//! Aggregated certificates as produced by the upstream signature-aggregation step
//! and consumed by the submission engine. One tagged union covers both schemes so
//! the submission and verification paths cannot drift apart per scheme.

use alloy_primitives::{Bytes, B256};
use ark_bn254::{G1Affine, G2Affine};

use crate::bn254::{g1_from_bytes, g1_to_bytes, g2_from_bytes, g2_to_bytes};
use crate::error::PrimitivesError;
use crate::operator_set::CurveType;

/// Recoverable ECDSA signature length (`r || s || v`).
pub const ECDSA_SIGNATURE_LEN: usize = 65;

/// Aggregated BN254 certificate: one G1 signature, the G2 aggregate public key of
/// the signers, and the indices of operators that did not sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bn254Certificate {
    pub task_id: B256,
    pub task_response: Bytes,
    pub task_response_digest: B256,
    pub signers_signature: G1Affine,
    pub signers_public_key: G2Affine,
    pub non_signer_operators: Vec<u32>,
}

/// Aggregated ECDSA certificate: per-signer recoverable signatures concatenated
/// in signer-index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaCertificate {
    pub task_id: B256,
    pub task_response: Bytes,
    pub task_message_hash: B256,
    pub final_signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatedCertificate {
    Bn254(Bn254Certificate),
    Ecdsa(EcdsaCertificate),
}

impl AggregatedCertificate {
    pub fn task_id(&self) -> B256 {
        match self {
            Self::Bn254(c) => c.task_id,
            Self::Ecdsa(c) => c.task_id,
        }
    }

    pub fn task_response(&self) -> &Bytes {
        match self {
            Self::Bn254(c) => &c.task_response,
            Self::Ecdsa(c) => &c.task_response,
        }
    }

    pub fn curve_type(&self) -> CurveType {
        match self {
            Self::Bn254(_) => CurveType::Bn254,
            Self::Ecdsa(_) => CurveType::Ecdsa,
        }
    }

    /// Cryptographic sanity checks performed before any network I/O. A failure
    /// here is fatal for the certificate; retrying cannot change it.
    pub fn validate(&self) -> Result<(), PrimitivesError> {
        match self {
            Self::Bn254(c) => c.validate(),
            Self::Ecdsa(c) => c.validate(),
        }
    }
}

impl Bn254Certificate {
    /// Checks that signature and public key survive a round trip through the
    /// pairing-precompile encoding, which implies on-curve and correct-subgroup.
    pub fn validate(&self) -> Result<(), PrimitivesError> {
        g1_from_bytes(&g1_to_bytes(&self.signers_signature))?;
        g2_from_bytes(&g2_to_bytes(&self.signers_public_key))?;
        if self.task_response_digest == B256::ZERO {
            return Err(PrimitivesError::InvalidCertificate(
                "empty task response digest".into(),
            ));
        }
        Ok(())
    }
}

impl EcdsaCertificate {
    pub fn validate(&self) -> Result<(), PrimitivesError> {
        if self.final_signature.is_empty() {
            return Err(PrimitivesError::InvalidCertificate(
                "empty final signature".into(),
            ));
        }
        if self.final_signature.len() % ECDSA_SIGNATURE_LEN != 0 {
            return Err(PrimitivesError::InvalidCertificate(format!(
                "final signature length {} is not a multiple of {ECDSA_SIGNATURE_LEN}",
                self.final_signature.len()
            )));
        }
        Ok(())
    }

    pub fn signer_count(&self) -> usize {
        self.final_signature.len() / ECDSA_SIGNATURE_LEN
    }
}
