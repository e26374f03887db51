//! Conversions between domain primitives and the calldata structs.

use alloy_primitives::U256;
use ark_bn254::{G1Affine, G2Affine};
use stakewire_primitives::bn254::{g1_to_u256_coords, g2_to_u256_coords};
use stakewire_primitives::{Bn254Certificate, EcdsaCertificate, OperatorSet};

use crate::bindings;

impl From<OperatorSet> for bindings::OperatorSet {
    fn from(value: OperatorSet) -> Self {
        Self {
            avs: value.avs,
            id: value.id,
        }
    }
}

impl From<bindings::OperatorSet> for OperatorSet {
    fn from(value: bindings::OperatorSet) -> Self {
        Self {
            avs: value.avs,
            id: value.id,
        }
    }
}

pub fn g1_point(point: &G1Affine) -> bindings::BN254G1Point {
    let (x, y) = g1_to_u256_coords(point);
    bindings::BN254G1Point { x, y }
}

pub fn g2_point(point: &G2Affine) -> bindings::BN254G2Point {
    let (x, y) = g2_to_u256_coords(point);
    bindings::BN254G2Point { x, y }
}

pub fn operator_info(pubkey: &G1Affine, weights: Vec<U256>) -> bindings::BN254OperatorInfo {
    bindings::BN254OperatorInfo {
        pubkey: g1_point(pubkey),
        weights,
    }
}

/// Builds the calldata certificate for a BN254 aggregate, stamping in the
/// reference timestamp the quorum was sampled at.
pub fn bn254_certificate(
    cert: &Bn254Certificate,
    reference_timestamp: u32,
) -> bindings::BN254Certificate {
    bindings::BN254Certificate {
        referenceTimestamp: reference_timestamp,
        messageHash: cert.task_response_digest,
        signature: g1_point(&cert.signers_signature),
        apk: g2_point(&cert.signers_public_key),
        nonSignerWitnesses: cert
            .non_signer_operators
            .iter()
            .map(|index| bindings::BN254NonSignerWitness {
                operatorIndex: *index,
            })
            .collect(),
    }
}

pub fn ecdsa_certificate(
    cert: &EcdsaCertificate,
    reference_timestamp: u32,
) -> bindings::ECDSACertificate {
    bindings::ECDSACertificate {
        referenceTimestamp: reference_timestamp,
        messageHash: cert.task_message_hash,
        sig: cert.final_signature.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256};
    use stakewire_primitives::bn254::BlsKeyPair;

    #[test]
    fn operator_set_round_trips() {
        let set = OperatorSet::new(Address::repeat_byte(0xab), 7);
        let sol: bindings::OperatorSet = set.into();
        assert_eq!(OperatorSet::from(sol), set);
    }

    #[test]
    fn certificate_carries_non_signer_indices_in_order() {
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(9);
        let kp = BlsKeyPair::random(&mut rng);
        let digest = B256::repeat_byte(0x55);
        let cert = Bn254Certificate {
            task_id: B256::repeat_byte(1),
            task_response: Bytes::from_static(b"ok"),
            task_response_digest: digest,
            signers_signature: kp.sign(digest),
            signers_public_key: kp.public_g2(),
            non_signer_operators: vec![4, 1, 9],
        };

        let sol = bn254_certificate(&cert, 1234);
        assert_eq!(sol.referenceTimestamp, 1234);
        assert_eq!(sol.messageHash, digest);
        let indices: Vec<u32> = sol
            .nonSignerWitnesses
            .iter()
            .map(|w| w.operatorIndex)
            .collect();
        assert_eq!(indices, vec![4, 1, 9]);
    }
}
