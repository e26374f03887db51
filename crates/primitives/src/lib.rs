//! Domain primitives for the stakewire settlement layer: operator sets and key
//! material, BN254 point math and signing, the keccak Merkle tree used for stake
//! tables, and the aggregated-certificate variants submitted on-chain.

pub mod bn254;
pub mod certificate;
pub mod error;
pub mod merkle;
pub mod operator_set;

pub use certificate::{AggregatedCertificate, Bn254Certificate, EcdsaCertificate};
pub use error::PrimitivesError;
pub use merkle::{MerkleProof, MerkleTree};
pub use operator_set::{CurveType, OperatorKey, OperatorKeyInfo, OperatorSet};
