use alloy_primitives::Address;

#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// Exactly one of a private key or a public key must be supplied per operator.
    #[error("operator {0}: exactly one of private key or public key must be provided")]
    AmbiguousKeyMaterial(Address),

    #[error("operator {operator}: expected {expected} key material, got {actual}")]
    CurveMismatch {
        operator: Address,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid point encoding: {0}")]
    InvalidPoint(String),

    #[error("invalid key encoding: {0}")]
    InvalidKey(String),

    #[error("merkle tree requires at least one leaf")]
    EmptyTree,

    #[error("leaf index {index} out of range for {leaves} leaves")]
    LeafIndexOutOfRange { index: usize, leaves: usize },

    #[error("unsupported curve type {0}")]
    UnsupportedCurveType(u8),

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),
}
