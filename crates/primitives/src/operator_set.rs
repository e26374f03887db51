use alloy_primitives::{Address, B256, U256};
use ark_bn254::{G1Affine, G2Affine};
use serde::{Deserialize, Serialize};

use crate::bn254::BlsKeyPair;
use crate::error::PrimitivesError;

/// The unit of quorum membership: an operator set is globally unique per AVS.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OperatorSet {
    pub avs: Address,
    pub id: u32,
}

impl OperatorSet {
    pub fn new(avs: Address, id: u32) -> Self {
        Self { avs, id }
    }
}

impl std::fmt::Display for OperatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.avs, self.id)
    }
}

/// Signature scheme registered for an operator set. Discriminants match the
/// on-chain `KeyRegistrar` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    Ecdsa = 1,
    Bn254 = 2,
}

impl CurveType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self, PrimitivesError> {
        match value {
            1 => Ok(Self::Ecdsa),
            2 => Ok(Self::Bn254),
            other => Err(PrimitivesError::UnsupportedCurveType(other)),
        }
    }
}

impl std::fmt::Display for CurveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ecdsa => write!(f, "ecdsa"),
            Self::Bn254 => write!(f, "bn254"),
        }
    }
}

/// Key material supplied for one operator. Exactly one of a signing key or a
/// public key; the constructors on [`OperatorKeyInfo`] enforce that.
#[derive(Debug, Clone)]
pub enum OperatorKey {
    /// BN254 private key; public points derived on demand.
    Bn254Signer(BlsKeyPair),
    /// BN254 public points only (operator signs elsewhere).
    Bn254Public { g1: G1Affine, g2: G2Affine },
    /// ECDSA secret scalar.
    EcdsaSigner(B256),
    /// ECDSA address only.
    EcdsaAddress(Address),
}

impl OperatorKey {
    pub fn curve_type(&self) -> CurveType {
        match self {
            Self::Bn254Signer(_) | Self::Bn254Public { .. } => CurveType::Bn254,
            Self::EcdsaSigner(_) | Self::EcdsaAddress(_) => CurveType::Ecdsa,
        }
    }

    pub fn can_sign(&self) -> bool {
        matches!(self, Self::Bn254Signer(_) | Self::EcdsaSigner(_))
    }
}

/// One operator's registration input: address, key material, and its per-strategy
/// stake weights. Append-only after onboarding; re-registration is rejected by the
/// registrar.
#[derive(Debug, Clone)]
pub struct OperatorKeyInfo {
    pub operator: Address,
    pub key: OperatorKey,
    pub weights: Vec<U256>,
}

impl OperatorKeyInfo {
    /// BN254 operator from exactly one of a private key or a public key pair.
    pub fn bn254(
        operator: Address,
        private_key: Option<BlsKeyPair>,
        public_key: Option<(G1Affine, G2Affine)>,
        weights: Vec<U256>,
    ) -> Result<Self, PrimitivesError> {
        let key = match (private_key, public_key) {
            (Some(kp), None) => OperatorKey::Bn254Signer(kp),
            (None, Some((g1, g2))) => OperatorKey::Bn254Public { g1, g2 },
            _ => return Err(PrimitivesError::AmbiguousKeyMaterial(operator)),
        };
        Ok(Self {
            operator,
            key,
            weights,
        })
    }

    /// ECDSA operator from exactly one of a secret scalar or an address.
    pub fn ecdsa(
        operator: Address,
        private_key: Option<B256>,
        signing_address: Option<Address>,
        weights: Vec<U256>,
    ) -> Result<Self, PrimitivesError> {
        let key = match (private_key, signing_address) {
            (Some(sk), None) => OperatorKey::EcdsaSigner(sk),
            (None, Some(addr)) => OperatorKey::EcdsaAddress(addr),
            _ => return Err(PrimitivesError::AmbiguousKeyMaterial(operator)),
        };
        Ok(Self {
            operator,
            key,
            weights,
        })
    }

    /// The operator's G1 public key, derived or supplied. Errors on ECDSA material.
    pub fn public_g1(&self) -> Result<G1Affine, PrimitivesError> {
        match &self.key {
            OperatorKey::Bn254Signer(kp) => Ok(kp.public_g1()),
            OperatorKey::Bn254Public { g1, .. } => Ok(*g1),
            _ => Err(PrimitivesError::CurveMismatch {
                operator: self.operator,
                expected: "bn254",
                actual: "ecdsa",
            }),
        }
    }

    pub fn public_g2(&self) -> Result<G2Affine, PrimitivesError> {
        match &self.key {
            OperatorKey::Bn254Signer(kp) => Ok(kp.public_g2()),
            OperatorKey::Bn254Public { g2, .. } => Ok(*g2),
            _ => Err(PrimitivesError::CurveMismatch {
                operator: self.operator,
                expected: "bn254",
                actual: "ecdsa",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn exactly_one_key_source_is_enforced() {
        let operator = Address::repeat_byte(0x11);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let kp = BlsKeyPair::random(&mut rng);
        let pubs = (kp.public_g1(), kp.public_g2());

        assert!(OperatorKeyInfo::bn254(operator, Some(kp.clone()), Some(pubs), vec![]).is_err());
        assert!(OperatorKeyInfo::bn254(operator, None, None, vec![]).is_err());
        assert!(OperatorKeyInfo::bn254(operator, Some(kp), None, vec![]).is_ok());
        assert!(OperatorKeyInfo::bn254(operator, None, Some(pubs), vec![]).is_ok());
    }

    #[test]
    fn ecdsa_material_cannot_produce_bn254_points() {
        let operator = Address::repeat_byte(0x22);
        let info =
            OperatorKeyInfo::ecdsa(operator, Some(B256::repeat_byte(1)), None, vec![]).unwrap();
        assert!(matches!(
            info.public_g1(),
            Err(PrimitivesError::CurveMismatch { .. })
        ));
    }

    #[test]
    fn curve_type_round_trips_through_registrar_encoding() {
        assert_eq!(CurveType::from_u8(1).unwrap(), CurveType::Ecdsa);
        assert_eq!(CurveType::from_u8(2).unwrap(), CurveType::Bn254);
        assert!(CurveType::from_u8(0).is_err());
        assert_eq!(CurveType::Bn254.as_u8(), 2);
    }
}
