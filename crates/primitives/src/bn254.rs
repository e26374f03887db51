//! BN254 key material and signing for the certificate and stake-table pipeline.
//!
//! Points cross the contract boundary in the pairing-precompile layout: a G1 point
//! is 64 bytes `x || y` and a G2 point is 128 bytes `x.c1 || x.c0 || y.c1 || y.c0`,
//! all coordinates big-endian. The identity encodes as all zeros. Decoding rejects
//! anything off-curve or outside the correct subgroup, so a point that survived
//! decoding is always safe to hand to the precompiles.

use alloy_primitives::{B256, U256};
use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use ark_std::UniformRand;

use crate::error::PrimitivesError;

pub const G1_ENCODED_LEN: usize = 64;
pub const G2_ENCODED_LEN: usize = 128;

/// A BN254 signing key with its public points on both groups.
///
/// The G1 public key is what gets registered in operator tables and aggregated;
/// the G2 public key is what pairing verification runs against.
#[derive(Clone)]
pub struct BlsKeyPair {
    secret: Fr,
}

impl BlsKeyPair {
    pub fn new(secret: Fr) -> Result<Self, PrimitivesError> {
        if secret.is_zero() {
            return Err(PrimitivesError::InvalidKey("zero scalar".into()));
        }
        Ok(Self { secret })
    }

    /// Parses a 32-byte big-endian hex scalar, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, PrimitivesError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| PrimitivesError::InvalidKey(format!("bad hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(PrimitivesError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Self::new(Fr::from_be_bytes_mod_order(&bytes))
    }

    pub fn random<R: ark_std::rand::Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let secret = Fr::rand(rng);
            if let Ok(kp) = Self::new(secret) {
                return kp;
            }
        }
    }

    pub fn public_g1(&self) -> G1Affine {
        (G1Affine::generator() * self.secret).into_affine()
    }

    pub fn public_g2(&self) -> G2Affine {
        (G2Affine::generator() * self.secret).into_affine()
    }

    /// BLS signature over a 32-byte digest: `sk * H(digest)` on G1.
    pub fn sign(&self, digest: B256) -> G1Affine {
        (hash_to_g1(digest) * self.secret).into_affine()
    }
}

impl std::fmt::Debug for BlsKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the scalar
        f.debug_struct("BlsKeyPair")
            .field("public_g1", &hex::encode(g1_to_bytes(&self.public_g1())))
            .finish()
    }
}

/// Keccak-seeded try-and-increment map to G1.
///
/// Interprets the digest as an x-coordinate candidate and walks upward until
/// `x^3 + 3` is a square. BN254's G1 has cofactor one, so any curve point is in
/// the right subgroup.
pub fn hash_to_g1(digest: B256) -> G1Affine {
    let mut x = Fq::from_be_bytes_mod_order(digest.as_slice());
    loop {
        let y2 = x * x * x + Fq::from(3u64);
        if let Some(y) = y2.sqrt() {
            return G1Affine::new_unchecked(x, y);
        }
        x += Fq::one();
    }
}

/// Pairing check `e(sig, g2) == e(H(digest), pk)`.
pub fn verify_signature(signature: &G1Affine, public_key: &G2Affine, digest: B256) -> bool {
    let h = hash_to_g1(digest);
    Bn254::pairing(*signature, G2Affine::generator()) == Bn254::pairing(h, *public_key)
}

/// Like [`verify_signature`] but over the wire encoding. A signature that does not
/// decode to a valid curve point is simply not a valid signature, so this returns
/// `false` rather than an error.
pub fn verify_signature_bytes(signature: &[u8], public_key: &G2Affine, digest: B256) -> bool {
    match g1_from_bytes(signature) {
        Ok(point) => verify_signature(&point, public_key, digest),
        Err(_) => false,
    }
}

/// Elliptic-curve sum of G1 public keys. Order-independent.
pub fn aggregate_g1(points: &[G1Affine]) -> G1Affine {
    points
        .iter()
        .fold(G1Projective::zero(), |acc, p| acc + p)
        .into_affine()
}

/// Elliptic-curve sum of G2 public keys.
pub fn aggregate_g2(points: &[G2Affine]) -> G2Affine {
    points
        .iter()
        .fold(G2Projective::zero(), |acc, p| acc + p)
        .into_affine()
}

pub fn g1_to_bytes(point: &G1Affine) -> [u8; G1_ENCODED_LEN] {
    let mut out = [0u8; G1_ENCODED_LEN];
    if let Some((x, y)) = point.xy() {
        out[..32].copy_from_slice(&fq_to_be_bytes(x));
        out[32..].copy_from_slice(&fq_to_be_bytes(y));
    }
    out
}

pub fn g1_from_bytes(bytes: &[u8]) -> Result<G1Affine, PrimitivesError> {
    if bytes.len() != G1_ENCODED_LEN {
        return Err(PrimitivesError::InvalidPoint(format!(
            "G1 point must be {G1_ENCODED_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes.iter().all(|b| *b == 0) {
        return Ok(G1Affine::identity());
    }
    let x = Fq::from_be_bytes_mod_order(&bytes[..32]);
    let y = Fq::from_be_bytes_mod_order(&bytes[32..]);
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(PrimitivesError::InvalidPoint("G1 point not on curve".into()));
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrimitivesError::InvalidPoint(
            "G1 point not in correct subgroup".into(),
        ));
    }
    Ok(point)
}

pub fn g2_to_bytes(point: &G2Affine) -> [u8; G2_ENCODED_LEN] {
    let mut out = [0u8; G2_ENCODED_LEN];
    if let Some((x, y)) = point.xy() {
        out[..32].copy_from_slice(&fq_to_be_bytes(&x.c1));
        out[32..64].copy_from_slice(&fq_to_be_bytes(&x.c0));
        out[64..96].copy_from_slice(&fq_to_be_bytes(&y.c1));
        out[96..].copy_from_slice(&fq_to_be_bytes(&y.c0));
    }
    out
}

pub fn g2_from_bytes(bytes: &[u8]) -> Result<G2Affine, PrimitivesError> {
    if bytes.len() != G2_ENCODED_LEN {
        return Err(PrimitivesError::InvalidPoint(format!(
            "G2 point must be {G2_ENCODED_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes.iter().all(|b| *b == 0) {
        return Ok(G2Affine::identity());
    }
    let x = Fq2::new(
        Fq::from_be_bytes_mod_order(&bytes[32..64]),
        Fq::from_be_bytes_mod_order(&bytes[..32]),
    );
    let y = Fq2::new(
        Fq::from_be_bytes_mod_order(&bytes[96..]),
        Fq::from_be_bytes_mod_order(&bytes[64..96]),
    );
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(PrimitivesError::InvalidPoint("G2 point not on curve".into()));
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrimitivesError::InvalidPoint(
            "G2 point not in correct subgroup".into(),
        ));
    }
    Ok(point)
}

/// G1 coordinates as the `(x, y)` word pair used in calldata structs.
pub fn g1_to_u256_coords(point: &G1Affine) -> (U256, U256) {
    let bytes = g1_to_bytes(point);
    (
        U256::from_be_slice(&bytes[..32]),
        U256::from_be_slice(&bytes[32..]),
    )
}

/// G2 coordinates as the `([x.c1, x.c0], [y.c1, y.c0])` word pairs used in calldata.
pub fn g2_to_u256_coords(point: &G2Affine) -> ([U256; 2], [U256; 2]) {
    let bytes = g2_to_bytes(point);
    (
        [
            U256::from_be_slice(&bytes[..32]),
            U256::from_be_slice(&bytes[32..64]),
        ],
        [
            U256::from_be_slice(&bytes[64..96]),
            U256::from_be_slice(&bytes[96..]),
        ],
    )
}

fn fq_to_be_bytes(fq: &Fq) -> [u8; 32] {
    let bytes = fq.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;
    use rand::SeedableRng;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(0xb254)
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let kp = BlsKeyPair::random(&mut rng());
        let digest = keccak256(b"task response");

        let sig = kp.sign(digest);
        assert!(verify_signature(&sig, &kp.public_g2(), digest));
        assert!(!verify_signature(
            &sig,
            &kp.public_g2(),
            keccak256(b"other response")
        ));
    }

    #[test]
    fn tampered_signature_bytes_verify_false_not_error() {
        let kp = BlsKeyPair::random(&mut rng());
        let digest = keccak256(b"task response");
        let sig = g1_to_bytes(&kp.sign(digest));

        assert!(verify_signature_bytes(&sig, &kp.public_g2(), digest));

        for i in 0..sig.len() {
            let mut tampered = sig;
            tampered[i] ^= 0x01;
            assert!(
                !verify_signature_bytes(&tampered, &kp.public_g2(), digest),
                "byte {i} flip still verified"
            );
        }
    }

    #[test]
    fn aggregate_is_order_independent() {
        let mut r = rng();
        let keys: Vec<BlsKeyPair> = (0..5).map(|_| BlsKeyPair::random(&mut r)).collect();
        let pubs: Vec<G1Affine> = keys.iter().map(|k| k.public_g1()).collect();

        let forward = aggregate_g1(&pubs);
        let mut reversed = pubs.clone();
        reversed.reverse();
        assert_eq!(forward, aggregate_g1(&reversed));

        // and it really is the point sum
        let expected = pubs
            .iter()
            .fold(G1Projective::zero(), |acc, p| acc + p)
            .into_affine();
        assert_eq!(forward, expected);
    }

    #[test]
    fn aggregate_signature_verifies_against_aggregate_key() {
        let mut r = rng();
        let keys: Vec<BlsKeyPair> = (0..4).map(|_| BlsKeyPair::random(&mut r)).collect();
        let digest = keccak256(b"shared digest");

        let sigs: Vec<G1Affine> = keys.iter().map(|k| k.sign(digest)).collect();
        let agg_sig = aggregate_g1(&sigs);
        let agg_pk = aggregate_g2(&keys.iter().map(|k| k.public_g2()).collect::<Vec<_>>());

        assert!(verify_signature(&agg_sig, &agg_pk, digest));
    }

    #[test]
    fn point_encoding_roundtrip() {
        let kp = BlsKeyPair::random(&mut rng());

        let g1 = kp.public_g1();
        assert_eq!(g1, g1_from_bytes(&g1_to_bytes(&g1)).unwrap());

        let g2 = kp.public_g2();
        assert_eq!(g2, g2_from_bytes(&g2_to_bytes(&g2)).unwrap());
    }

    #[test]
    fn identity_encodes_as_zeros() {
        let id = G1Affine::identity();
        assert_eq!(g1_to_bytes(&id), [0u8; G1_ENCODED_LEN]);
        assert_eq!(id, g1_from_bytes(&[0u8; G1_ENCODED_LEN]).unwrap());
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let mut bytes = [0u8; G1_ENCODED_LEN];
        bytes[31] = 1;
        bytes[63] = 7; // (1, 7) is not on y^2 = x^3 + 3
        assert!(matches!(
            g1_from_bytes(&bytes),
            Err(PrimitivesError::InvalidPoint(_))
        ));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(g1_from_bytes(&[0u8; 63]).is_err());
        assert!(g2_from_bytes(&[0u8; 127]).is_err());
    }

    #[test]
    fn hash_to_g1_is_deterministic_and_on_curve() {
        let digest = keccak256(b"root");
        let a = hash_to_g1(digest);
        let b = hash_to_g1(digest);
        assert_eq!(a, b);
        assert!(a.is_on_curve());
    }
}
