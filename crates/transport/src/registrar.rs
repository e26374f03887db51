//! Operator key registration against the on-chain key registrar.
//!
//! Registration is append-only: a key that is already registered for a set
//! stays registered, and a second attempt reverts. The driver here treats both
//! the pre-check and that revert as "skipped" so re-runs converge instead of
//! failing.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use stakewire_chain::{ChainClient, ChainError, TransactionSigner};
use stakewire_contracts::bindings::IKeyRegistrar;
use stakewire_contracts::call_and_decode;
use stakewire_contracts::convert::{g1_point, g2_point};
use stakewire_primitives::bn254::g1_to_bytes;
use stakewire_primitives::{CurveType, OperatorKey, OperatorKeyInfo, OperatorSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyRegistrar: Send + Sync {
    async fn configure_operator_set(
        &self,
        operator_set: OperatorSet,
        curve_type: CurveType,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError>;

    async fn is_registered(
        &self,
        operator_set: OperatorSet,
        operator: Address,
    ) -> Result<bool, ChainError>;

    /// Canonical on-chain encoding of a BN254 key pair, used both as the
    /// registration payload and as the preimage of the registration digest.
    async fn encode_bn254_key_data(
        &self,
        g1: (U256, U256),
        g2: ([U256; 2], [U256; 2]),
    ) -> Result<Bytes, ChainError>;

    async fn registration_message_hash(
        &self,
        operator: Address,
        operator_set: OperatorSet,
        key_data: Bytes,
        curve_type: CurveType,
    ) -> Result<B256, ChainError>;

    async fn register_key(
        &self,
        operator: Address,
        operator_set: OperatorSet,
        key_data: Bytes,
        signature: Bytes,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError>;
}

/// Provider-backed [`KeyRegistrar`].
pub struct KeyRegistrarClient {
    client: ChainClient,
    address: Address,
    signer: Arc<dyn TransactionSigner>,
}

impl KeyRegistrarClient {
    pub fn new(client: ChainClient, address: Address, signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            client,
            address,
            signer,
        }
    }

    async fn send(
        &self,
        calldata: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<B256, ChainError> {
        let receipt = self
            .signer
            .send_transaction(&self.client, self.address, calldata.into(), cancel)
            .await?;
        Ok(receipt.transaction_hash)
    }
}

#[async_trait]
impl KeyRegistrar for KeyRegistrarClient {
    async fn configure_operator_set(
        &self,
        operator_set: OperatorSet,
        curve_type: CurveType,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError> {
        let call = IKeyRegistrar::configureOperatorSetCall {
            operatorSet: operator_set.into(),
            curveType: curve_type.as_u8(),
        };
        self.send(call.abi_encode(), &cancel).await
    }

    async fn is_registered(
        &self,
        operator_set: OperatorSet,
        operator: Address,
    ) -> Result<bool, ChainError> {
        let ret = call_and_decode(
            IKeyRegistrar::isRegisteredCall {
                operatorSet: operator_set.into(),
                operator,
            },
            self.address,
            &self.client,
        )
        .await?;
        Ok(ret._0)
    }

    async fn encode_bn254_key_data(
        &self,
        g1: (U256, U256),
        g2: ([U256; 2], [U256; 2]),
    ) -> Result<Bytes, ChainError> {
        let ret = call_and_decode(
            IKeyRegistrar::encodeBN254KeyDataCall {
                g1Point: stakewire_contracts::bindings::BN254G1Point { x: g1.0, y: g1.1 },
                g2Point: stakewire_contracts::bindings::BN254G2Point { x: g2.0, y: g2.1 },
            },
            self.address,
            &self.client,
        )
        .await?;
        Ok(ret._0)
    }

    async fn registration_message_hash(
        &self,
        operator: Address,
        operator_set: OperatorSet,
        key_data: Bytes,
        curve_type: CurveType,
    ) -> Result<B256, ChainError> {
        let hash = match curve_type {
            CurveType::Bn254 => {
                call_and_decode(
                    IKeyRegistrar::getBN254KeyRegistrationMessageHashCall {
                        operator,
                        operatorSet: operator_set.into(),
                        keyData: key_data,
                    },
                    self.address,
                    &self.client,
                )
                .await?
                ._0
            }
            CurveType::Ecdsa => {
                call_and_decode(
                    IKeyRegistrar::getECDSAKeyRegistrationMessageHashCall {
                        operator,
                        operatorSet: operator_set.into(),
                        keyData: key_data,
                    },
                    self.address,
                    &self.client,
                )
                .await?
                ._0
            }
        };
        Ok(hash)
    }

    async fn register_key(
        &self,
        operator: Address,
        operator_set: OperatorSet,
        key_data: Bytes,
        signature: Bytes,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError> {
        let call = IKeyRegistrar::registerKeyCall {
            operator,
            operatorSet: operator_set.into(),
            keyData: key_data,
            signature,
        };
        self.send(call.abi_encode(), &cancel).await
    }
}

/// What happened to each operator during a registration pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub registered: Vec<Address>,
    pub skipped: Vec<Address>,
    pub failed: Vec<(Address, String)>,
}

impl RegistrationOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registers each operator's key for the set, skipping ones already on-chain.
/// One operator failing does not abort the pass; failures are collected and
/// reported so the caller decides whether the run may proceed.
pub async fn register_operator_keys(
    registrar: &dyn KeyRegistrar,
    operator_set: OperatorSet,
    curve_type: CurveType,
    operators: &[OperatorKeyInfo],
    cancel: CancellationToken,
) -> RegistrationOutcome {
    let mut outcome = RegistrationOutcome::default();
    for operator in operators {
        match register_one(registrar, operator_set, curve_type, operator, &cancel).await {
            Ok(Registration::Registered) => {
                info!(
                    target: "stakewire::transport",
                    operator = %operator.operator,
                    %operator_set,
                    "registered operator key"
                );
                outcome.registered.push(operator.operator);
            }
            Ok(Registration::Skipped) => {
                debug!(
                    target: "stakewire::transport",
                    operator = %operator.operator,
                    %operator_set,
                    "operator key already registered"
                );
                outcome.skipped.push(operator.operator);
            }
            Err(err) => {
                warn!(
                    target: "stakewire::transport",
                    operator = %operator.operator,
                    %operator_set,
                    error = %err,
                    "operator key registration failed"
                );
                outcome.failed.push((operator.operator, err));
            }
        }
    }
    outcome
}

enum Registration {
    Registered,
    Skipped,
}

async fn register_one(
    registrar: &dyn KeyRegistrar,
    operator_set: OperatorSet,
    curve_type: CurveType,
    operator: &OperatorKeyInfo,
    cancel: &CancellationToken,
) -> Result<Registration, String> {
    if operator.key.curve_type() != curve_type {
        return Err(format!(
            "key material is {}, operator set expects {curve_type}",
            operator.key.curve_type()
        ));
    }
    let already = registrar
        .is_registered(operator_set, operator.operator)
        .await
        .map_err(|e| e.to_string())?;
    if already {
        return Ok(Registration::Skipped);
    }

    let (key_data, signature) = match &operator.key {
        OperatorKey::Bn254Signer(kp) => {
            let g1 = g1_point(&kp.public_g1());
            let g2 = g2_point(&kp.public_g2());
            let key_data = registrar
                .encode_bn254_key_data((g1.x, g1.y), (g2.x, g2.y))
                .await
                .map_err(|e| e.to_string())?;
            let digest = registrar
                .registration_message_hash(
                    operator.operator,
                    operator_set,
                    key_data.clone(),
                    CurveType::Bn254,
                )
                .await
                .map_err(|e| e.to_string())?;
            let sig = kp.sign(digest);
            (key_data, Bytes::from(g1_to_bytes(&sig).to_vec()))
        }
        OperatorKey::EcdsaSigner(secret) => {
            let signer = PrivateKeySigner::from_bytes(secret).map_err(|e| e.to_string())?;
            let key_data = Bytes::from(signer.address().to_vec());
            let digest = registrar
                .registration_message_hash(
                    operator.operator,
                    operator_set,
                    key_data.clone(),
                    CurveType::Ecdsa,
                )
                .await
                .map_err(|e| e.to_string())?;
            let sig = signer.sign_hash_sync(&digest).map_err(|e| e.to_string())?;
            (key_data, Bytes::from(sig.as_bytes().to_vec()))
        }
        OperatorKey::Bn254Public { .. } | OperatorKey::EcdsaAddress(_) => {
            return Err("no signing material for registration".into());
        }
    };

    match registrar
        .register_key(
            operator.operator,
            operator_set,
            key_data,
            signature,
            cancel.clone(),
        )
        .await
    {
        Ok(_) => Ok(Registration::Registered),
        // lost the race with another registration; same terminal state
        Err(err) if err.is_already_registered() => Ok(Registration::Skipped),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use stakewire_chain::ChainError;
    use stakewire_primitives::bn254::BlsKeyPair;

    fn bn254_operator(byte: u8, seed: u64) -> OperatorKeyInfo {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        OperatorKeyInfo::bn254(
            Address::repeat_byte(byte),
            Some(BlsKeyPair::random(&mut rng)),
            None,
            vec![U256::from(100)],
        )
        .unwrap()
    }

    fn set() -> OperatorSet {
        OperatorSet::new(Address::repeat_byte(0xaa), 1)
    }

    #[tokio::test]
    async fn already_registered_operators_are_skipped_without_writes() {
        let op = bn254_operator(0x01, 1);

        let mut registrar = MockKeyRegistrar::new();
        registrar.expect_is_registered().returning(|_, _| Ok(true));
        registrar.expect_register_key().times(0);

        let outcome = register_operator_keys(
            &registrar,
            set(),
            CurveType::Bn254,
            std::slice::from_ref(&op),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.skipped, vec![op.operator]);
        assert!(outcome.registered.is_empty());
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn registers_bn254_key_with_registrar_provided_digest() {
        let op = bn254_operator(0x02, 2);
        let operator = op.operator;

        let mut registrar = MockKeyRegistrar::new();
        registrar.expect_is_registered().returning(|_, _| Ok(false));
        registrar
            .expect_encode_bn254_key_data()
            .returning(|_, _| Ok(Bytes::from_static(b"keydata")));
        registrar
            .expect_registration_message_hash()
            .returning(|_, _, _, _| Ok(B256::repeat_byte(0x33)));
        registrar
            .expect_register_key()
            .withf(move |op_addr, _, key_data, signature, _| {
                *op_addr == operator
                    && key_data.as_ref() == b"keydata"
                    && signature.len() == stakewire_primitives::bn254::G1_ENCODED_LEN
            })
            .returning(|_, _, _, _, _| Ok(B256::repeat_byte(0x44)));

        let outcome = register_operator_keys(
            &registrar,
            set(),
            CurveType::Bn254,
            &[op],
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.registered, vec![operator]);
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn registration_race_is_absorbed_as_skipped() {
        let op = bn254_operator(0x03, 3);

        let mut registrar = MockKeyRegistrar::new();
        registrar.expect_is_registered().returning(|_, _| Ok(false));
        registrar
            .expect_encode_bn254_key_data()
            .returning(|_, _| Ok(Bytes::from_static(b"keydata")));
        registrar
            .expect_registration_message_hash()
            .returning(|_, _, _, _| Ok(B256::repeat_byte(0x33)));
        registrar
            .expect_register_key()
            .returning(|_, _, _, _, _| Err(ChainError::revert("registerKey", "KeyAlreadyRegistered")));

        let outcome = register_operator_keys(
            &registrar,
            set(),
            CurveType::Bn254,
            &[op.clone()],
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.skipped, vec![op.operator]);
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_pass() {
        let good = bn254_operator(0x04, 4);
        // public-only material cannot produce a registration signature
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let kp = BlsKeyPair::random(&mut rng);
        let bad = OperatorKeyInfo::bn254(
            Address::repeat_byte(0x05),
            None,
            Some((kp.public_g1(), kp.public_g2())),
            vec![U256::from(1)],
        )
        .unwrap();

        let mut registrar = MockKeyRegistrar::new();
        registrar.expect_is_registered().returning(|_, _| Ok(false));
        registrar
            .expect_encode_bn254_key_data()
            .returning(|_, _| Ok(Bytes::from_static(b"keydata")));
        registrar
            .expect_registration_message_hash()
            .returning(|_, _, _, _| Ok(B256::repeat_byte(0x33)));
        registrar
            .expect_register_key()
            .returning(|_, _, _, _, _| Ok(B256::repeat_byte(0x44)));

        let outcome = register_operator_keys(
            &registrar,
            set(),
            CurveType::Bn254,
            &[bad.clone(), good.clone()],
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.registered, vec![good.operator]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, bad.operator);
    }

    #[tokio::test]
    async fn curve_mismatch_is_reported_not_sent() {
        let op = OperatorKeyInfo::ecdsa(
            Address::repeat_byte(0x06),
            Some(B256::repeat_byte(0x01)),
            None,
            vec![U256::from(1)],
        )
        .unwrap();

        let mut registrar = MockKeyRegistrar::new();
        registrar.expect_is_registered().times(0);
        registrar.expect_register_key().times(0);

        let outcome = register_operator_keys(
            &registrar,
            set(),
            CurveType::Bn254,
            &[op],
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.failed.len(), 1);
    }
}
