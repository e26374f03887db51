//! Generator maintenance for destination chains.
//!
//! The generator is a synthetic single-operator set, backed by the transport
//! BLS key, that the table updater trusts to certify global roots. Its set id
//! is shared mutable state on-chain: reconfiguring it must never leave it
//! pointing at the operator set that is about to be updated, or the update
//! would invalidate the certificate chain mid-flight.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use stakewire_chain::ChainError;
use stakewire_contracts::convert::operator_info;
use stakewire_primitives::bn254::BlsKeyPair;
use stakewire_primitives::OperatorSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::updater::{GeneratorInfo, GlobalRootCertificate, TableUpdater};

/// Picks the next generator set id given the current one and the id of the
/// operator set being updated. Alternates between ids 1 and 2, and flips once
/// more if the alternation would collide with the updating set.
pub fn choose_generator_id(current: u32, updating: u32) -> u32 {
    let candidate = if current == 1 { 2 } else { 1 };
    if candidate == updating {
        3 - candidate
    } else {
        candidate
    }
}

/// Owns the transport BLS key and drives generator rotation and global-root
/// certification for one AVS.
pub struct GeneratorCoordinator {
    avs: Address,
    transport_key: BlsKeyPair,
}

impl GeneratorCoordinator {
    pub fn new(avs: Address, transport_key: BlsKeyPair) -> Self {
        Self { avs, transport_key }
    }

    /// The single-operator set info the generator is installed with: one
    /// operator holding the transport key with unit weight.
    pub fn generator_info(&self) -> GeneratorInfo {
        let pubkey = self.transport_key.public_g1();
        let weights = vec![U256::from(1)];
        let leaf = keccak256(operator_info(&pubkey, weights.clone()).abi_encode());
        GeneratorInfo {
            // single leaf, so the tree root is the leaf itself
            operator_info_tree_root: leaf,
            num_operators: U256::from(1),
            aggregate_pubkey: pubkey,
            total_weights: weights,
        }
    }

    /// Rotates the generator to a set id that cannot collide with the set
    /// being updated, and reinstalls the transport key as its sole operator.
    pub async fn reconfigure(
        &self,
        updater: &dyn TableUpdater,
        updating_id: u32,
        cancel: CancellationToken,
    ) -> Result<OperatorSet, ChainError> {
        let current = updater.generator().await?;
        let next = OperatorSet::new(self.avs, choose_generator_id(current.id, updating_id));
        info!(
            target: "stakewire::transport",
            chain_id = updater.chain_id(),
            current = %current,
            next = %next,
            "rotating generator"
        );
        let tx = updater
            .update_generator(next, self.generator_info(), cancel)
            .await?;
        info!(
            target: "stakewire::transport",
            chain_id = updater.chain_id(),
            tx = %tx,
            "generator updated"
        );
        Ok(next)
    }

    /// Certifies a global root for one destination chain. The digest binds the
    /// root to the reference timestamp and block the distribution was sampled
    /// at, so a certificate cannot be replayed for a different snapshot.
    pub fn sign_global_root(
        &self,
        global_root: B256,
        reference_timestamp: u32,
        reference_block_number: u32,
    ) -> GlobalRootCertificate {
        let digest = keccak256(
            (global_root, reference_timestamp, reference_block_number).abi_encode(),
        );
        GlobalRootCertificate {
            reference_timestamp,
            message_hash: digest,
            signature: self.transport_key.sign(digest),
            apk: self.transport_key.public_g2(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::MockTableUpdater;
    use rand::SeedableRng;
    use stakewire_primitives::bn254::verify_signature;

    fn coordinator() -> GeneratorCoordinator {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        GeneratorCoordinator::new(Address::repeat_byte(0xaa), BlsKeyPair::random(&mut rng))
    }

    #[test]
    fn generator_id_alternates_between_one_and_two() {
        assert_eq!(choose_generator_id(1, 99), 2);
        assert_eq!(choose_generator_id(2, 99), 1);
        // anything else resets to 1
        assert_eq!(choose_generator_id(0, 99), 1);
        assert_eq!(choose_generator_id(7, 99), 1);
    }

    #[test]
    fn generator_id_never_collides_with_updating_set() {
        for current in 0..5 {
            for updating in 0..5 {
                let chosen = choose_generator_id(current, updating);
                assert_ne!(chosen, updating, "current={current} updating={updating}");
                assert!(chosen == 1 || chosen == 2);
            }
        }
    }

    #[test]
    fn generator_info_is_a_unit_weight_singleton() {
        let info = coordinator().generator_info();
        assert_eq!(info.num_operators, U256::from(1));
        assert_eq!(info.total_weights, vec![U256::from(1)]);
        assert_ne!(info.operator_info_tree_root, B256::ZERO);
    }

    #[test]
    fn global_root_certificate_verifies_and_binds_snapshot() {
        let coord = coordinator();
        let root = B256::repeat_byte(0x42);

        let cert = coord.sign_global_root(root, 1000, 50);
        assert!(verify_signature(&cert.signature, &cert.apk, cert.message_hash));

        // a different snapshot must produce a different digest
        let other = coord.sign_global_root(root, 1000, 51);
        assert_ne!(cert.message_hash, other.message_hash);
    }

    #[tokio::test]
    async fn reconfigure_rotates_away_from_the_updating_set() {
        let coord = coordinator();
        let avs = Address::repeat_byte(0xaa);

        let mut updater = MockTableUpdater::new();
        updater.expect_chain_id().return_const(1u64);
        updater
            .expect_generator()
            .returning(move || Ok(OperatorSet::new(avs, 1)));
        updater
            .expect_update_generator()
            .withf(move |set, info, _| {
                set.id == 2 && set.avs == avs && info.num_operators == U256::from(1)
            })
            .returning(|_, _, _| Ok(B256::repeat_byte(0x11)));

        let next = coord
            .reconfigure(&updater, 5, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(next.id, 2);
    }
}
