//! Stake-table calculation: a reproducible snapshot of every reserved operator
//! set's table on the source chain, rooted under a single global Merkle root.
//!
//! All reads are pinned to one reference block so reruns at the same block
//! produce the same root. Operator sets are ordered canonically (by AVS, then
//! set id) and their position in that order is the index destination chains
//! verify proofs against.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use stakewire_chain::{ChainClient, ChainError};
use stakewire_contracts::bindings::{ICrossChainRegistry, IOperatorTableCalculator};
use stakewire_contracts::call_and_decode_at;
use stakewire_primitives::{MerkleProof, MerkleTree, OperatorSet};
use tracing::{debug, info};

use crate::error::TransportError;

/// One destination chain as advertised by the cross-chain registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedChain {
    pub chain_id: u64,
    pub table_updater: Address,
}

/// The registry stores chain ids as uint256; anything past u64 is garbage and
/// must surface as an error, not a panic.
fn chain_id_u64(value: U256) -> Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| {
        ChainError::revert(
            "getSupportedChains",
            format!("chain id {value} does not fit in u64"),
        )
    })
}

/// Read surface of the cross-chain registry, pinned to a reference block.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryView: Send + Sync {
    async fn supported_chains(&self, at_block: u64) -> Result<Vec<SupportedChain>, ChainError>;

    async fn active_generation_reservations(
        &self,
        at_block: u64,
    ) -> Result<Vec<OperatorSet>, ChainError>;

    async fn operator_table_calculator(
        &self,
        operator_set: OperatorSet,
        at_block: u64,
    ) -> Result<Address, ChainError>;

    async fn operator_table_bytes(
        &self,
        calculator: Address,
        operator_set: OperatorSet,
        at_block: u64,
    ) -> Result<Bytes, ChainError>;
}

/// Provider-backed [`RegistryView`] on the source chain.
pub struct CrossChainRegistryClient {
    client: ChainClient,
    address: Address,
}

impl CrossChainRegistryClient {
    pub fn new(client: ChainClient, address: Address) -> Self {
        Self { client, address }
    }
}

#[async_trait]
impl RegistryView for CrossChainRegistryClient {
    async fn supported_chains(&self, at_block: u64) -> Result<Vec<SupportedChain>, ChainError> {
        let ret = call_and_decode_at(
            ICrossChainRegistry::getSupportedChainsCall {},
            self.address,
            &self.client,
            at_block,
        )
        .await?;
        ret.chainIds
            .into_iter()
            .zip(ret.tableUpdaters)
            .map(|(chain_id, table_updater)| {
                Ok(SupportedChain {
                    chain_id: chain_id_u64(chain_id)?,
                    table_updater,
                })
            })
            .collect()
    }

    async fn active_generation_reservations(
        &self,
        at_block: u64,
    ) -> Result<Vec<OperatorSet>, ChainError> {
        let ret = call_and_decode_at(
            ICrossChainRegistry::getActiveGenerationReservationsCall {},
            self.address,
            &self.client,
            at_block,
        )
        .await?;
        Ok(ret.operatorSets.into_iter().map(Into::into).collect())
    }

    async fn operator_table_calculator(
        &self,
        operator_set: OperatorSet,
        at_block: u64,
    ) -> Result<Address, ChainError> {
        let ret = call_and_decode_at(
            ICrossChainRegistry::getOperatorTableCalculatorCall {
                operatorSet: operator_set.into(),
            },
            self.address,
            &self.client,
            at_block,
        )
        .await?;
        Ok(ret._0)
    }

    async fn operator_table_bytes(
        &self,
        calculator: Address,
        operator_set: OperatorSet,
        at_block: u64,
    ) -> Result<Bytes, ChainError> {
        let ret = call_and_decode_at(
            IOperatorTableCalculator::calculateOperatorTableBytesCall {
                operatorSet: operator_set.into(),
            },
            calculator,
            &self.client,
            at_block,
        )
        .await?;
        Ok(ret._0)
    }
}

/// One operator set's slot in the distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionEntry {
    pub operator_set: OperatorSet,
    pub table: Bytes,
    /// Position in the canonical ordering; the proof index on-chain.
    pub index: u32,
}

/// The calculated snapshot: every reserved set's table, the tree over their
/// leaves, and the block it was all read at.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub global_root: B256,
    pub reference_block: u64,
    pub entries: Vec<DistributionEntry>,
    tree: MerkleTree,
}

impl Distribution {
    pub fn entry(&self, operator_set: OperatorSet) -> Option<&DistributionEntry> {
        self.entries
            .iter()
            .find(|e| e.operator_set == operator_set)
    }

    pub fn contains(&self, operator_set: OperatorSet) -> bool {
        self.entry(operator_set).is_some()
    }

    pub fn proof(&self, entry: &DistributionEntry) -> Result<MerkleProof, TransportError> {
        Ok(self.tree.proof(entry.index as usize)?)
    }
}

/// Leaf binding an operator set identity to its table bytes.
fn table_leaf(operator_set: OperatorSet, table: &Bytes) -> B256 {
    let mut preimage = Vec::with_capacity(20 + 4 + table.len());
    preimage.extend_from_slice(operator_set.avs.as_slice());
    preimage.extend_from_slice(&operator_set.id.to_be_bytes());
    preimage.extend_from_slice(table);
    keccak256(preimage)
}

pub struct StakeTableCalculator<R> {
    registry: R,
}

impl<R: RegistryView> StakeTableCalculator<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Calculates the distribution at the given reference block.
    ///
    /// Read-only and deterministic for a fixed block. Fails if the registry
    /// advertises no reservations or the same set twice.
    pub async fn calculate(&self, reference_block: u64) -> Result<Distribution, TransportError> {
        let mut sets = self
            .registry
            .active_generation_reservations(reference_block)
            .await?;
        if sets.is_empty() {
            return Err(TransportError::NoActiveReservations);
        }
        sets.sort();
        for pair in sets.windows(2) {
            if pair[0] == pair[1] {
                return Err(TransportError::DuplicateReservation(pair[0]));
            }
        }

        let mut entries = Vec::with_capacity(sets.len());
        let mut leaves = Vec::with_capacity(sets.len());
        for (index, operator_set) in sets.into_iter().enumerate() {
            let calculator = self
                .registry
                .operator_table_calculator(operator_set, reference_block)
                .await
                .map_err(|source| TransportError::TableFetch {
                    operator_set,
                    source,
                })?;
            let table = self
                .registry
                .operator_table_bytes(calculator, operator_set, reference_block)
                .await
                .map_err(|source| TransportError::TableFetch {
                    operator_set,
                    source,
                })?;

            debug!(
                target: "stakewire::transport",
                %operator_set,
                index,
                table_len = table.len(),
                "fetched operator table"
            );
            leaves.push(table_leaf(operator_set, &table));
            entries.push(DistributionEntry {
                operator_set,
                table,
                index: index as u32,
            });
        }

        let tree = MerkleTree::new(leaves)?;
        let global_root = tree.root();
        info!(
            target: "stakewire::transport",
            %global_root,
            reference_block,
            operator_sets = entries.len(),
            "calculated stake table distribution"
        );

        Ok(Distribution {
            global_root,
            reference_block,
            entries,
            tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(avs_byte: u8, id: u32) -> OperatorSet {
        OperatorSet::new(Address::repeat_byte(avs_byte), id)
    }

    fn registry_with(sets: Vec<OperatorSet>) -> MockRegistryView {
        let mut registry = MockRegistryView::new();
        registry
            .expect_active_generation_reservations()
            .returning(move |_| Ok(sets.clone()));
        registry
            .expect_operator_table_calculator()
            .returning(|_, _| Ok(Address::repeat_byte(0xca)));
        registry
            .expect_operator_table_bytes()
            .returning(|_, operator_set, _| {
                Ok(Bytes::from(format!("table-{}", operator_set.id).into_bytes()))
            });
        registry
    }

    #[test]
    fn oversized_chain_id_is_an_error_not_a_panic() {
        assert_eq!(chain_id_u64(U256::from(8453u64)).unwrap(), 8453);
        assert_eq!(chain_id_u64(U256::from(u64::MAX)).unwrap(), u64::MAX);

        let err = chain_id_u64(U256::from(u64::MAX) + U256::from(1)).unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("does not fit in u64"));
    }

    #[tokio::test]
    async fn empty_reservations_fail() {
        let calc = StakeTableCalculator::new(registry_with(vec![]));
        assert!(matches!(
            calc.calculate(100).await,
            Err(TransportError::NoActiveReservations)
        ));
    }

    #[tokio::test]
    async fn duplicate_reservations_fail() {
        let calc = StakeTableCalculator::new(registry_with(vec![set(1, 1), set(1, 1)]));
        assert!(matches!(
            calc.calculate(100).await,
            Err(TransportError::DuplicateReservation(_))
        ));
    }

    #[tokio::test]
    async fn entries_are_canonically_ordered_and_indexed() {
        // deliberately unsorted input
        let calc =
            StakeTableCalculator::new(registry_with(vec![set(2, 1), set(1, 5), set(1, 2)]));
        let dist = calc.calculate(100).await.unwrap();

        let order: Vec<OperatorSet> = dist.entries.iter().map(|e| e.operator_set).collect();
        assert_eq!(order, vec![set(1, 2), set(1, 5), set(2, 1)]);
        let indices: Vec<u32> = dist.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn proofs_verify_against_the_global_root() {
        let calc = StakeTableCalculator::new(registry_with(vec![set(1, 1), set(1, 2), set(2, 7)]));
        let dist = calc.calculate(100).await.unwrap();

        for entry in &dist.entries {
            let proof = dist.proof(entry).unwrap();
            assert_eq!(proof.leaf, table_leaf(entry.operator_set, &entry.table));
            assert!(proof.verify(dist.global_root));
        }
    }

    #[tokio::test]
    async fn same_block_same_root() {
        let sets = vec![set(1, 1), set(2, 2)];
        let a = StakeTableCalculator::new(registry_with(sets.clone()))
            .calculate(42)
            .await
            .unwrap();
        let b = StakeTableCalculator::new(registry_with(sets))
            .calculate(42)
            .await
            .unwrap();
        assert_eq!(a.global_root, b.global_root);
    }

    #[tokio::test]
    async fn scope_lookup_finds_only_present_sets() {
        let calc = StakeTableCalculator::new(registry_with(vec![set(1, 1)]));
        let dist = calc.calculate(100).await.unwrap();

        assert!(dist.contains(set(1, 1)));
        assert!(!dist.contains(set(1, 2)));
    }
}
