//! Aggregate BN254 operator-set info: the per-operator Merkle tree, the
//! aggregate public key, and the summed weight vector that destination chains
//! store alongside the table.

use alloy_primitives::{Address, B256, U256};
use ark_bn254::G1Affine;
use async_trait::async_trait;
use stakewire_chain::{ChainClient, ChainError};
use stakewire_contracts::bindings::IOperatorTableCalculator;
use stakewire_contracts::call_and_decode;
use stakewire_contracts::convert::operator_info;
use stakewire_primitives::bn254::aggregate_g1;
use stakewire_primitives::{MerkleTree, OperatorKeyInfo};
use tracing::warn;

use crate::error::TransportError;

/// Leaf hashing is delegated so the local tree always matches what the
/// on-chain calculator would produce for the same operator info.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeafHasher: Send + Sync {
    async fn operator_info_leaf_hash(
        &self,
        pubkey: G1Affine,
        weights: Vec<U256>,
    ) -> Result<B256, ChainError>;
}

/// [`LeafHasher`] backed by the operator table calculator contract.
pub struct TableCalculatorLeafHasher {
    client: ChainClient,
    address: Address,
}

impl TableCalculatorLeafHasher {
    pub fn new(client: ChainClient, address: Address) -> Self {
        Self { client, address }
    }
}

#[async_trait]
impl LeafHasher for TableCalculatorLeafHasher {
    async fn operator_info_leaf_hash(
        &self,
        pubkey: G1Affine,
        weights: Vec<U256>,
    ) -> Result<B256, ChainError> {
        let ret = call_and_decode(
            IOperatorTableCalculator::calculateOperatorInfoLeafHashCall {
                operatorInfo: operator_info(&pubkey, weights),
            },
            self.address,
            &self.client,
        )
        .await?;
        Ok(ret._0)
    }
}

/// The computed aggregate for one operator set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSetInfo {
    pub operator_info_tree_root: B256,
    pub num_operators: U256,
    pub aggregate_pubkey: G1Affine,
    pub total_weights: Vec<U256>,
}

/// Builds [`OperatorSetInfo`] from the operators' key material and weights.
pub struct OperatorInfoMerkleBuilder;

impl OperatorInfoMerkleBuilder {
    /// Aggregates keys and weights and roots the per-operator leaves.
    ///
    /// The first operator's weight vector fixes the expected length: shorter
    /// vectors are zero-extended, entries past that length are dropped with a
    /// warning. A single operator's leaf is its own root.
    pub async fn build(
        hasher: &dyn LeafHasher,
        operators: &[OperatorKeyInfo],
    ) -> Result<OperatorSetInfo, TransportError> {
        if operators.is_empty() {
            return Err(TransportError::NoOperators);
        }

        let baseline = operators[0].weights.len();
        let mut total_weights = vec![U256::ZERO; baseline];
        let mut pubkeys = Vec::with_capacity(operators.len());
        let mut leaves = Vec::with_capacity(operators.len());

        for operator in operators {
            if operator.weights.len() > baseline {
                warn!(
                    target: "stakewire::transport",
                    operator = %operator.operator,
                    expected = baseline,
                    actual = operator.weights.len(),
                    "operator weight vector longer than baseline; extra entries ignored"
                );
            }
            for (total, weight) in total_weights.iter_mut().zip(&operator.weights) {
                *total += *weight;
            }

            let pubkey = operator.public_g1()?;
            pubkeys.push(pubkey);
            let leaf = hasher
                .operator_info_leaf_hash(pubkey, operator.weights.clone())
                .await?;
            leaves.push(leaf);
        }

        let operator_info_tree_root = if leaves.len() == 1 {
            leaves[0]
        } else {
            MerkleTree::new(leaves)?.root()
        };

        Ok(OperatorSetInfo {
            operator_info_tree_root,
            num_operators: U256::from(operators.len()),
            aggregate_pubkey: aggregate_g1(&pubkeys),
            total_weights,
        })
    }
}
