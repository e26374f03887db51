//! Keccak binary Merkle tree over 32-byte leaves.
//!
//! Leaf order is positional: the index a leaf was inserted at is the index its
//! proof verifies against, and the same order must be used when the root is
//! recomputed on-chain. Leaves are padded with zero hashes up to the next power
//! of two, so every proof for a tree of `n` leaves has `ceil(log2(n))` siblings.

use alloy_primitives::{keccak256, B256};

use crate::error::PrimitivesError;

#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `layers[0]` is the padded leaf layer, the last layer is `[root]`.
    layers: Vec<Vec<B256>>,
    leaf_count: usize,
}

impl MerkleTree {
    /// Builds a tree over the given leaves. At least one leaf is required; a
    /// single-leaf tree's root is that leaf.
    pub fn new(leaves: Vec<B256>) -> Result<Self, PrimitivesError> {
        if leaves.is_empty() {
            return Err(PrimitivesError::EmptyTree);
        }
        let leaf_count = leaves.len();
        let mut bottom = leaves;
        bottom.resize(leaf_count.next_power_of_two(), B256::ZERO);

        let mut layers = vec![bottom];
        while layers.last().expect("non-empty").len() > 1 {
            let prev = layers.last().expect("non-empty");
            let next = prev
                .chunks_exact(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            layers.push(next);
        }

        Ok(Self { layers, leaf_count })
    }

    pub fn root(&self) -> B256 {
        self.layers.last().expect("non-empty")[0]
    }

    /// Number of real (unpadded) leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn proof(&self, index: usize) -> Result<MerkleProof, PrimitivesError> {
        if index >= self.leaf_count {
            return Err(PrimitivesError::LeafIndexOutOfRange {
                index,
                leaves: self.leaf_count,
            });
        }

        let mut siblings = Vec::with_capacity(self.layers.len() - 1);
        let mut i = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            siblings.push(layer[i ^ 1]);
            i >>= 1;
        }

        Ok(MerkleProof {
            leaf: self.layers[0][index],
            index: index as u32,
            siblings,
        })
    }
}

/// A membership proof for one leaf, verifiable with only the leaf, its index,
/// and the sibling path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: B256,
    pub index: u32,
    pub siblings: Vec<B256>,
}

impl MerkleProof {
    pub fn verify(&self, root: B256) -> bool {
        let mut acc = self.leaf;
        let mut index = self.index;
        for sibling in &self.siblings {
            acc = if index & 1 == 1 {
                hash_pair(sibling, &acc)
            } else {
                hash_pair(&acc, sibling)
            };
            index >>= 1;
        }
        acc == root
    }
}

fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<B256> {
        (0..n).map(|i| keccak256([i as u8])).collect()
    }

    #[test]
    fn empty_tree_is_rejected() {
        assert!(matches!(
            MerkleTree::new(vec![]),
            Err(PrimitivesError::EmptyTree)
        ));
    }

    #[test]
    fn single_leaf_root_is_the_leaf() {
        let leaf = keccak256(b"only");
        let tree = MerkleTree::new(vec![leaf]).unwrap();
        assert_eq!(tree.root(), leaf);

        let proof = tree.proof(0).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(proof.verify(tree.root()));
    }

    #[test]
    fn root_is_deterministic() {
        let tree_a = MerkleTree::new(leaves(7)).unwrap();
        let tree_b = MerkleTree::new(leaves(7)).unwrap();
        assert_eq!(tree_a.root(), tree_b.root());
    }

    #[test]
    fn root_depends_on_leaf_order() {
        let mut swapped = leaves(4);
        swapped.swap(1, 2);
        assert_ne!(
            MerkleTree::new(leaves(4)).unwrap().root(),
            MerkleTree::new(swapped).unwrap().root()
        );
    }

    #[test]
    fn every_proof_verifies_and_only_at_its_index() {
        for n in [2usize, 3, 4, 5, 8, 13] {
            let tree = MerkleTree::new(leaves(n)).unwrap();
            for i in 0..n {
                let proof = tree.proof(i).unwrap();
                assert!(proof.verify(tree.root()), "n={n} i={i}");

                let mut wrong_index = proof.clone();
                wrong_index.index ^= 1;
                assert!(!wrong_index.verify(tree.root()), "n={n} i={i} index");

                let mut wrong_leaf = proof;
                wrong_leaf.leaf = keccak256(b"bogus");
                assert!(!wrong_leaf.verify(tree.root()), "n={n} i={i} leaf");
            }
        }
    }

    #[test]
    fn proof_index_out_of_range_is_an_error() {
        let tree = MerkleTree::new(leaves(3)).unwrap();
        // padded layer has 4 slots but only 3 real leaves
        assert!(matches!(
            tree.proof(3),
            Err(PrimitivesError::LeafIndexOutOfRange { index: 3, leaves: 3 })
        ));
    }
}
