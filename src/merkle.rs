//! Binary Merkle tree over transaction hashes
//!
//! Each level pairs adjacent nodes, duplicating the last node of an odd-length
//! level. The tree always hashes at least once, so a single leaf `h` has the
//! root `SHA-256(h || h)`.

use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Hash256 = [u8; 32];

fn hash_nodes(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn next_level(level: &[Hash256]) -> Vec<Hash256> {
    level
        .chunks(2)
        .map(|pair| hash_nodes(&pair[0], pair.get(1).unwrap_or(&pair[0])))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// Level 0 holds the leaves, the last level holds the root.
    levels: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    pub fn new(leaves: &[Hash256]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(ChainError::EmptyMerkleTree);
        }

        let mut levels = vec![leaves.to_vec()];
        loop {
            let parent = next_level(&levels[levels.len() - 1]);
            let done = parent.len() == 1;
            levels.push(parent);
            if done {
                break;
            }
        }
        Ok(MerkleTree { levels })
    }

    pub fn root(&self) -> Hash256 {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaves(&self) -> &[Hash256] {
        &self.levels[0]
    }

    /// Recomputes every internal level from the leaves and checks it matches.
    pub fn verify(&self) -> bool {
        self.levels
            .windows(2)
            .all(|pair| next_level(&pair[0]) == pair[1])
    }

    /// Builds an inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof> {
        let len = self.leaves().len();
        if index >= len {
            return Err(ChainError::IndexOutOfRange { index, len });
        }

        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if position % 2 == 0 {
                *level.get(position + 1).unwrap_or(&level[position])
            } else {
                level[position - 1]
            };
            siblings.push(sibling);
            position /= 2;
        }

        Ok(MerkleProof {
            index: index as u64,
            siblings,
        })
    }
}

/// Sibling path from a leaf up to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub index: u64,
    pub siblings: Vec<Hash256>,
}

impl MerkleProof {
    pub fn verify(&self, leaf: &Hash256, root: &Hash256) -> bool {
        let mut current = *leaf;
        let mut position = self.index;
        for sibling in &self.siblings {
            current = if position % 2 == 0 {
                hash_nodes(&current, sibling)
            } else {
                hash_nodes(sibling, &current)
            };
            position /= 2;
        }
        current == *root
    }
}

/// Computes the Merkle root of a list of transaction hashes.
pub fn merkle_root(tx_hashes: &[Hash256]) -> Result<Hash256> {
    Ok(MerkleTree::new(tx_hashes)?.root())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> Hash256 {
        Sha256::digest([n]).into()
    }

    #[test]
    fn test_empty_tree_is_rejected() {
        assert_eq!(MerkleTree::new(&[]).unwrap_err(), ChainError::EmptyMerkleTree);
    }

    #[test]
    fn test_single_leaf_root() {
        let h = leaf(1);
        assert_eq!(merkle_root(&[h]).unwrap(), hash_nodes(&h, &h));
    }

    #[test]
    fn test_odd_level_duplicates_last_node() {
        let (a, b, c) = (leaf(1), leaf(2), leaf(3));
        let expected = hash_nodes(&hash_nodes(&a, &b), &hash_nodes(&c, &c));
        assert_eq!(merkle_root(&[a, b, c]).unwrap(), expected);
    }

    #[test]
    fn test_root_changes_with_any_leaf() {
        let leaves: Vec<Hash256> = (0..5).map(leaf).collect();
        let root = merkle_root(&leaves).unwrap();

        let mut tampered = leaves.clone();
        tampered[3][0] ^= 0x01;
        assert_ne!(merkle_root(&tampered).unwrap(), root);
    }

    #[test]
    fn test_verify_detects_corrupted_level() {
        let leaves: Vec<Hash256> = (0..4).map(leaf).collect();
        let mut tree = MerkleTree::new(&leaves).unwrap();
        assert!(tree.verify());

        tree.levels[1][0][5] ^= 0xFF;
        assert!(!tree.verify());
    }

    #[test]
    fn test_proofs_for_every_leaf() {
        let leaves: Vec<Hash256> = (0..7).map(leaf).collect();
        let tree = MerkleTree::new(&leaves).unwrap();
        let root = tree.root();

        for (i, l) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(proof.verify(l, &root));
            assert!(!proof.verify(&leaf(99), &root));
        }
    }

    #[test]
    fn test_proof_out_of_range() {
        let tree = MerkleTree::new(&[leaf(1), leaf(2)]).unwrap();
        assert_eq!(
            tree.proof(2).unwrap_err(),
            ChainError::IndexOutOfRange { index: 2, len: 2 }
        );
    }
}
