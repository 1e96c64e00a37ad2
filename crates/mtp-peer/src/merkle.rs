//! Verification of piece inclusion proofs against a bag root.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::proto::{PieceProof, ProofStep};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MerkleError {
    #[error("proof path longer than {0} steps")]
    PathTooLong(usize),

    #[error("computed root does not match bag root")]
    RootMismatch,
}

/// A bag of 2^40 pieces would need a 40-step path; anything deeper is junk.
const MAX_PATH_LEN: usize = 64;

pub fn piece_leaf_hash(piece_index: u64, data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"leaf");
    hasher.update(piece_index.to_be_bytes());
    hasher.update(data);
    hasher.finalize().into()
}

fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"node");
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Walks the proof path from the leaf up and compares the resulting root
/// with `root_hash`. A single-piece bag is the degenerate case: the leaf
/// hash is the root and the path is empty.
pub fn check_proof(proof: &PieceProof, root_hash: &[u8; 32]) -> Result<(), MerkleError> {
    if proof.path.is_empty() {
        return if proof.leaf_hash == *root_hash {
            Ok(())
        } else {
            Err(MerkleError::RootMismatch)
        };
    }
    if proof.path.len() > MAX_PATH_LEN {
        return Err(MerkleError::PathTooLong(MAX_PATH_LEN));
    }

    let mut running = proof.leaf_hash;
    for step in &proof.path {
        running = if step.right {
            node_hash(&running, &step.hash)
        } else {
            node_hash(&step.hash, &running)
        };
    }

    if running == *root_hash {
        Ok(())
    } else {
        Err(MerkleError::RootMismatch)
    }
}

/// Builds the full tree over piece hashes and returns the root. Odd levels
/// promote the unpaired node. Used by provider-side tooling and tests; the
/// registry itself only ever verifies.
pub fn root_from_leaves(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => next.push(node_hash(left, right)),
                [single] => next.push(*single),
                _ => unreachable!("chunks(2) yields 1..=2 items"),
            }
        }
        level = next;
    }

    level[0]
}

/// Produces the inclusion proof for `index` over the same tree shape as
/// [`root_from_leaves`].
pub fn proof_for_leaf(leaves: &[[u8; 32]], index: usize) -> Option<PieceProof> {
    if index >= leaves.len() {
        return None;
    }

    let mut path = Vec::new();
    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    let mut position = index;

    while level.len() > 1 {
        let sibling = position ^ 1;
        if sibling < level.len() {
            path.push(ProofStep {
                hash: level[sibling],
                right: sibling > position,
            });
        }

        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => next.push(node_hash(left, right)),
                [single] => next.push(*single),
                _ => unreachable!("chunks(2) yields 1..=2 items"),
            }
        }
        level = next;
        position /= 2;
    }

    Some(PieceProof {
        piece_index: index as u64,
        leaf_hash: leaves[index],
        path,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_leaves(count: usize) -> Vec<[u8; 32]> {
        (0..count)
            .map(|i| piece_leaf_hash(i as u64, format!("piece-{i}").as_bytes()))
            .collect()
    }

    #[test]
    fn proof_verifies_for_every_leaf() {
        for count in [1usize, 2, 3, 5, 8, 13] {
            let leaves = sample_leaves(count);
            let root = root_from_leaves(&leaves);

            for index in 0..count {
                let proof = proof_for_leaf(&leaves, index).unwrap();
                assert_eq!(
                    check_proof(&proof, &root),
                    Ok(()),
                    "count={count} index={index}"
                );
            }
        }
    }

    #[test]
    fn tampered_leaf_is_rejected() {
        let leaves = sample_leaves(8);
        let root = root_from_leaves(&leaves);

        let mut proof = proof_for_leaf(&leaves, 3).unwrap();
        proof.leaf_hash = piece_leaf_hash(3, b"forged piece");

        assert_eq!(check_proof(&proof, &root), Err(MerkleError::RootMismatch));
    }

    #[test]
    fn proof_against_wrong_root_is_rejected() {
        let leaves = sample_leaves(4);
        let other_root = root_from_leaves(&sample_leaves(5));

        let proof = proof_for_leaf(&leaves, 0).unwrap();
        assert_eq!(
            check_proof(&proof, &other_root),
            Err(MerkleError::RootMismatch)
        );
    }

    #[test]
    fn out_of_range_index_yields_no_proof() {
        let leaves = sample_leaves(4);
        assert!(proof_for_leaf(&leaves, 4).is_none());
    }

    #[test]
    fn oversized_path_is_rejected() {
        let leaves = sample_leaves(2);
        let root = root_from_leaves(&leaves);

        let mut proof = proof_for_leaf(&leaves, 0).unwrap();
        let filler = proof.path[0].clone();
        proof.path = vec![filler; MAX_PATH_LEN + 1];

        assert_eq!(
            check_proof(&proof, &root),
            Err(MerkleError::PathTooLong(MAX_PATH_LEN))
        );
    }
}
