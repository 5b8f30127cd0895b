use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};

use crate::error::EscrowError;
use crate::hashlock::keccak256;

/// Merkle proof for partial fills, as submitted by callers. Siblings are
/// hex-encoded 32-byte hashes, root-ward order.
#[derive(BorshDeserialize, BorshSerialize, Serialize, Deserialize, Clone, Debug, Default)]
#[serde(crate = "near_sdk::serde")]
pub struct MerkleProof {
    pub proof: Vec<String>,
}

impl MerkleProof {
    pub fn decode(&self) -> Result<Vec<[u8; 32]>, EscrowError> {
        self.proof
            .iter()
            .map(|s| {
                let bytes =
                    hex::decode(s.trim_start_matches("0x")).map_err(|_| EscrowError::InvalidMerkleProof)?;
                <[u8; 32]>::try_from(bytes).map_err(|_| EscrowError::InvalidMerkleProof)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.proof.is_empty()
    }
}

/// Leaf commitment for secret `index`: `keccak256(index as u64 LE ‖ secret_hash)`.
///
/// The little-endian index encoding is part of the cross-chain wire format.
pub fn leaf_hash(index: u64, secret_hash: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 40];
    buf[..8].copy_from_slice(&index.to_le_bytes());
    buf[8..].copy_from_slice(secret_hash);
    keccak256(&buf)
}

/// Internal node: `keccak256(min(a,b) ‖ max(a,b))`. The sorted-pair rule
/// makes proofs position-free; both chains must hash identically or proofs
/// stop verifying across them.
pub fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo);
    buf[32..].copy_from_slice(hi);
    keccak256(&buf)
}

/// Walks `proof` from `leaf` and accepts iff it reproduces `root`.
pub fn verify_proof(leaf: [u8; 32], proof: &[[u8; 32]], root: &[u8; 32]) -> bool {
    let mut node = leaf;
    for sibling in proof {
        node = hash_pair(&node, sibling);
    }
    node == *root
}

/// Full check used at settlement and at source-escrow creation: rebuilds
/// the leaf for `(index, secret_hash)` and walks the submitted proof.
pub fn verify_secret_leaf(
    index: u64,
    secret_hash: &[u8; 32],
    proof: &MerkleProof,
    root: &[u8; 32],
) -> Result<(), EscrowError> {
    let siblings = proof.decode()?;
    if verify_proof(leaf_hash(index, secret_hash), &siblings, root) {
        Ok(())
    } else {
        Err(EscrowError::InvalidMerkleProof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a sorted-pair tree over `leaves`, returning the root and a
    /// proof per leaf. Odd nodes are promoted unpaired.
    pub fn build_tree(leaves: &[[u8; 32]]) -> ([u8; 32], Vec<Vec<[u8; 32]>>) {
        assert!(!leaves.is_empty());
        let mut proofs: Vec<Vec<[u8; 32]>> = vec![Vec::new(); leaves.len()];
        // position of each original leaf within the current level
        let mut positions: Vec<usize> = (0..leaves.len()).collect();
        let mut level: Vec<[u8; 32]> = leaves.to_vec();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len() / 2 + 1);
            for pair in level.chunks(2) {
                if let [a, b] = pair {
                    next.push(hash_pair(a, b));
                } else {
                    next.push(pair[0]);
                }
            }
            for (leaf_idx, pos) in positions.iter_mut().enumerate() {
                let sibling = if *pos % 2 == 0 { *pos + 1 } else { *pos - 1 };
                if sibling < level.len() {
                    proofs[leaf_idx].push(level[sibling]);
                }
                *pos /= 2;
            }
            level = next;
        }
        (level[0], proofs)
    }

    fn secret(i: u8) -> [u8; 32] {
        [i.wrapping_mul(7).wrapping_add(1); 32]
    }

    #[test]
    fn pair_hash_is_order_free() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));
        assert_ne!(hash_pair(&a, &b), hash_pair(&a, &a));
    }

    #[test]
    fn leaf_encoding_is_index_sensitive() {
        let sh = keccak256(&secret(0));
        assert_ne!(leaf_hash(0, &sh), leaf_hash(1, &sh));
        // u64 LE prefix: indices beyond one byte still distinct
        assert_ne!(leaf_hash(255, &sh), leaf_hash(256, &sh));
    }

    #[test]
    fn proofs_verify_for_every_leaf() {
        // 5 secrets = 4 parts plus the completion secret.
        let leaves: Vec<[u8; 32]> = (0..5u64)
            .map(|i| leaf_hash(i, &keccak256(&secret(i as u8))))
            .collect();
        let (root, proofs) = build_tree(&leaves);

        for (i, proof) in proofs.iter().enumerate() {
            assert!(
                verify_proof(leaves[i], proof, &root),
                "leaf {i} failed to verify"
            );
        }
    }

    #[test]
    fn tampered_proof_is_rejected() {
        let leaves: Vec<[u8; 32]> = (0..4u64)
            .map(|i| leaf_hash(i, &keccak256(&secret(i as u8))))
            .collect();
        let (root, proofs) = build_tree(&leaves);

        // wrong index for a valid secret hash
        let sh = keccak256(&secret(1));
        assert!(!verify_proof(leaf_hash(2, &sh), &proofs[1], &root));

        // bit-flipped sibling
        let mut bad = proofs[0].clone();
        bad[0][0] ^= 1;
        assert!(!verify_proof(leaves[0], &bad, &root));

        // truncated proof
        let short = &proofs[0][..proofs[0].len() - 1];
        assert!(!verify_proof(leaves[0], short, &root));
    }

    #[test]
    fn wire_proof_round_trip() {
        let leaves: Vec<[u8; 32]> = (0..3u64)
            .map(|i| leaf_hash(i, &keccak256(&secret(i as u8))))
            .collect();
        let (root, proofs) = build_tree(&leaves);

        let wire = MerkleProof {
            proof: proofs[2].iter().map(hex::encode).collect(),
        };
        let sh = keccak256(&secret(2));
        assert!(verify_secret_leaf(2, &sh, &wire, &root).is_ok());

        let garbled = MerkleProof {
            proof: vec!["nothex".into()],
        };
        assert_eq!(
            verify_secret_leaf(2, &sh, &garbled, &root),
            Err(EscrowError::InvalidMerkleProof)
        );
    }
}
