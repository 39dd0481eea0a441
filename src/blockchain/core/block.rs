use crate::crypto::{verify, KeyPair, Signature, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::error::Result;
use crate::merkle::{Hash256, MerkleTree};
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Current header encoding version.
pub const BLOCK_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Header {
    pub version: u32,
    pub height: u64,
    pub prev_hash: Hash256,
    pub root_hash: Hash256,
    /// Unix time in nanoseconds.
    pub timestamp: i64,
}

impl Header {
    /// A version 1 header stamped with the current time. `root_hash` is filled in by `sign_block`.
    pub fn new(height: u64, prev_hash: Hash256) -> Self {
        Header {
            version: BLOCK_VERSION,
            height,
            prev_hash,
            root_hash: [0u8; 32],
            timestamp: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    /// Canonical encoding: `version | height | prev_hash | root_hash | timestamp`, little-endian.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 8 + 32 + 32 + 8);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.prev_hash);
        out.extend_from_slice(&self.root_hash);
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    pub fn hash(&self) -> Hash256 {
        Sha256::digest(self.encode()).into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Block {
            header,
            transactions,
            public_key: Vec::new(),
            signature: Vec::new(),
        }
    }

    /// The block hash covers the header only; transactions are bound through `root_hash`.
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    pub fn tx_hashes(&self) -> Vec<Hash256> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    pub fn merkle_tree(&self) -> Result<MerkleTree> {
        MerkleTree::new(&self.tx_hashes())
    }
}

pub fn hash_header(header: &Header) -> Hash256 {
    header.hash()
}

pub fn hash_block(block: &Block) -> Hash256 {
    block.hash()
}

/// Binds the transactions into the header (when there are any), then signs
/// the block hash and stores the signer's public key and signature on the block.
pub fn sign_block(keypair: &KeyPair, block: &mut Block) -> Result<Signature> {
    if !block.transactions.is_empty() {
        block.header.root_hash = block.merkle_tree()?.root();
    }
    let signature = keypair.sign(&hash_block(block));
    block.public_key = keypair.public_key_bytes().to_vec();
    block.signature = signature.to_vec();
    Ok(signature)
}

/// Rebuilds the Merkle tree and checks it against the stored root hash.
pub fn verify_root_hash(block: &Block) -> bool {
    match block.merkle_tree() {
        Ok(tree) => tree.verify() && tree.root() == block.header.root_hash,
        Err(_) => false,
    }
}

pub fn verify_block(block: &Block) -> bool {
    if !block.transactions.is_empty() && !verify_root_hash(block) {
        debug!("invalid root hash");
        return false;
    }
    if block.public_key.len() != PUBLIC_KEY_LEN {
        debug!("invalid public key length {}", block.public_key.len());
        return false;
    }
    if block.signature.len() != SIGNATURE_LEN {
        debug!("invalid signature length {}", block.signature.len());
        return false;
    }
    verify(&block.signature, &block.public_key, &hash_block(block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TxOutput, TX_VERSION};

    fn mint(keypair: &KeyPair, amount: u64) -> Transaction {
        Transaction {
            version: TX_VERSION,
            inputs: vec![],
            outputs: vec![TxOutput {
                amount,
                address: keypair.address(),
            }],
        }
    }

    fn header() -> Header {
        Header {
            version: 1,
            height: 12,
            prev_hash: [1u8; 32],
            root_hash: [2u8; 32],
            timestamp: 1_700_000_000_000_000_000,
        }
    }

    #[test]
    fn test_hash_header_is_deterministic() {
        assert_eq!(hash_header(&header()), hash_header(&header()));
    }

    #[test]
    fn test_hash_header_changes_with_every_field() {
        let base = hash_header(&header());

        let mut h = header();
        h.version = 2;
        assert_ne!(hash_header(&h), base);

        let mut h = header();
        h.height = 13;
        assert_ne!(hash_header(&h), base);

        let mut h = header();
        h.prev_hash[31] = 9;
        assert_ne!(hash_header(&h), base);

        let mut h = header();
        h.root_hash[0] = 9;
        assert_ne!(hash_header(&h), base);

        let mut h = header();
        h.timestamp += 1;
        assert_ne!(hash_header(&h), base);
    }

    #[test]
    fn test_hash_block_ignores_transactions() {
        let keypair = KeyPair::generate();
        let empty = Block::new(header(), vec![]);
        let full = Block::new(header(), vec![mint(&keypair, 5)]);
        assert_eq!(hash_block(&empty), hash_block(&full));
        assert_eq!(hash_block(&empty), hash_header(&header()));
    }

    #[test]
    fn test_sign_and_verify_block() {
        let keypair = KeyPair::generate();
        let mut block = Block::new(header(), vec![mint(&keypair, 1000)]);

        let signature = sign_block(&keypair, &mut block).unwrap();
        assert_eq!(block.signature, signature.to_vec());
        assert_eq!(block.public_key, keypair.public_key_bytes().to_vec());
        assert_eq!(
            block.header.root_hash,
            crate::merkle::merkle_root(&block.tx_hashes()).unwrap()
        );
        assert!(verify_block(&block));
    }

    #[test]
    fn test_block_without_transactions_keeps_root() {
        let keypair = KeyPair::generate();
        let mut block = Block::new(header(), vec![]);
        sign_block(&keypair, &mut block).unwrap();
        assert_eq!(block.header.root_hash, [2u8; 32]);
        assert!(verify_block(&block));
    }

    #[test]
    fn test_unsigned_block_fails() {
        assert!(!verify_block(&Block::new(header(), vec![])));
    }

    #[test]
    fn test_tampered_transaction_is_detected_by_root() {
        let keypair = KeyPair::generate();
        let mut block = Block::new(header(), vec![mint(&keypair, 1000), mint(&keypair, 7)]);
        sign_block(&keypair, &mut block).unwrap();

        block.transactions[1].outputs[0].amount = 8;
        assert!(!verify_root_hash(&block));
        assert!(!verify_block(&block));
    }

    #[test]
    fn test_tampered_root_is_detected_by_signature() {
        let keypair = KeyPair::generate();
        let mut block = Block::new(header(), vec![mint(&keypair, 1000)]);
        sign_block(&keypair, &mut block).unwrap();

        // Rewrite the transaction and its root consistently, without re-signing.
        block.transactions[0].outputs[0].amount = 1_000_000;
        block.header.root_hash = block.merkle_tree().unwrap().root();
        assert!(verify_root_hash(&block));
        assert!(!verify_block(&block));

        // Re-signing makes the altered block valid again.
        sign_block(&keypair, &mut block).unwrap();
        assert!(verify_block(&block));
    }

    #[test]
    fn test_wrong_length_key_material_fails() {
        let keypair = KeyPair::generate();
        let mut block = Block::new(header(), vec![]);
        sign_block(&keypair, &mut block).unwrap();

        let mut short_key = block.clone();
        short_key.public_key.pop();
        assert!(!verify_block(&short_key));

        let mut long_sig = block.clone();
        long_sig.signature.push(0);
        assert!(!verify_block(&long_sig));
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        let keypair = KeyPair::generate();
        let mut block = Block::new(header(), vec![]);
        sign_block(&keypair, &mut block).unwrap();

        block.public_key = KeyPair::generate().public_key_bytes().to_vec();
        assert!(!verify_block(&block));
    }
}
