//! Shared helpers for integration tests: random test data and block builders.
#![allow(dead_code)]

use blocker::blockchain::{sign_block, Block, Chain, GenesisConfig, Header};
use blocker::crypto::{Address, KeyPair};
use blocker::merkle::Hash256;
use blocker::transaction::{Transaction, TxInput, TxOutput};
use rand::Rng;

pub fn random_hash() -> Hash256 {
    rand::random()
}

/// A header with random height, hashes and timestamp.
pub fn random_header() -> Header {
    let mut rng = rand::thread_rng();
    Header {
        version: 1,
        height: rng.gen_range(0..1000),
        prev_hash: random_hash(),
        root_hash: random_hash(),
        timestamp: rng.gen(),
    }
}

/// A random, transaction-less block linked to the current tip and signed by a fresh key.
pub fn random_block(chain: &Chain) -> Block {
    let mut block = Block::new(random_header(), vec![]);
    block.header.prev_hash = chain.tip_hash().unwrap();
    sign_block(&KeyPair::generate(), &mut block).unwrap();
    block
}

/// A block at the next height linked to the current tip, carrying `txs`.
pub fn block_with(chain: &Chain, txs: Vec<Transaction>) -> Block {
    let header = Header::new(chain.height() + 1, chain.tip_hash().unwrap());
    let mut block = Block::new(header, txs);
    sign_block(&KeyPair::generate(), &mut block).unwrap();
    block
}

/// A transaction spending `inputs` with every input signed by `owner`.
pub fn signed_tx(owner: &KeyPair, inputs: &[(Hash256, u32)], outputs: &[(u64, Address)]) -> Transaction {
    let public_key = owner.public_key_bytes();
    let mut tx = Transaction::new(
        inputs
            .iter()
            .map(|(hash, index)| TxInput::new(*hash, *index, &public_key))
            .collect(),
        outputs
            .iter()
            .map(|(amount, address)| TxOutput {
                amount: *amount,
                address: *address,
            })
            .collect(),
    );
    for i in 0..tx.inputs.len() {
        tx.sign_input(i, owner).unwrap();
    }
    tx
}

pub fn genesis_tx_hash(chain: &Chain) -> Hash256 {
    chain.get_block_by_height(0).unwrap().transactions[0].hash()
}

pub fn genesis_with_supply(initial_supply: u64) -> GenesisConfig {
    GenesisConfig {
        initial_supply,
        ..GenesisConfig::default()
    }
}
