/// Transaction types and their canonical encoding
use crate::crypto::{Address, KeyPair, Signature};
use crate::error::{ChainError, Result};
use crate::merkle::Hash256;
use crate::persistence::utxo_key;
use sha2::{Digest, Sha256};

/// Current transaction encoding version.
pub const TX_VERSION: u32 = 1;

/// Spends output `prev_output_index` of transaction `prev_tx_hash`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxInput {
    pub prev_tx_hash: Hash256,
    pub prev_output_index: u32,
    pub public_key: Vec<u8>,
    /// Signature over the transaction hash, computed with every input signature cleared.
    pub signature: Vec<u8>,
}

impl TxInput {
    pub fn new(prev_tx_hash: Hash256, prev_output_index: u32, public_key: &[u8]) -> Self {
        TxInput {
            prev_tx_hash,
            prev_output_index,
            public_key: public_key.to_vec(),
            signature: Vec::new(),
        }
    }

    /// Key of the UTXO this input consumes.
    pub fn utxo_key(&self) -> String {
        utxo_key(&self.prev_tx_hash, self.prev_output_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
        }
    }

    /// Canonical byte encoding. With `with_signatures == false` every input
    /// signature is encoded as empty, which is the form that gets hashed.
    pub fn encode(&self, with_signatures: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());

        out.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            out.extend_from_slice(&input.prev_tx_hash);
            out.extend_from_slice(&input.prev_output_index.to_le_bytes());
            put_bytes(&mut out, &input.public_key);
            if with_signatures {
                put_bytes(&mut out, &input.signature);
            } else {
                put_bytes(&mut out, &[]);
            }
        }

        out.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            out.extend_from_slice(&output.amount.to_le_bytes());
            out.extend_from_slice(output.address.as_bytes());
        }
        out
    }

    /// Calculate the hash of this transaction
    pub fn hash(&self) -> Hash256 {
        Sha256::digest(self.encode(false)).into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }

    pub fn total_output(&self) -> Result<u64> {
        self.outputs.iter().try_fold(0u64, |acc, output| {
            acc.checked_add(output.amount)
                .ok_or(ChainError::AmountOverflow)
        })
    }

    /// Signs this transaction with `keypair` and attaches the signature to input `index`.
    pub fn sign_input(&mut self, index: usize, keypair: &KeyPair) -> Result<Signature> {
        let len = self.inputs.len();
        if index >= len {
            return Err(ChainError::IndexOutOfRange { index, len });
        }
        let signature = sign_transaction(keypair, self);
        self.inputs[index].signature = signature.to_vec();
        Ok(signature)
    }
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

pub fn hash_transaction(tx: &Transaction) -> Hash256 {
    tx.hash()
}

pub fn sign_transaction(keypair: &KeyPair, tx: &Transaction) -> Signature {
    keypair.sign(&tx.hash())
}
