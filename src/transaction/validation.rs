/// Signature checks for transactions, separated from type definitions
use crate::crypto::verify;
use crate::error::{ChainError, Result};
use crate::transaction::types::Transaction;

impl Transaction {
    /// Checks every input signature against the transaction hash.
    ///
    /// An input without a signature is a caller error and fails with
    /// `MissingSignature`; a signature that does not verify yields `Ok(false)`.
    pub fn verify_signatures(&self) -> Result<bool> {
        let hash = self.hash();
        for (i, input) in self.inputs.iter().enumerate() {
            if input.signature.is_empty() {
                return Err(ChainError::MissingSignature {
                    tx: hex::encode(hash),
                    input: i,
                });
            }
            if !verify(&input.signature, &input.public_key, &hash) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub fn verify_transaction(tx: &Transaction) -> Result<bool> {
    tx.verify_signatures()
}
