use crate::blockchain::core::block::{hash_block, verify_block, Block};
use crate::blockchain::core::chain::ChainState;
use crate::error::{ChainError, Result, StoreError};
use crate::persistence::utxo_key;
use crate::transaction::{verify_transaction, Transaction};
use std::collections::HashSet;

impl ChainState {
    /// Full block validation, short-circuiting on the first failure:
    /// signature and Merkle root, linkage to the tip, then every transaction.
    pub(crate) fn validate_block(&self, block: &Block) -> Result<()> {
        if !verify_block(block) {
            return Err(ChainError::InvalidBlockSignature);
        }

        let tip = self.block_by_height(self.height())?;
        let tip_hash = hash_block(&tip);
        if tip_hash != block.header.prev_hash {
            return Err(ChainError::InvalidPrevHash {
                expected: hex::encode(tip_hash),
                got: hex::encode(block.header.prev_hash),
            });
        }

        // UTXO keys consumed or created by earlier transactions of this block.
        let mut consumed = HashSet::new();
        for tx in &block.transactions {
            self.validate_transaction(tx, &mut consumed)?;
        }
        Ok(())
    }

    /// Checks signatures and solvency of `tx`. Every input is looked up by its
    /// own `(prev_tx_hash, prev_output_index)`. Input keys and the keys of the
    /// outputs `tx` would create are recorded in `consumed`; an output key that
    /// already exists fails `DuplicateOutput`.
    pub(crate) fn validate_transaction(
        &self,
        tx: &Transaction,
        consumed: &mut HashSet<String>,
    ) -> Result<()> {
        if !verify_transaction(tx)? {
            return Err(ChainError::InvalidTxSignature(tx.hash_str()));
        }

        let mut sum_inputs: u64 = 0;
        for input in &tx.inputs {
            let key = input.utxo_key();
            let utxo = match self.stores.utxos.get(&key) {
                Ok(utxo) => utxo,
                Err(StoreError::NotFound(_)) => return Err(ChainError::UnknownUtxo(key)),
                Err(e) => return Err(e.into()),
            };
            if utxo.spent || !consumed.insert(key.clone()) {
                return Err(ChainError::DoubleSpend(key));
            }
            sum_inputs = sum_inputs
                .checked_add(utxo.amount)
                .ok_or(ChainError::AmountOverflow)?;
        }

        let tx_hash = tx.hash();
        for index in 0..tx.outputs.len() {
            let key = utxo_key(&tx_hash, index as u32);
            match self.stores.utxos.get(&key) {
                Ok(_) => return Err(ChainError::DuplicateOutput(key)),
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
            if !consumed.insert(key.clone()) {
                return Err(ChainError::DuplicateOutput(key));
            }
        }

        let sum_outputs = tx.total_output()?;
        if sum_inputs < sum_outputs {
            return Err(ChainError::InsufficientFunds {
                inputs: sum_inputs,
                outputs: sum_outputs,
            });
        }
        Ok(())
    }
}
