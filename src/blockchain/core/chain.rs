use crate::blockchain::core::block::{hash_block, sign_block, Block, Header, BLOCK_VERSION};
use crate::blockchain::core::headers::HeaderList;
use crate::crypto::{Address, KeyPair, SEED_LEN};
use crate::error::{ChainError, Result, StoreError};
use crate::merkle::Hash256;
use crate::persistence::{
    utxo_key, BlockStore, MemoryBlockStore, MemoryTxStore, MemoryUtxoStore, TransactionStore,
    Utxo, UtxoStore,
};
use crate::transaction::{Transaction, TxOutput};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Seed of the default genesis identity.
pub const DEFAULT_GENESIS_SEED: [u8; SEED_LEN] = [
    0xda, 0x94, 0x7d, 0x14, 0x4c, 0x29, 0x28, 0x60,
    0x64, 0x56, 0x78, 0x95, 0xce, 0x91, 0x7d, 0x82,
    0xf8, 0xd4, 0xb9, 0x1b, 0x3c, 0x2a, 0xa3, 0x12,
    0x6c, 0x12, 0x39, 0xa7, 0x0b, 0x43, 0xd1, 0x7b,
];

pub const DEFAULT_INITIAL_SUPPLY: u64 = 1000;

/// Parameters that fix a chain's identity. Changing either changes the genesis hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisConfig {
    pub seed: [u8; SEED_LEN],
    pub initial_supply: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        GenesisConfig {
            seed: DEFAULT_GENESIS_SEED,
            initial_supply: DEFAULT_INITIAL_SUPPLY,
        }
    }
}

impl GenesisConfig {
    pub fn keypair(&self) -> Result<KeyPair> {
        Ok(KeyPair::from_seed(&self.seed)?)
    }

    /// Builds the genesis block: one input-less transaction minting the
    /// initial supply to the seed's address, signed by the seed's key.
    pub fn block(&self) -> Result<Block> {
        let keypair = self.keypair()?;
        let mint = Transaction::new(
            vec![],
            vec![TxOutput {
                amount: self.initial_supply,
                address: keypair.address(),
            }],
        );
        let header = Header {
            version: BLOCK_VERSION,
            height: 0,
            prev_hash: [0u8; 32],
            root_hash: [0u8; 32],
            timestamp: 0,
        };

        let mut block = Block::new(header, vec![mint]);
        sign_block(&keypair, &mut block)?;
        Ok(block)
    }
}

/// The three stores a chain mutates.
#[derive(Clone)]
pub struct ChainStores {
    pub blocks: Arc<dyn BlockStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub utxos: Arc<dyn UtxoStore>,
}

impl ChainStores {
    pub fn in_memory() -> Self {
        ChainStores {
            blocks: Arc::new(MemoryBlockStore::new()),
            transactions: Arc::new(MemoryTxStore::new()),
            utxos: Arc::new(MemoryUtxoStore::new()),
        }
    }
}

pub(crate) struct ChainState {
    pub(crate) headers: HeaderList,
    pub(crate) stores: ChainStores,
}

/// Single owner of ledger state.
///
/// `add_block` holds the write lock across validation and commit, so at most
/// one block is in flight and readers never observe a partial commit.
pub struct Chain {
    genesis_address: Address,
    state: RwLock<ChainState>,
}

impl Chain {
    /// Creates a chain over the given block and transaction stores with a
    /// fresh in-memory UTXO store. See `with_stores` for how genesis and
    /// previously stored blocks are handled.
    pub fn new(
        genesis: &GenesisConfig,
        block_store: Arc<dyn BlockStore>,
        tx_store: Arc<dyn TransactionStore>,
    ) -> Result<Self> {
        Self::with_stores(
            genesis,
            ChainStores {
                blocks: block_store,
                transactions: tx_store,
                utxos: Arc::new(MemoryUtxoStore::new()),
            },
        )
    }

    /// Creates a chain over `stores`. An empty block store gets the genesis
    /// block committed; a populated one is replayed instead, and must start
    /// with this genesis.
    pub fn with_stores(genesis: &GenesisConfig, stores: ChainStores) -> Result<Self> {
        let genesis_address = genesis.keypair()?.address();
        let block = genesis.block()?;

        let mut state = ChainState {
            headers: HeaderList::new(),
            stores,
        };
        let stored = state.stores.blocks.blocks()?;
        if stored.is_empty() {
            state.commit(&block)?;
            info!(
                "Genesis block {} minted {} to {}",
                hex::encode(hash_block(&block)),
                genesis.initial_supply,
                genesis_address
            );
        } else {
            state.restore(&block, stored)?;
        }

        Ok(Chain {
            genesis_address,
            state: RwLock::new(state),
        })
    }

    pub fn height(&self) -> u64 {
        self.state.read().height()
    }

    pub fn genesis_address(&self) -> Address {
        self.genesis_address
    }

    pub fn tip_hash(&self) -> Result<Hash256> {
        let state = self.state.read();
        Ok(state.headers.get(state.height() as usize)?.hash())
    }

    /// Validates `block` against the current tip and UTXO set, then commits it.
    /// A rejected block leaves every store and the height untouched.
    pub fn add_block(&self, block: Block) -> Result<()> {
        let mut state = self.state.write();
        if let Err(e) = state.validate_block(&block) {
            warn!("Rejected block {}: {}", hex::encode(hash_block(&block)), e);
            return Err(e);
        }
        state.commit(&block)
    }

    pub fn validate_block(&self, block: &Block) -> Result<()> {
        self.state.read().validate_block(block)
    }

    pub fn validate_transaction(&self, tx: &Transaction) -> Result<()> {
        self.state.read().validate_transaction(tx, &mut Default::default())
    }

    pub fn get_block_by_hash(&self, hash: &[u8]) -> std::result::Result<Block, StoreError> {
        self.state.read().block_by_hash(hash)
    }

    pub fn get_block_by_height(&self, height: u64) -> Result<Block> {
        self.state.read().block_by_height(height)
    }

    pub fn get_transaction(&self, hash: &[u8]) -> std::result::Result<Transaction, StoreError> {
        self.state.read().stores.transactions.get(&hex::encode(hash))
    }

    pub fn get_utxo(
        &self,
        tx_hash: &Hash256,
        output_index: u32,
    ) -> std::result::Result<Utxo, StoreError> {
        self.state
            .read()
            .stores
            .utxos
            .get(&utxo_key(tx_hash, output_index))
    }
}

impl ChainState {
    pub(crate) fn height(&self) -> u64 {
        // Genesis is committed during construction, so the list is never empty here.
        self.headers.height().unwrap_or(0)
    }

    pub(crate) fn block_by_hash(&self, hash: &[u8]) -> std::result::Result<Block, StoreError> {
        self.stores.blocks.get(&hex::encode(hash))
    }

    pub(crate) fn block_by_height(&self, height: u64) -> Result<Block> {
        let current = self.height();
        if height > current {
            return Err(ChainError::HeightTooHigh {
                requested: height,
                height: current,
            });
        }
        let hash = self.headers.get(height as usize)?.hash();
        Ok(self.block_by_hash(&hash)?)
    }

    /// Applies an already validated block. Transactions, UTXOs and the block
    /// are persisted as one unit of work before the header is appended; the
    /// header append is what makes the block visible at its height.
    pub(crate) fn commit(&mut self, block: &Block) -> Result<()> {
        let stores = &self.stores;
        stores.blocks.atomic(&mut || -> Result<()> {
            for tx in &block.transactions {
                stores.transactions.put(tx)?;
                debug!("Persisted transaction {}", tx.hash_str());
                apply_utxos(stores.utxos.as_ref(), tx)?;
            }
            stores.blocks.put(block)?;
            Ok(())
        })?;

        self.headers.add(block.header.clone());
        info!(
            "Committed block {} at height {} ({} transactions)",
            hex::encode(hash_block(block)),
            self.height(),
            block.transactions.len()
        );
        Ok(())
    }

    /// Rebuilds the header list from blocks the block store already holds.
    /// UTXO effects are replayed only when the UTXO store lacks the genesis
    /// outputs; a store that kept them is trusted as is.
    fn restore(&mut self, genesis: &Block, stored: Vec<Block>) -> Result<()> {
        let genesis_hash = hash_block(genesis);
        let Some(first) = stored.first().map(hash_block) else {
            return Ok(());
        };
        if first != genesis_hash {
            return Err(ChainError::GenesisMismatch {
                expected: hex::encode(genesis_hash),
                got: hex::encode(first),
            });
        }

        let replay = match genesis.transactions.first() {
            Some(tx) => match self.stores.utxos.get(&utxo_key(&tx.hash(), 0)) {
                Ok(_) => false,
                Err(StoreError::NotFound(_)) => true,
                Err(e) => return Err(e.into()),
            },
            None => false,
        };

        let mut tip = genesis_hash;
        for (height, block) in stored.into_iter().enumerate() {
            if height > 0 && block.header.prev_hash != tip {
                return Err(ChainError::InvalidPrevHash {
                    expected: hex::encode(tip),
                    got: hex::encode(block.header.prev_hash),
                });
            }
            if replay {
                for tx in &block.transactions {
                    apply_utxos(self.stores.utxos.as_ref(), tx)?;
                }
            }
            tip = hash_block(&block);
            self.headers.add(block.header);
        }

        info!(
            "Restored {} stored blocks up to {} (height {}, utxos {})",
            self.headers.len(),
            hex::encode(tip),
            self.height(),
            if replay { "replayed" } else { "kept" }
        );
        Ok(())
    }
}

/// Creates the outputs of `tx` as unspent records and marks its inputs spent.
/// An existing record is never overwritten.
fn apply_utxos(utxos: &dyn UtxoStore, tx: &Transaction) -> Result<()> {
    let tx_hash = tx.hash();
    for (index, output) in tx.outputs.iter().enumerate() {
        let record = Utxo {
            tx_hash,
            output_index: index as u32,
            amount: output.amount,
            spent: false,
        };
        match utxos.get(&record.key()) {
            Ok(_) => return Err(ChainError::DuplicateOutput(record.key())),
            Err(StoreError::NotFound(_)) => utxos.put(&record)?,
            Err(e) => return Err(e.into()),
        }
    }

    for input in &tx.inputs {
        let mut utxo = utxos.get(&input.utxo_key())?;
        utxo.spent = true;
        utxos.put(&utxo)?;
    }
    Ok(())
}
