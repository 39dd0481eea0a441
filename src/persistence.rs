//! Ledger stores: block, transaction and UTXO persistence
//!
//! Stores are dumb key-value persistence with no validation of their own;
//! the chain owns every correctness rule. Each store is a capability trait
//! with an in-memory implementation for tests and ephemeral runs and a
//! rusqlite-backed `Database` that implements all three.
//!
//! Block stores also remember the order blocks were stored in, so a chain can
//! be rebuilt from them, and offer `atomic` so a block commit lands as one
//! unit when the backend is transactional.

use crate::blockchain::{hash_block, Block};
use crate::error::{self, StoreError};
use crate::merkle::Hash256;
use crate::transaction::{hash_transaction, Transaction};
use parking_lot::RwLock;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Unspent transaction output record. Never deleted; `spent` flips once.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Utxo {
    pub tx_hash: Hash256,
    pub output_index: u32,
    pub amount: u64,
    pub spent: bool,
}

impl Utxo {
    pub fn key(&self) -> String {
        utxo_key(&self.tx_hash, self.output_index)
    }
}

/// Composite UTXO key: `"{hex_owning_tx_hash}_{output_index}"`.
pub fn utxo_key(tx_hash: &Hash256, output_index: u32) -> String {
    format!("{}_{}", hex::encode(tx_hash), output_index)
}

pub trait BlockStore: Send + Sync {
    fn put(&self, block: &Block) -> Result<(), StoreError>;
    fn get(&self, hash: &str) -> Result<Block, StoreError>;

    /// Every stored block, in the order it was first put.
    fn blocks(&self) -> Result<Vec<Block>, StoreError>;

    /// Runs `apply` as one unit of work. A transactional store discards every
    /// write made through it while `apply` ran if `apply` fails.
    fn atomic(&self, apply: &mut dyn FnMut() -> error::Result<()>) -> error::Result<()> {
        apply()
    }
}

pub trait TransactionStore: Send + Sync {
    fn put(&self, tx: &Transaction) -> Result<(), StoreError>;
    fn get(&self, hash: &str) -> Result<Transaction, StoreError>;
}

pub trait UtxoStore: Send + Sync {
    fn put(&self, utxo: &Utxo) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Utxo, StoreError>;
}

#[derive(Default)]
struct BlockMap {
    by_hash: HashMap<String, Block>,
    order: Vec<String>,
}

#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<BlockMap>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, block: &Block) -> Result<(), StoreError> {
        let hash = hex::encode(hash_block(block));
        let mut map = self.blocks.write();
        if map.by_hash.insert(hash.clone(), block.clone()).is_none() {
            map.order.push(hash);
        }
        Ok(())
    }

    fn get(&self, hash: &str) -> Result<Block, StoreError> {
        self.blocks
            .read()
            .by_hash
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))
    }

    fn blocks(&self) -> Result<Vec<Block>, StoreError> {
        let map = self.blocks.read();
        Ok(map
            .order
            .iter()
            .filter_map(|hash| map.by_hash.get(hash).cloned())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryTxStore {
    txs: RwLock<HashMap<String, Transaction>>,
}

impl MemoryTxStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryTxStore {
    fn put(&self, tx: &Transaction) -> Result<(), StoreError> {
        let hash = hex::encode(hash_transaction(tx));
        self.txs.write().insert(hash, tx.clone());
        Ok(())
    }

    fn get(&self, hash: &str) -> Result<Transaction, StoreError> {
        self.txs
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryUtxoStore {
    utxos: RwLock<HashMap<String, Utxo>>,
}

impl MemoryUtxoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UtxoStore for MemoryUtxoStore {
    fn put(&self, utxo: &Utxo) -> Result<(), StoreError> {
        self.utxos.write().insert(utxo.key(), utxo.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Utxo, StoreError> {
        self.utxos
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// SQLite-backed store implementing all three store traits.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Database(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blocks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL UNIQUE,
                data BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS transactions (
                hash TEXT PRIMARY KEY,
                data BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS utxos (
                key TEXT PRIMARY KEY,
                tx_hash BLOB NOT NULL,
                output_index INTEGER NOT NULL,
                amount INTEGER NOT NULL,
                spent INTEGER NOT NULL
            );",
        )
        .map_err(|e| StoreError::Database(format!("Failed to create tables: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("Mutex poisoned".to_string()))
    }
}

impl BlockStore for Database {
    fn put(&self, block: &Block) -> Result<(), StoreError> {
        let data = bincode::serialize(block)?;
        self.conn()?
            .execute(
                "INSERT INTO blocks (hash, data) VALUES (?1, ?2)
                 ON CONFLICT(hash) DO UPDATE SET data = excluded.data",
                params![hex::encode(hash_block(block)), data],
            )
            .map_err(|e| StoreError::Database(format!("Failed to save block: {}", e)))?;
        Ok(())
    }

    fn get(&self, hash: &str) -> Result<Block, StoreError> {
        let data: Option<Vec<u8>> = self
            .conn()?
            .query_row(
                "SELECT data FROM blocks WHERE hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        let data = data.ok_or_else(|| StoreError::NotFound(hash.to_string()))?;
        Ok(bincode::deserialize(&data)?)
    }

    fn blocks(&self) -> Result<Vec<Block>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT data FROM blocks ORDER BY seq ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

        let mut blocks: Vec<Block> = Vec::new();
        for data in rows {
            blocks.push(bincode::deserialize(&data?)?);
        }
        Ok(blocks)
    }

    /// Wraps `apply` in a SQLite transaction. Writes to any store served by
    /// this `Database` are rolled back together.
    fn atomic(&self, apply: &mut dyn FnMut() -> error::Result<()>) -> error::Result<()> {
        self.conn()?.execute_batch("BEGIN IMMEDIATE")?;
        match apply() {
            Ok(()) => {
                self.conn()?.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.conn()?.execute_batch("ROLLBACK") {
                    warn!("Failed to roll back store writes: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

impl TransactionStore for Database {
    fn put(&self, tx: &Transaction) -> Result<(), StoreError> {
        let data = bincode::serialize(tx)?;
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO transactions (hash, data) VALUES (?1, ?2)",
                params![hex::encode(hash_transaction(tx)), data],
            )
            .map_err(|e| StoreError::Database(format!("Failed to save transaction: {}", e)))?;
        Ok(())
    }

    fn get(&self, hash: &str) -> Result<Transaction, StoreError> {
        let data: Option<Vec<u8>> = self
            .conn()?
            .query_row(
                "SELECT data FROM transactions WHERE hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        let data = data.ok_or_else(|| StoreError::NotFound(hash.to_string()))?;
        Ok(bincode::deserialize(&data)?)
    }
}

impl UtxoStore for Database {
    fn put(&self, utxo: &Utxo) -> Result<(), StoreError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO utxos (key, tx_hash, output_index, amount, spent)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    utxo.key(),
                    utxo.tx_hash.to_vec(),
                    utxo.output_index,
                    utxo.amount as i64,
                    utxo.spent
                ],
            )
            .map_err(|e| StoreError::Database(format!("Failed to save UTXO: {}", e)))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Utxo, StoreError> {
        let row = self
            .conn()?
            .query_row(
                "SELECT tx_hash, output_index, amount, spent FROM utxos WHERE key = ?1",
                params![key],
                |row| {
                    let tx_hash: Vec<u8> = row.get(0)?;
                    let output_index: u32 = row.get(1)?;
                    let amount: i64 = row.get(2)?;
                    let spent: bool = row.get(3)?;
                    Ok((tx_hash, output_index, amount, spent))
                },
            )
            .optional()?;

        let (tx_hash, output_index, amount, spent) =
            row.ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let tx_hash: Hash256 = tx_hash.as_slice().try_into().map_err(|_| {
            StoreError::Encoding(format!("UTXO {} has a {} byte tx hash", key, tx_hash.len()))
        })?;

        Ok(Utxo {
            tx_hash,
            output_index,
            amount: amount as u64,
            spent,
        })
    }
}
