//! `zk-db`: correlation store for the zk sync pipeline.
//!
//! Provides a redb-backed store with canonical big-endian key layouts,
//! chunked storage for batch witnesses, the L1/L2 correlation tables with
//! their typed read/write operations, and per-stage progress tracking.

pub mod chunks;
pub mod db;
pub mod errors;
pub mod keys;
pub mod kv;
pub mod progress;
pub mod reader;
pub mod tables;
pub mod types;
pub mod writer;

pub use db::{ZkDb, create_hermez_buckets};
pub use errors::{DbError, DbResult};
pub use kv::{KvRead, KvWrite, RoTx, RwTx};
pub use progress::{
    get_stage_progress, get_stage_prune_progress, save_stage_progress, save_stage_prune_progress,
};
pub use reader::{HermezDbReader, HermezRead};
pub use tables::Table;
pub use types::{GerUpdate, Hash, L1BatchInfo, L1InfoTreeUpdate, L1InjectedBatch, ZERO_HASH};
pub use writer::{HermezDb, HermezWrite};
