//! Per-stage progress, keyed by the stage name.

use crate::errors::DbResult;
use crate::keys::uint64_to_bytes;
use crate::kv::{KvRead, KvWrite};
use crate::tables::Table;
use crate::types::decode_u64;

fn get(kv: &dyn KvRead, table: Table, stage: &str) -> DbResult<u64> {
    match kv.get_one(table, stage.as_bytes())? {
        Some(v) => decode_u64(table, &v),
        None => Ok(0),
    }
}

/// Last height the stage processed forward, 0 if it never ran.
pub fn get_stage_progress(kv: &dyn KvRead, stage: &str) -> DbResult<u64> {
    get(kv, Table::SyncStage, stage)
}

pub fn save_stage_progress(kv: &dyn KvWrite, stage: &str, progress: u64) -> DbResult<()> {
    kv.put(Table::SyncStage, stage.as_bytes(), &uint64_to_bytes(progress))
}

/// Height below which the stage's history has been pruned.
pub fn get_stage_prune_progress(kv: &dyn KvRead, stage: &str) -> DbResult<u64> {
    get(kv, Table::SyncStagePrune, stage)
}

pub fn save_stage_prune_progress(kv: &dyn KvWrite, stage: &str, progress: u64) -> DbResult<()> {
    kv.put(Table::SyncStagePrune, stage.as_bytes(), &uint64_to_bytes(progress))
}
