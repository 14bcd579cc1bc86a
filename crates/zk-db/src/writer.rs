//! Write side of the correlation store.
//!
//! Range deletions take inclusive bounds, walk the key range in order and
//! are no-ops on empty ranges or when `from > to`.

use std::ops::ControlFlow;

use tracing::*;

use crate::chunks::{delete_chunks, write_chunks};
use crate::errors::{DbError, DbResult};
use crate::keys::{
    U64_LEN, concat_ger_key, concat_key, read_u64_be, uint8_to_bytes, uint64_to_bytes,
};
use crate::kv::{KvRead, KvWrite, RwTx, collect_keys};
use crate::reader::HermezRead;
use crate::tables::Table;
use crate::types::{
    GerUpdate, Hash, L1InfoTreeUpdate, L1InjectedBatch, decode_u64, encode_l1_batch_value,
};

/// Leading u64 of a key.
fn key_prefix(table: Table, key: &[u8]) -> DbResult<u64> {
    if key.len() < U64_LEN {
        return Err(DbError::MalformedKey {
            table: table.name(),
            len: key.len(),
        });
    }
    Ok(read_u64_be(key))
}

/// Deletes every entry whose leading u64 lies in `[from, to]`.
fn delete_u64_range(kv: &dyn KvWrite, table: Table, from: u64, to: u64) -> DbResult<usize> {
    if from > to {
        return Ok(0);
    }
    let keys = collect_keys(kv, table, &uint64_to_bytes(from), |k| {
        Ok(key_prefix(table, k)? <= to)
    })?;
    for key in &keys {
        kv.delete(table, key)?;
    }
    Ok(keys.len())
}

pub trait HermezWrite: HermezRead {
    fn kv_rw(&self) -> &dyn KvWrite;

    // ── L1 sequences / verifications ────────────────────────────────────

    fn write_sequence(
        &self,
        l1_block_no: u64,
        batch_no: u64,
        l1_tx_hash: &Hash,
        state_root: &Hash,
        l1_info_root: Option<&Hash>,
    ) -> DbResult<()> {
        let value = encode_l1_batch_value(l1_tx_hash, state_root, l1_info_root);
        self.kv_rw()
            .put(Table::L1Sequences, &concat_key(l1_block_no, batch_no), &value)
    }

    fn write_verification(
        &self,
        l1_block_no: u64,
        batch_no: u64,
        l1_tx_hash: &Hash,
        state_root: &Hash,
        l1_info_root: Option<&Hash>,
    ) -> DbResult<()> {
        let value = encode_l1_batch_value(l1_tx_hash, state_root, l1_info_root);
        self.kv_rw()
            .put(Table::L1Verifications, &concat_key(l1_block_no, batch_no), &value)
    }

    // ── Block / batch mapping ───────────────────────────────────────────

    fn write_block_batch(&self, l2_block_no: u64, batch_no: u64) -> DbResult<()> {
        self.kv_rw().put(
            Table::BlockBatches,
            &uint64_to_bytes(l2_block_no),
            &uint64_to_bytes(batch_no),
        )
    }

    fn delete_block_batches(&self, from: u64, to: u64) -> DbResult<()> {
        delete_u64_range(self.kv_rw(), Table::BlockBatches, from, to)?;
        Ok(())
    }

    // ── Global exit roots ───────────────────────────────────────────────

    fn write_global_exit_root(&self, ger: &Hash) -> DbResult<()> {
        self.kv_rw()
            .put(Table::GlobalExitRoots, ger, &uint8_to_bytes(1))
    }

    fn delete_global_exit_roots(&self, gers: &[Hash]) -> DbResult<()> {
        for ger in gers {
            self.kv_rw().delete(Table::GlobalExitRoots, ger)?;
        }
        Ok(())
    }

    fn write_block_global_exit_root(
        &self,
        l2_block_no: u64,
        ger: &Hash,
        l1_block_hash: Option<&Hash>,
    ) -> DbResult<()> {
        self.kv_rw().put(
            Table::BlockGlobalExitRoots,
            &concat_ger_key(l2_block_no, l1_block_hash),
            ger,
        )
    }

    fn delete_block_global_exit_roots(&self, from: u64, to: u64) -> DbResult<()> {
        delete_u64_range(self.kv_rw(), Table::BlockGlobalExitRoots, from, to)?;
        Ok(())
    }

    fn write_batch_global_exit_root(&self, batch_no: u64, update: &GerUpdate) -> DbResult<()> {
        self.kv_rw().put(
            Table::GlobalExitRootsBatches,
            &uint64_to_bytes(batch_no),
            &update.encode(),
        )
    }

    /// Deletes per-batch GER updates from `from_batch` to the last batch.
    fn delete_batch_global_exit_roots(&self, from_batch: u64) -> DbResult<()> {
        delete_u64_range(self.kv_rw(), Table::GlobalExitRootsBatches, from_batch, u64::MAX)?;
        Ok(())
    }

    // ── Fork ids ────────────────────────────────────────────────────────

    fn write_fork_id(&self, batch_no: u64, fork_id: u64) -> DbResult<()> {
        self.kv_rw().put(
            Table::ForkIds,
            &uint64_to_bytes(batch_no),
            &uint64_to_bytes(fork_id),
        )
    }

    fn delete_fork_ids(&self, from_batch: u64, to_batch: u64) -> DbResult<()> {
        delete_u64_range(self.kv_rw(), Table::ForkIds, from_batch, to_batch)?;
        Ok(())
    }

    /// Records the first block of `fork_id`. An existing entry is kept and
    /// the attempt is logged; the call still succeeds.
    fn write_fork_id_block_once(&self, fork_id: u64, l2_block_no: u64) -> DbResult<()> {
        let key = uint64_to_bytes(fork_id);
        if let Some(existing) = self.kv_rw().get_one(Table::ForkIdBlock, &key)? {
            let existing = decode_u64(Table::ForkIdBlock, &existing)?;
            error!(
                fork_id,
                existing, attempted = l2_block_no, "fork id block already written"
            );
            return Ok(());
        }
        self.kv_rw()
            .put(Table::ForkIdBlock, &key, &uint64_to_bytes(l2_block_no))
    }

    /// Deletes fork activations whose first block lies in
    /// `[from_block, to_block]`. The block is the value, so this scans.
    fn delete_fork_id_block(&self, from_block: u64, to_block: u64) -> DbResult<()> {
        if from_block > to_block {
            return Ok(());
        }
        let mut keys = Vec::new();
        self.kv_rw().walk(Table::ForkIdBlock, &[], &mut |k, v| {
            let block = decode_u64(Table::ForkIdBlock, v)?;
            if (from_block..=to_block).contains(&block) {
                keys.push(k.to_vec());
            }
            Ok(ControlFlow::Continue(()))
        })?;
        for key in &keys {
            self.kv_rw().delete(Table::ForkIdBlock, key)?;
        }
        Ok(())
    }

    // ── Per-transaction / per-block values ──────────────────────────────

    fn write_effective_gas_price_percentage(&self, tx_hash: &Hash, percentage: u8) -> DbResult<()> {
        self.kv_rw()
            .put(Table::TxPricePercentage, tx_hash, &uint8_to_bytes(percentage))
    }

    fn delete_effective_gas_price_percentages(&self, tx_hashes: &[Hash]) -> DbResult<()> {
        for hash in tx_hashes {
            self.kv_rw().delete(Table::TxPricePercentage, hash)?;
        }
        Ok(())
    }

    fn write_state_root(&self, l2_block_no: u64, root: &Hash) -> DbResult<()> {
        self.kv_rw()
            .put(Table::StateRoots, &uint64_to_bytes(l2_block_no), root)
    }

    fn delete_state_roots(&self, from: u64, to: u64) -> DbResult<()> {
        delete_u64_range(self.kv_rw(), Table::StateRoots, from, to)?;
        Ok(())
    }

    fn write_block_info_root(&self, l2_block_no: u64, root: &Hash) -> DbResult<()> {
        self.kv_rw()
            .put(Table::BlockInfoRoots, &uint64_to_bytes(l2_block_no), root)
    }

    fn delete_block_info_roots(&self, from: u64, to: u64) -> DbResult<()> {
        delete_u64_range(self.kv_rw(), Table::BlockInfoRoots, from, to)?;
        Ok(())
    }

    // ── L1 info tree ────────────────────────────────────────────────────

    fn write_l1_info_tree_update(&self, update: &L1InfoTreeUpdate) -> DbResult<()> {
        self.kv_rw().put(
            Table::L1InfoTreeUpdates,
            &uint64_to_bytes(update.index),
            &update.encode(),
        )
    }

    fn write_block_l1_info_tree_index(&self, l2_block_no: u64, index: u64) -> DbResult<()> {
        self.kv_rw().put(
            Table::BlockL1InfoTreeIndex,
            &uint64_to_bytes(l2_block_no),
            &uint64_to_bytes(index),
        )
    }

    fn delete_block_l1_info_tree_indices(&self, from: u64, to: u64) -> DbResult<()> {
        delete_u64_range(self.kv_rw(), Table::BlockL1InfoTreeIndex, from, to)?;
        Ok(())
    }

    /// Appends an injected batch at the next index (0 for the first one) and
    /// returns that index.
    fn write_l1_injected_batch(&self, batch: &L1InjectedBatch) -> DbResult<u64> {
        let index = self.kv_rw().count(Table::L1InjectedBatches)?;
        self.kv_rw().put(
            Table::L1InjectedBatches,
            &uint64_to_bytes(index),
            &batch.encode(),
        )?;
        Ok(index)
    }

    // ── Witnesses ───────────────────────────────────────────────────────

    fn write_witness_by_batch_no(&self, batch_no: u64, witness: &[u8]) -> DbResult<()> {
        write_chunks(
            self.kv_rw(),
            Table::BatchWitness,
            &uint64_to_bytes(batch_no),
            witness,
        )
    }

    fn delete_witness_by_batch_no(&self, batch_no: u64) -> DbResult<()> {
        delete_chunks(self.kv_rw(), Table::BatchWitness, &uint64_to_bytes(batch_no))?;
        Ok(())
    }

    /// Deletes the witnesses of batches in `[from, to]`.
    fn delete_witness_by_batch_range(&self, from: u64, to: u64) -> DbResult<()> {
        let removed = delete_u64_range(self.kv_rw(), Table::BatchWitness, from, to)?;
        if removed > 0 {
            debug!(from, to, chunks = removed, "deleted batch witnesses");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HermezDb: read-write handle over the ambient write transaction
// ---------------------------------------------------------------------------

pub struct HermezDb<'tx> {
    tx: &'tx RwTx,
}

impl<'tx> HermezDb<'tx> {
    pub fn new(tx: &'tx RwTx) -> Self {
        Self { tx }
    }
}

impl HermezRead for HermezDb<'_> {
    fn kv(&self) -> &dyn KvRead {
        self.tx
    }
}

impl HermezWrite for HermezDb<'_> {
    fn kv_rw(&self) -> &dyn KvWrite {
        self.tx
    }
}
