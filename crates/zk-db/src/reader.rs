//! Read side of the correlation store.
//!
//! Point lookups return a zero value (or `None` for records) when nothing is
//! stored; errors are reserved for malformed data and storage failures.

use std::ops::ControlFlow;

use crate::chunks::read_chunks;
use crate::errors::{DbError, DbResult};
use crate::keys::{
    U64_LEN, bytes_to_uint8, concat_key, read_u64_be, split_ger_key, split_key, uint64_to_bytes,
};
use crate::kv::{KvRead, RoTx};
use crate::tables::Table;
use crate::types::{
    GerUpdate, Hash, L1BatchInfo, L1InfoTreeUpdate, L1InjectedBatch, ZERO_HASH, decode_hash,
    decode_l1_batch_info, decode_u64,
};

fn u64_key(table: Table, key: &[u8]) -> DbResult<u64> {
    if key.len() < U64_LEN {
        return Err(DbError::MalformedKey {
            table: table.name(),
            len: key.len(),
        });
    }
    Ok(read_u64_be(key))
}

pub trait HermezRead {
    fn kv(&self) -> &dyn KvRead;

    // ── Block / batch mapping ───────────────────────────────────────────

    /// Batch containing `l2_block_no`, 0 when the block is unknown.
    fn get_batch_no_by_l2_block(&self, l2_block_no: u64) -> DbResult<u64> {
        match self.kv().get_one(Table::BlockBatches, &uint64_to_bytes(l2_block_no))? {
            Some(v) => decode_u64(Table::BlockBatches, &v),
            None => Ok(0),
        }
    }

    /// Every L2 block mapped to `batch_no`, ascending. Scans the whole table.
    fn get_l2_block_nos_by_batch(&self, batch_no: u64) -> DbResult<Vec<u64>> {
        let mut blocks = Vec::new();
        self.kv().walk(Table::BlockBatches, &[], &mut |k, v| {
            if decode_u64(Table::BlockBatches, v)? == batch_no {
                blocks.push(u64_key(Table::BlockBatches, k)?);
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(blocks)
    }

    /// Batch of the highest downloaded block, 0 when nothing was downloaded.
    fn get_latest_downloaded_batch_no(&self) -> DbResult<u64> {
        match self.kv().last(Table::BlockBatches)? {
            Some((_, v)) => decode_u64(Table::BlockBatches, &v),
            None => Ok(0),
        }
    }

    fn get_highest_block_in_batch(&self, batch_no: u64) -> DbResult<u64> {
        let blocks = self.get_l2_block_nos_by_batch(batch_no)?;
        Ok(blocks.into_iter().max().unwrap_or(0))
    }

    /// Highest L2 block of the latest verified batch.
    fn get_highest_verified_block_no(&self) -> DbResult<u64> {
        match self.get_latest_verification()? {
            Some(v) => self.get_highest_block_in_batch(v.batch_no),
            None => Ok(0),
        }
    }

    fn get_verification_by_l2_block_no(&self, l2_block_no: u64) -> DbResult<Option<L1BatchInfo>> {
        let batch_no = self.get_batch_no_by_l2_block(l2_block_no)?;
        self.get_verification_by_batch_no(batch_no)
    }

    // ── L1 sequences / verifications ────────────────────────────────────

    fn get_sequence_by_l1_block(&self, l1_block_no: u64) -> DbResult<Option<L1BatchInfo>> {
        get_by_l1_block(self.kv(), Table::L1Sequences, l1_block_no)
    }

    fn get_sequence_by_batch_no(&self, batch_no: u64) -> DbResult<Option<L1BatchInfo>> {
        get_by_batch_no(self.kv(), Table::L1Sequences, batch_no)
    }

    fn get_verification_by_l1_block(&self, l1_block_no: u64) -> DbResult<Option<L1BatchInfo>> {
        get_by_l1_block(self.kv(), Table::L1Verifications, l1_block_no)
    }

    fn get_verification_by_batch_no(&self, batch_no: u64) -> DbResult<Option<L1BatchInfo>> {
        get_by_batch_no(self.kv(), Table::L1Verifications, batch_no)
    }

    fn get_latest_sequence(&self) -> DbResult<Option<L1BatchInfo>> {
        get_latest(self.kv(), Table::L1Sequences)
    }

    fn get_latest_verification(&self) -> DbResult<Option<L1BatchInfo>> {
        get_latest(self.kv(), Table::L1Verifications)
    }

    // ── Global exit roots ───────────────────────────────────────────────

    /// Whether `ger` has been seen.
    fn get_global_exit_root(&self, ger: &Hash) -> DbResult<bool> {
        Ok(self
            .kv()
            .get_one(Table::GlobalExitRoots, ger)?
            .is_some_and(|v| !v.is_empty()))
    }

    /// GER written for `l2_block_no` and the L1 block hash it came with.
    /// Both are zero when nothing is stored; the hash is zero for 8-byte keys.
    fn get_block_global_exit_root(&self, l2_block_no: u64) -> DbResult<(Hash, Hash)> {
        let mut found = (ZERO_HASH, ZERO_HASH);
        self.kv().walk(
            Table::BlockGlobalExitRoots,
            &uint64_to_bytes(l2_block_no),
            &mut |k, v| {
                let (block, l1_hash) = split_ger_key(k)?;
                if block != l2_block_no {
                    return Ok(ControlFlow::Break(()));
                }
                found = (
                    decode_hash(Table::BlockGlobalExitRoots, v)?,
                    l1_hash.unwrap_or(ZERO_HASH),
                );
                Ok(ControlFlow::Continue(()))
            },
        )?;
        Ok(found)
    }

    /// (GER, L1 block hash) pairs for blocks in `[from, to]`, ascending.
    fn get_block_global_exit_roots(&self, from: u64, to: u64) -> DbResult<Vec<(Hash, Hash)>> {
        let mut gers = Vec::new();
        if from > to {
            return Ok(gers);
        }
        self.kv().walk(
            Table::BlockGlobalExitRoots,
            &uint64_to_bytes(from),
            &mut |k, v| {
                let (block, l1_hash) = split_ger_key(k)?;
                if block > to {
                    return Ok(ControlFlow::Break(()));
                }
                gers.push((
                    decode_hash(Table::BlockGlobalExitRoots, v)?,
                    l1_hash.unwrap_or(ZERO_HASH),
                ));
                Ok(ControlFlow::Continue(()))
            },
        )?;
        Ok(gers)
    }

    fn get_batch_global_exit_root(&self, batch_no: u64) -> DbResult<Option<GerUpdate>> {
        self.kv()
            .get_one(Table::GlobalExitRootsBatches, &uint64_to_bytes(batch_no))?
            .map(|v| GerUpdate::decode(&v))
            .transpose()
    }

    fn get_batch_global_exit_roots(&self, from: u64, to: u64) -> DbResult<Vec<GerUpdate>> {
        let mut updates = Vec::new();
        if from > to {
            return Ok(updates);
        }
        self.kv().walk(
            Table::GlobalExitRootsBatches,
            &uint64_to_bytes(from),
            &mut |k, v| {
                if u64_key(Table::GlobalExitRootsBatches, k)? > to {
                    return Ok(ControlFlow::Break(()));
                }
                updates.push(GerUpdate::decode(v)?);
                Ok(ControlFlow::Continue(()))
            },
        )?;
        Ok(updates)
    }

    // ── Fork ids ────────────────────────────────────────────────────────

    /// Fork id written for the greatest batch <= `batch_no`, 0 if none.
    fn get_fork_id(&self, batch_no: u64) -> DbResult<u64> {
        let mut fork_id = 0;
        self.kv().walk(Table::ForkIds, &[], &mut |k, v| {
            if u64_key(Table::ForkIds, k)? > batch_no {
                return Ok(ControlFlow::Break(()));
            }
            fork_id = decode_u64(Table::ForkIds, v)?;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(fork_id)
    }

    /// First L2 block of `fork_id`, 0 when unknown.
    fn get_fork_id_block(&self, fork_id: u64) -> DbResult<u64> {
        match self.kv().get_one(Table::ForkIdBlock, &uint64_to_bytes(fork_id))? {
            Some(v) => decode_u64(Table::ForkIdBlock, &v),
            None => Ok(0),
        }
    }

    // ── Per-transaction / per-block values ──────────────────────────────

    fn get_effective_gas_price_percentage(&self, tx_hash: &Hash) -> DbResult<u8> {
        match self.kv().get_one(Table::TxPricePercentage, tx_hash)? {
            Some(v) => bytes_to_uint8(&v).map_err(|_| DbError::MalformedValue {
                table: Table::TxPricePercentage.name(),
                len: v.len(),
            }),
            None => Ok(0),
        }
    }

    fn get_state_root(&self, l2_block_no: u64) -> DbResult<Hash> {
        get_hash(self.kv(), Table::StateRoots, l2_block_no)
    }

    fn get_block_info_root(&self, l2_block_no: u64) -> DbResult<Hash> {
        get_hash(self.kv(), Table::BlockInfoRoots, l2_block_no)
    }

    // ── L1 info tree ────────────────────────────────────────────────────

    fn get_l1_info_tree_update(&self, index: u64) -> DbResult<Option<L1InfoTreeUpdate>> {
        self.kv()
            .get_one(Table::L1InfoTreeUpdates, &uint64_to_bytes(index))?
            .map(|v| L1InfoTreeUpdate::decode(&v))
            .transpose()
    }

    fn get_latest_l1_info_tree_update(&self) -> DbResult<Option<L1InfoTreeUpdate>> {
        self.kv()
            .last(Table::L1InfoTreeUpdates)?
            .map(|(_, v)| L1InfoTreeUpdate::decode(&v))
            .transpose()
    }

    fn get_block_l1_info_tree_index(&self, l2_block_no: u64) -> DbResult<u64> {
        match self
            .kv()
            .get_one(Table::BlockL1InfoTreeIndex, &uint64_to_bytes(l2_block_no))?
        {
            Some(v) => decode_u64(Table::BlockL1InfoTreeIndex, &v),
            None => Ok(0),
        }
    }

    fn get_l1_injected_batch(&self, index: u64) -> DbResult<Option<L1InjectedBatch>> {
        self.kv()
            .get_one(Table::L1InjectedBatches, &uint64_to_bytes(index))?
            .map(|v| L1InjectedBatch::decode(&v))
            .transpose()
    }

    // ── Witnesses ───────────────────────────────────────────────────────

    /// Witness blob of `batch_no`; empty when none is stored.
    fn get_witness_by_batch_no(&self, batch_no: u64) -> DbResult<Vec<u8>> {
        read_chunks(self.kv(), Table::BatchWitness, &uint64_to_bytes(batch_no))
    }
}

fn get_hash(kv: &dyn KvRead, table: Table, l2_block_no: u64) -> DbResult<Hash> {
    match kv.get_one(table, &uint64_to_bytes(l2_block_no))? {
        Some(v) => decode_hash(table, &v),
        None => Ok(ZERO_HASH),
    }
}

fn decode_entry(table: Table, k: &[u8], v: &[u8]) -> DbResult<L1BatchInfo> {
    let (l1_block_no, batch_no) = split_key(k)?;
    decode_l1_batch_info(table, l1_block_no, batch_no, v)
}

/// First record at `l1_block_no`. Keys lead with the L1 block, so this seeks.
fn get_by_l1_block(
    kv: &dyn KvRead,
    table: Table,
    l1_block_no: u64,
) -> DbResult<Option<L1BatchInfo>> {
    let start = concat_key(l1_block_no, 0);
    match kv.seek(table, &start)? {
        Some((k, v)) => {
            let info = decode_entry(table, &k, &v)?;
            Ok((info.l1_block_no == l1_block_no).then_some(info))
        }
        None => Ok(None),
    }
}

/// Record of `batch_no`. The batch is the second key component, so this
/// scans the whole table.
fn get_by_batch_no(kv: &dyn KvRead, table: Table, batch_no: u64) -> DbResult<Option<L1BatchInfo>> {
    let mut found = None;
    kv.walk(table, &[], &mut |k, v| {
        let (_, batch) = split_key(k)?;
        if batch == batch_no {
            found = Some(decode_entry(table, k, v)?);
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(found)
}

fn get_latest(kv: &dyn KvRead, table: Table) -> DbResult<Option<L1BatchInfo>> {
    kv.last(table)?
        .map(|(k, v)| decode_entry(table, &k, &v))
        .transpose()
}

// ---------------------------------------------------------------------------
// HermezDbReader: read-only handle over any transaction
// ---------------------------------------------------------------------------

pub struct HermezDbReader<'tx, T: KvRead = RoTx> {
    tx: &'tx T,
}

impl<'tx, T: KvRead> HermezDbReader<'tx, T> {
    pub fn new(tx: &'tx T) -> Self {
        Self { tx }
    }
}

impl<T: KvRead> HermezRead for HermezDbReader<'_, T> {
    fn kv(&self) -> &dyn KvRead {
        self.tx
    }
}
