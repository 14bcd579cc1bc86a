use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::*;
use zk_db::{GerUpdate, Hash, HermezDb, HermezRead, HermezWrite, RwTx, ZERO_HASH};

use crate::config::BatchesConfig;
use crate::datastream::{BatchStart, Bookmark, DatastreamClient, FullL2Block};
use crate::errors::StageError;
use crate::stage::{ForwardOutcome, Stage, StageCtx, StageState, SyncStage, UnwindState};

/// Downloads L2 blocks from the data stream and records their batch
/// correlations. Progress is the last L2 block written.
///
/// Batch starts and GER updates for batches that have no written block yet
/// are held back until their blocks arrive.
pub struct BatchesStage {
    cfg: BatchesConfig,
    client: Box<dyn DatastreamClient>,
    pending_starts: Vec<BatchStart>,
    pending_gers: Vec<GerUpdate>,
}

impl BatchesStage {
    pub fn new(cfg: BatchesConfig, client: Box<dyn DatastreamClient>) -> Self {
        Self {
            cfg,
            client,
            pending_starts: Vec::new(),
            pending_gers: Vec::new(),
        }
    }

    fn check_errors(&mut self) -> Result<(), StageError> {
        if let Ok(err) = self.client.err_rx().try_recv() {
            return Err(err.into());
        }
        Ok(())
    }

    /// Drops blocks queued by an earlier pass that stopped before draining
    /// the channel. The stream is re-read from the bookmark anyway.
    fn discard_stale_blocks(&mut self) -> usize {
        let mut stale = 0;
        while self.client.l2_block_rx().try_recv().is_ok() {
            stale += 1;
        }
        stale
    }

    /// Writes queued batch starts and GER updates of batches up to
    /// `batch_limit`. Later ones stay pending.
    fn apply_side_entries(
        &mut self,
        hdb: &HermezDb<'_>,
        batch_limit: u64,
    ) -> Result<(), StageError> {
        while let Ok(start) = self.client.batch_start_rx().try_recv() {
            if !self.pending_starts.contains(&start) {
                self.pending_starts.push(start);
            }
        }
        while let Ok(update) = self.client.ger_updates_rx().try_recv() {
            if !self.pending_gers.contains(&update) {
                self.pending_gers.push(update);
            }
        }

        let (ready, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_starts)
            .into_iter()
            .partition(|start| start.number <= batch_limit);
        self.pending_starts = later;
        for start in ready {
            if hdb.get_fork_id(start.number)? != start.fork_id {
                hdb.write_fork_id(start.number, start.fork_id)?;
            }
        }

        let (ready, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_gers)
            .into_iter()
            .partition(|update| update.batch_number <= batch_limit);
        self.pending_gers = later;
        for update in ready {
            if update.global_exit_root != ZERO_HASH {
                hdb.write_global_exit_root(&update.global_exit_root)?;
            }
            hdb.write_batch_global_exit_root(update.batch_number, &update)?;
        }
        Ok(())
    }

    fn is_stalled(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        stream_stalled(self.client.as_ref(), self.cfg.stall_timeout_secs, now)
    }
}

/// A streaming client whose last entry is older than `timeout_secs`.
fn stream_stalled(client: &dyn DatastreamClient, timeout_secs: u64, now: i64) -> bool {
    if !client.streaming().load(Ordering::SeqCst) {
        return false;
    }
    let last = client.last_written_time().load(Ordering::SeqCst);
    if last == 0 {
        return false;
    }
    now.saturating_sub(last) > timeout_secs as i64
}

fn write_block(hdb: &HermezDb<'_>, block: &FullL2Block) -> Result<(), StageError> {
    let number = block.l2_block_number;
    hdb.write_block_batch(number, block.batch_number)?;

    if hdb.get_fork_id(block.batch_number)? != block.fork_id {
        hdb.write_fork_id(block.batch_number, block.fork_id)?;
    }
    if hdb.get_fork_id_block(block.fork_id)? == 0 {
        hdb.write_fork_id_block_once(block.fork_id, number)?;
    }

    if block.global_exit_root != ZERO_HASH {
        let l1_block_hash = non_zero(&block.l1_block_hash);
        hdb.write_global_exit_root(&block.global_exit_root)?;
        hdb.write_block_global_exit_root(number, &block.global_exit_root, l1_block_hash)?;
    }
    if block.l1_info_tree_index != 0 {
        hdb.write_block_l1_info_tree_index(number, u64::from(block.l1_info_tree_index))?;
    }
    hdb.write_state_root(number, &block.state_root)?;
    if let Some(root) = non_zero(&block.block_info_root) {
        hdb.write_block_info_root(number, root)?;
    }
    for tx in &block.l2_txs {
        hdb.write_effective_gas_price_percentage(&tx.hash, tx.effective_gas_price_percentage)?;
    }
    Ok(())
}

fn non_zero(hash: &Hash) -> Option<&Hash> {
    (*hash != ZERO_HASH).then_some(hash)
}

impl Stage for BatchesStage {
    fn id(&self) -> SyncStage {
        SyncStage::Batches
    }

    fn description(&self) -> &str {
        "Download batches"
    }

    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        if ctx.bad_block_unwind {
            return Ok(ForwardOutcome::Advanced(state.block_number));
        }
        let hdb = HermezDb::new(tx);
        let mut last_block = state.block_number;
        if ctx.target.is_some_and(|t| t <= last_block) {
            return Ok(ForwardOutcome::Advanced(last_block));
        }

        self.check_errors()?;
        let stale = self.discard_stale_blocks();
        if stale > 0 {
            debug!(stale, "discarded blocks queued by an earlier pass");
        }
        self.client
            .read_all_entries_to_channel(Bookmark::L2Block(last_block + 1))?;
        self.check_errors()?;

        let mut written = 0usize;
        loop {
            ctx.interrupt.check()?;
            let Ok(block) = self.client.l2_block_rx().try_recv() else {
                break;
            };
            let number = block.l2_block_number;
            if number <= last_block || ctx.target.is_some_and(|t| number > t) {
                continue;
            }
            if number != last_block + 1 {
                return Err(StageError::BlockGap {
                    expected: last_block + 1,
                    got: number,
                });
            }
            write_block(&hdb, &block)?;
            last_block = number;
            written += 1;
        }
        self.check_errors()?;
        let batch_limit = hdb.get_batch_no_by_l2_block(last_block)?;
        self.apply_side_entries(&hdb, batch_limit)?;

        if written > 0 {
            info!(
                from = state.block_number + 1,
                to = last_block,
                batch = batch_limit,
                "downloaded blocks"
            );
        } else if self.is_stalled() {
            warn!(
                progress = last_block,
                timeout_secs = self.cfg.stall_timeout_secs,
                "datastream stalled"
            );
        }
        Ok(ForwardOutcome::Advanced(last_block))
    }

    /// Deletes every per-block and per-batch fact above the unwind point.
    fn unwind(
        &mut self,
        _ctx: &StageCtx,
        unwind: &UnwindState,
        _state: &StageState,
        tx: &RwTx,
    ) -> Result<u64, StageError> {
        let hdb = HermezDb::new(tx);
        let from = unwind.unwind_point + 1;
        let to = u64::MAX;
        let kept_batch = hdb.get_batch_no_by_l2_block(unwind.unwind_point)?;

        let gers: Vec<Hash> = hdb
            .get_block_global_exit_roots(from, to)?
            .into_iter()
            .map(|(ger, _)| ger)
            .collect();
        hdb.delete_global_exit_roots(&gers)?;
        hdb.delete_block_global_exit_roots(from, to)?;
        hdb.delete_batch_global_exit_roots(kept_batch + 1)?;
        hdb.delete_fork_ids(kept_batch + 1, u64::MAX)?;
        hdb.delete_fork_id_block(from, to)?;
        hdb.delete_state_roots(from, to)?;
        hdb.delete_block_info_roots(from, to)?;
        hdb.delete_block_l1_info_tree_indices(from, to)?;
        hdb.delete_block_batches(from, to)?;
        self.pending_starts.clear();
        self.pending_gers.clear();

        debug!(point = unwind.unwind_point, kept_batch, "batches unwound");
        Ok(unwind.unwind_point)
    }
}
