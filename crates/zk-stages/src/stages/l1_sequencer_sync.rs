use tracing::*;
use zk_db::{HermezDb, HermezRead, HermezWrite, L1InfoTreeUpdate, RwTx};

use crate::config::L1SyncerConfig;
use crate::errors::StageError;
use crate::l1::{L1Client, L1Event, windows};
use crate::stage::{ForwardOutcome, Stage, StageCtx, StageState, SyncStage, UnwindState};

/// Sequencer-side L1 sync: records L1 info tree updates and the batches
/// injected at genesis. Progress is the last L1 block scanned.
pub struct L1SequencerSyncStage {
    cfg: L1SyncerConfig,
    client: Box<dyn L1Client>,
}

impl L1SequencerSyncStage {
    pub fn new(cfg: L1SyncerConfig, client: Box<dyn L1Client>) -> Self {
        Self { cfg, client }
    }
}

/// Writes `update` if it is the next index of the tree. Indexes already
/// stored are skipped.
fn apply_info_tree_update(
    hdb: &HermezDb<'_>,
    update: &L1InfoTreeUpdate,
) -> Result<bool, StageError> {
    let expected = match hdb.get_latest_l1_info_tree_update()? {
        Some(latest) => latest.index + 1,
        None => 0,
    };
    if update.index < expected {
        trace!(index = update.index, "info tree update already stored");
        return Ok(false);
    }
    if update.index > expected {
        return Err(StageError::L1InfoTreeGap {
            expected,
            got: update.index,
        });
    }
    hdb.write_l1_info_tree_update(update)?;
    Ok(true)
}

impl Stage for L1SequencerSyncStage {
    fn id(&self) -> SyncStage {
        SyncStage::L1Syncer
    }

    fn description(&self) -> &str {
        "L1 Sequencer Sync Updates"
    }

    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        let hdb = HermezDb::new(tx);
        let latest = self.client.latest_block()?;
        let from = if state.block_number == 0 {
            self.cfg.start_block
        } else {
            state.block_number + 1
        };

        let mut progress = state.block_number;
        let mut updates = 0usize;
        for (start, end) in windows(from, latest, self.cfg.block_range) {
            ctx.interrupt.check()?;
            for event in self.client.events(start, end)? {
                match event {
                    L1Event::InfoTreeUpdate(update) => {
                        if apply_info_tree_update(&hdb, &update)? {
                            updates += 1;
                        }
                    }
                    L1Event::InjectedBatch(batch) => {
                        let index = hdb.write_l1_injected_batch(&batch)?;
                        info!(index, l1_block = batch.l1_block_number, "stored injected batch");
                    }
                    _ => {}
                }
            }
            progress = end;
        }

        if updates > 0 {
            debug!(updates, to = progress, "l1 info tree updated");
        }
        Ok(ForwardOutcome::Advanced(progress))
    }

    fn unwind(
        &mut self,
        _ctx: &StageCtx,
        _unwind: &UnwindState,
        state: &StageState,
        _tx: &RwTx,
    ) -> Result<u64, StageError> {
        Ok(state.block_number)
    }
}
