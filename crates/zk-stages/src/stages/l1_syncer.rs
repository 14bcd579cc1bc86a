use tracing::*;
use zk_db::{Hash, HermezDb, HermezRead, HermezWrite, RwTx, ZERO_HASH};

use crate::config::L1SyncerConfig;
use crate::errors::StageError;
use crate::l1::{L1Client, L1Event, windows};
use crate::stage::{
    ForwardOutcome, Stage, StageCtx, StageState, SyncStage, UnwindReason, UnwindState,
};

/// Downloads sequences, verifications and fork upgrades from L1.
///
/// Progress is the last L1 block scanned. A verification whose state root
/// differs from the locally stored root of the batch's last block triggers
/// an unwind to the end of the previous batch.
pub struct L1SyncerStage {
    cfg: L1SyncerConfig,
    client: Box<dyn L1Client>,
}

impl L1SyncerStage {
    pub fn new(cfg: L1SyncerConfig, client: Box<dyn L1Client>) -> Self {
        Self { cfg, client }
    }

    fn check_verification(
        &self,
        hdb: &HermezDb<'_>,
        batch_no: u64,
        l1_state_root: &Hash,
    ) -> Result<Option<ForwardOutcome>, StageError> {
        let highest = hdb.get_highest_block_in_batch(batch_no)?;
        if highest == 0 {
            return Ok(None);
        }
        let local = hdb.get_state_root(highest)?;
        if local == ZERO_HASH || local == *l1_state_root {
            return Ok(None);
        }
        let target = match batch_no {
            0 => 0,
            b => hdb.get_highest_block_in_batch(b - 1)?,
        };
        Ok(Some(ForwardOutcome::UnwindRequested {
            target,
            reason: UnwindReason::StateRootMismatch {
                batch: batch_no,
                l1_state_root: *l1_state_root,
                local_state_root: local,
            },
        }))
    }
}

impl Stage for L1SyncerStage {
    fn id(&self) -> SyncStage {
        SyncStage::L1Syncer
    }

    fn description(&self) -> &str {
        "Download L1 Verifications"
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
        let latest = self.client.latest_block()?;
        let from = if state.block_number == 0 {
            self.cfg.start_block
        } else {
            state.block_number + 1
        };

        let mut progress = state.block_number;
        let (mut sequences, mut verifications) = (0usize, 0usize);
        for (start, end) in windows(from, latest, self.cfg.block_range) {
            ctx.interrupt.check()?;
            for event in self.client.events(start, end)? {
                match event {
                    L1Event::Sequence {
                        l1_block_no,
                        batch_no,
                        l1_tx_hash,
                        state_root,
                        l1_info_root,
                    } => {
                        hdb.write_sequence(
                            l1_block_no,
                            batch_no,
                            &l1_tx_hash,
                            &state_root,
                            l1_info_root.as_ref(),
                        )?;
                        sequences += 1;
                    }
                    L1Event::Verification {
                        l1_block_no,
                        batch_no,
                        l1_tx_hash,
                        state_root,
                    } => {
                        let mismatch = self.check_verification(&hdb, batch_no, &state_root)?;
                        if let Some(unwind) = mismatch {
                            warn!(
                                batch_no,
                                l1_block_no,
                                "l1 verification disagrees with local state root"
                            );
                            return Ok(unwind);
                        }
                        hdb.write_verification(
                            l1_block_no,
                            batch_no,
                            &l1_tx_hash,
                            &state_root,
                            None,
                        )?;
                        verifications += 1;
                    }
                    L1Event::ForkId { batch_no, fork_id } => {
                        hdb.write_fork_id(batch_no, fork_id)?;
                    }
                    L1Event::InfoTreeUpdate(_) | L1Event::InjectedBatch(_) => {
                        trace!("ignoring sequencer-only l1 event");
                    }
                }
            }
            progress = end;
        }

        if progress != state.block_number {
            info!(from, to = progress, sequences, verifications, "l1 sync");
        }
        Ok(ForwardOutcome::Advanced(progress))
    }

    /// L1 data is final, so the stage keeps its progress.
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
