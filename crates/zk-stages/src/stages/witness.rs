use tracing::*;
use zk_db::{HermezDb, HermezRead, HermezWrite, RwTx, get_stage_progress};

use crate::config::WitnessConfig;
use crate::errors::{StageError, WitnessError};
use crate::stage::{
    ForwardOutcome, PruneState, Stage, StageCtx, StageState, SyncStage, UnwindState,
};

/// Produces the witness blob of a batch.
pub trait WitnessGenerator {
    fn generate_witness(&mut self, tx: &RwTx, batch_no: u64) -> Result<Vec<u8>, WitnessError>;
}

/// Stores a witness for every closed batch whose blocks have all been
/// executed. Progress is the last block of the last witnessed batch.
pub struct WitnessStage {
    cfg: WitnessConfig,
    generator: Box<dyn WitnessGenerator>,
}

impl WitnessStage {
    pub fn new(cfg: WitnessConfig, generator: Box<dyn WitnessGenerator>) -> Self {
        Self { cfg, generator }
    }
}

impl Stage for WitnessStage {
    fn id(&self) -> SyncStage {
        SyncStage::Witness
    }

    fn description(&self) -> &str {
        "Generates and stores witness of batches"
    }

    fn disabled(&self) -> bool {
        !self.cfg.enabled
    }

    fn disabled_description(&self) -> &str {
        "witness generation disabled in config"
    }

    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        let hdb = HermezDb::new(tx);
        let executed = ctx.clamp(get_stage_progress(tx, SyncStage::Execution.name())?);
        let latest_batch = hdb.get_latest_downloaded_batch_no()?;

        let mut progress = state.block_number;
        let mut batch = hdb.get_batch_no_by_l2_block(progress)? + 1;
        // The latest downloaded batch may still be receiving blocks.
        while batch < latest_batch {
            ctx.interrupt.check()?;
            let highest = hdb.get_highest_block_in_batch(batch)?;
            if highest > executed {
                break;
            }
            if highest != 0 {
                let witness = self.generator.generate_witness(tx, batch)?;
                hdb.write_witness_by_batch_no(batch, &witness)?;
                debug!(batch, bytes = witness.len(), "stored witness");
                progress = highest;
            }
            batch += 1;
        }
        Ok(ForwardOutcome::Advanced(progress))
    }

    /// Drops the witness of the batch holding the unwind point and every
    /// later one, leaving progress at the end of the previous batch.
    fn unwind(
        &mut self,
        _ctx: &StageCtx,
        unwind: &UnwindState,
        _state: &StageState,
        tx: &RwTx,
    ) -> Result<u64, StageError> {
        let hdb = HermezDb::new(tx);
        let batch = hdb.get_batch_no_by_l2_block(unwind.unwind_point)?;
        hdb.delete_witness_by_batch_range(batch, u64::MAX)?;
        let progress = match batch {
            0 => 0,
            b => hdb.get_highest_block_in_batch(b - 1)?,
        };
        Ok(progress.min(unwind.unwind_point))
    }

    /// Drops witnesses of batches that end before the prune boundary.
    fn prune(&mut self, _ctx: &StageCtx, prune: &PruneState, tx: &RwTx) -> Result<(), StageError> {
        let hdb = HermezDb::new(tx);
        let batch = hdb.get_batch_no_by_l2_block(prune.prune_to)?;
        if batch > 0 {
            hdb.delete_witness_by_batch_range(0, batch - 1)?;
        }
        Ok(())
    }
}
