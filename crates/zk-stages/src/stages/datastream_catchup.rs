use tracing::*;
use zk_db::{RwTx, get_stage_progress};

use crate::datastream::DataStreamServer;
use crate::errors::StageError;
use crate::stage::{ForwardOutcome, Stage, StageCtx, StageState, SyncStage, UnwindState};

/// Publishes executed blocks the data-stream server has not seen yet.
pub struct DataStreamCatchupStage {
    server: Box<dyn DataStreamServer>,
}

impl DataStreamCatchupStage {
    pub fn new(server: Box<dyn DataStreamServer>) -> Self {
        Self { server }
    }
}

impl Stage for DataStreamCatchupStage {
    fn id(&self) -> SyncStage {
        SyncStage::DataStream
    }

    fn description(&self) -> &str {
        "Update the data stream with missing details"
    }

    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        let executed = ctx.clamp(get_stage_progress(tx, SyncStage::Execution.name())?);
        let published = self.server.highest_block(tx)?;
        if executed > published {
            ctx.interrupt.check()?;
            self.server.write_blocks(tx, published + 1, executed)?;
            debug!(from = published + 1, to = executed, "data stream caught up");
        }
        Ok(ForwardOutcome::Advanced(executed.max(state.block_number)))
    }

    /// Published entries are not retracted; progress is kept.
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
