use zk_db::{RwTx, get_stage_progress};

use crate::errors::StageError;
use crate::stage::{ForwardOutcome, Stage, StageCtx, StageState, SyncStage, UnwindState};

/// Marks the height every stage of the cycle has reached.
#[derive(Debug, Default)]
pub struct FinishStage;

impl Stage for FinishStage {
    fn id(&self) -> SyncStage {
        SyncStage::Finish
    }

    fn description(&self) -> &str {
        "Final: update current block for the RPC API"
    }

    fn forward(
        &mut self,
        ctx: &StageCtx,
        _state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        let executed = get_stage_progress(tx, SyncStage::Execution.name())?;
        Ok(ForwardOutcome::Advanced(ctx.clamp(executed)))
    }

    fn unwind(
        &mut self,
        _ctx: &StageCtx,
        unwind: &UnwindState,
        _state: &StageState,
        _tx: &RwTx,
    ) -> Result<u64, StageError> {
        Ok(unwind.unwind_point)
    }
}
