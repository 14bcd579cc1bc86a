use zk_db::{RwTx, get_stage_progress};

use crate::errors::StageError;
use crate::stage::{
    ForwardOutcome, PruneState, Stage, StageCtx, StageState, SyncStage, UnwindState,
};

/// Work of a stage implemented outside the sync core (execution, hashing,
/// indexing and the like).
pub trait StageWorker {
    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError>;

    fn unwind(
        &mut self,
        _ctx: &StageCtx,
        _unwind: &UnwindState,
        _tx: &RwTx,
    ) -> Result<(), StageError> {
        Ok(())
    }

    fn prune(
        &mut self,
        _ctx: &StageCtx,
        _prune: &PruneState,
        _tx: &RwTx,
    ) -> Result<(), StageError> {
        Ok(())
    }
}

/// A stage whose metadata lives in the pipeline definition and whose work is
/// delegated to a worker.
pub struct ExternalStage {
    id: SyncStage,
    description: &'static str,
    disabled_description: Option<&'static str>,
    prune_enabled: bool,
    worker: Box<dyn StageWorker>,
}

impl ExternalStage {
    pub fn new(id: SyncStage, description: &'static str, worker: Box<dyn StageWorker>) -> Self {
        Self {
            id,
            description,
            disabled_description: None,
            prune_enabled: true,
            worker,
        }
    }

    /// Keeps the stage in the pipeline structure but skips it.
    pub fn disable(mut self, why: &'static str) -> Self {
        self.disabled_description = Some(why);
        self
    }

    /// Makes prune a no-op regardless of the worker.
    pub fn without_prune(mut self) -> Self {
        self.prune_enabled = false;
        self
    }
}

impl Stage for ExternalStage {
    fn id(&self) -> SyncStage {
        self.id
    }

    fn description(&self) -> &str {
        self.description
    }

    fn disabled(&self) -> bool {
        self.disabled_description.is_some()
    }

    fn disabled_description(&self) -> &str {
        self.disabled_description.unwrap_or("")
    }

    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        self.worker.forward(ctx, state, tx)
    }

    fn unwind(
        &mut self,
        ctx: &StageCtx,
        unwind: &UnwindState,
        _state: &StageState,
        tx: &RwTx,
    ) -> Result<u64, StageError> {
        self.worker.unwind(ctx, unwind, tx)?;
        Ok(unwind.unwind_point)
    }

    fn prune(&mut self, ctx: &StageCtx, prune: &PruneState, tx: &RwTx) -> Result<(), StageError> {
        if !self.prune_enabled {
            return Ok(());
        }
        self.worker.prune(ctx, prune, tx)
    }
}

/// Advances to the progress of an upstream stage and does nothing else.
#[derive(Clone, Copy, Debug)]
pub struct TrackUpstream {
    upstream: SyncStage,
}

impl TrackUpstream {
    pub fn new(upstream: SyncStage) -> Self {
        Self { upstream }
    }
}

impl StageWorker for TrackUpstream {
    fn forward(
        &mut self,
        ctx: &StageCtx,
        _state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        let upstream = get_stage_progress(tx, self.upstream.name())?;
        Ok(ForwardOutcome::Advanced(ctx.clamp(upstream)))
    }
}
