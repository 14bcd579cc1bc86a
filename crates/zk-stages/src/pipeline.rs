//! Ordered stage execution: forward, unwind and prune passes.
//!
//! A pass runs every stage against the one write transaction handed in by
//! the driver; the driver commits or drops it afterwards.

use std::collections::HashSet;

use tracing::*;
use zk_db::{
    RwTx, get_stage_progress, get_stage_prune_progress, save_stage_progress,
    save_stage_prune_progress,
};

use crate::errors::PipelineError;
use crate::stage::{
    ForwardOutcome, PruneState, Stage, StageCtx, StageState, SyncStage, UnwindReason, UnwindState,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForwardResult {
    Completed,
    UnwindRequested {
        stage: SyncStage,
        target: u64,
        reason: UnwindReason,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Unwound {
        stage: SyncStage,
        target: u64,
        reason: UnwindReason,
    },
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    unwind_order: Vec<SyncStage>,
}

impl Pipeline {
    /// Builds a pipeline from stages in forward order and a separately
    /// declared unwind order. Unwind entries without a stage are skipped when
    /// unwinding.
    pub fn new(
        stages: Vec<Box<dyn Stage>>,
        unwind_order: Vec<SyncStage>,
    ) -> Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.id()) {
                return Err(PipelineError::DuplicateStage(stage.id()));
            }
        }
        let mut seen = HashSet::new();
        for id in &unwind_order {
            if !seen.insert(*id) {
                return Err(PipelineError::DuplicateUnwindEntry(*id));
            }
        }
        Ok(Self {
            stages,
            unwind_order,
        })
    }

    pub fn forward_order(&self) -> Vec<SyncStage> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    pub fn unwind_order(&self) -> &[SyncStage] {
        &self.unwind_order
    }

    /// Declared unwind order followed by the remaining stages in forward
    /// order.
    pub fn prune_order(&self) -> Vec<SyncStage> {
        let mut order: Vec<SyncStage> = self
            .unwind_order
            .iter()
            .copied()
            .filter(|id| self.position(*id).is_some())
            .collect();
        for stage in &self.stages {
            if !order.contains(&stage.id()) {
                order.push(stage.id());
            }
        }
        order
    }

    pub fn stage(&self, id: SyncStage) -> Option<&dyn Stage> {
        self.position(id).map(|i| self.stages[i].as_ref())
    }

    fn position(&self, id: SyncStage) -> Option<usize> {
        self.stages.iter().position(|s| s.id() == id)
    }

    /// Runs enabled stages in forward order. Stops at the first stage that
    /// asks for an unwind, leaving that stage's progress untouched.
    pub fn forward(&mut self, tx: &RwTx, ctx: &StageCtx) -> Result<ForwardResult, PipelineError> {
        for stage in self.stages.iter_mut() {
            let id = stage.id();
            if stage.disabled() {
                debug!(%id, why = stage.disabled_description(), "skipping disabled stage");
                continue;
            }
            ctx.interrupt
                .check()
                .map_err(|e| PipelineError::from_stage(id, e))?;

            let state = StageState {
                id,
                block_number: get_stage_progress(tx, id.name())?,
            };
            debug!(%id, progress = state.block_number, "stage forward");
            let outcome = stage
                .forward(ctx, &state, tx)
                .map_err(|e| PipelineError::from_stage(id, e))?;

            match outcome {
                ForwardOutcome::Advanced(progress) => {
                    if progress != state.block_number {
                        save_stage_progress(tx, id.name(), progress)?;
                        info!(%id, from = state.block_number, to = progress, "stage advanced");
                    }
                }
                ForwardOutcome::UnwindRequested { target, reason } => {
                    warn!(%id, target, %reason, "stage requested unwind");
                    return Ok(ForwardResult::UnwindRequested {
                        stage: id,
                        target,
                        reason,
                    });
                }
            }
        }
        Ok(ForwardResult::Completed)
    }

    /// Unwinds stages to `point` strictly in the declared unwind order.
    /// Stages already at or below `point` are left alone.
    pub fn unwind_to(
        &mut self,
        tx: &RwTx,
        ctx: &StageCtx,
        point: u64,
        reason: UnwindReason,
    ) -> Result<(), PipelineError> {
        info!(point, %reason, "unwinding");
        for id in self.unwind_order.clone() {
            let Some(index) = self.position(id) else {
                continue;
            };
            let stage = &mut self.stages[index];
            if stage.disabled() {
                continue;
            }
            ctx.interrupt
                .check()
                .map_err(|e| PipelineError::from_stage(id, e))?;

            let progress = get_stage_progress(tx, id.name())?;
            if progress <= point {
                continue;
            }
            let state = StageState {
                id,
                block_number: progress,
            };
            let unwind = UnwindState {
                id,
                unwind_point: point,
                current_block_number: progress,
                reason: reason.clone(),
            };
            let new_progress = stage
                .unwind(ctx, &unwind, &state, tx)
                .map_err(|e| PipelineError::from_stage(id, e))?;
            if new_progress != progress {
                save_stage_progress(tx, id.name(), new_progress)?;
            }
            debug!(%id, from = progress, to = new_progress, "stage unwound");
        }
        Ok(())
    }

    /// Prunes history below `prune_to`, bounded per stage by its forward
    /// progress.
    pub fn prune(&mut self, tx: &RwTx, ctx: &StageCtx, prune_to: u64) -> Result<(), PipelineError> {
        for id in self.prune_order() {
            let Some(index) = self.position(id) else {
                continue;
            };
            let stage = &mut self.stages[index];
            if stage.disabled() {
                continue;
            }
            ctx.interrupt
                .check()
                .map_err(|e| PipelineError::from_stage(id, e))?;

            let forward_progress = get_stage_progress(tx, id.name())?;
            let prune_progress = get_stage_prune_progress(tx, id.name())?;
            let target = prune_to.min(forward_progress);
            if target <= prune_progress {
                continue;
            }
            let prune = PruneState {
                id,
                forward_progress,
                prune_progress,
                prune_to: target,
            };
            stage
                .prune(ctx, &prune, tx)
                .map_err(|e| PipelineError::from_stage(id, e))?;
            save_stage_prune_progress(tx, id.name(), target)?;
            debug!(%id, prune_to = target, "stage pruned");
        }
        Ok(())
    }

    /// One sync cycle: forward, and on a requested unwind roll every stage
    /// back to the requested target inside the same transaction.
    pub fn run_cycle(&mut self, tx: &RwTx, ctx: &StageCtx) -> Result<CycleOutcome, PipelineError> {
        match self.forward(tx, ctx)? {
            ForwardResult::Completed => Ok(CycleOutcome::Completed),
            ForwardResult::UnwindRequested {
                stage,
                target,
                reason,
            } => {
                self.unwind_to(tx, ctx, target, reason.clone())?;
                Ok(CycleOutcome::Unwound {
                    stage,
                    target,
                    reason,
                })
            }
        }
    }
}
