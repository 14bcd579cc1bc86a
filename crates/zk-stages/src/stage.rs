//! Stage identifiers, per-operation state and the `Stage` contract.

use std::fmt;

use zk_db::{Hash, RwTx};

use crate::errors::StageError;
use crate::interrupt::Interrupt;

// ---------------------------------------------------------------------------
// SyncStage
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncStage {
    L1Syncer,
    Batches,
    CumulativeIndex,
    BlockHashes,
    Senders,
    Execution,
    Witness,
    HashState,
    IntermediateHashes,
    CallTraces,
    AccountHistoryIndex,
    StorageHistoryIndex,
    LogIndex,
    TxLookup,
    DataStream,
    SequenceExecutorVerify,
    Finish,
}

impl SyncStage {
    /// Stable name, used as the progress key.
    pub const fn name(self) -> &'static str {
        match self {
            SyncStage::L1Syncer => "L1Syncer",
            SyncStage::Batches => "Batches",
            SyncStage::CumulativeIndex => "CumulativeIndex",
            SyncStage::BlockHashes => "BlockHashes",
            SyncStage::Senders => "Senders",
            SyncStage::Execution => "Execution",
            SyncStage::Witness => "Witness",
            SyncStage::HashState => "HashState",
            SyncStage::IntermediateHashes => "IntermediateHashes",
            SyncStage::CallTraces => "CallTraces",
            SyncStage::AccountHistoryIndex => "AccountHistoryIndex",
            SyncStage::StorageHistoryIndex => "StorageHistoryIndex",
            SyncStage::LogIndex => "LogIndex",
            SyncStage::TxLookup => "TxLookup",
            SyncStage::DataStream => "DataStream",
            SyncStage::SequenceExecutorVerify => "SequenceExecutorVerify",
            SyncStage::Finish => "Finish",
        }
    }

    pub const ALL: [SyncStage; 17] = [
        SyncStage::L1Syncer,
        SyncStage::Batches,
        SyncStage::CumulativeIndex,
        SyncStage::BlockHashes,
        SyncStage::Senders,
        SyncStage::Execution,
        SyncStage::Witness,
        SyncStage::HashState,
        SyncStage::IntermediateHashes,
        SyncStage::CallTraces,
        SyncStage::AccountHistoryIndex,
        SyncStage::StorageHistoryIndex,
        SyncStage::LogIndex,
        SyncStage::TxLookup,
        SyncStage::DataStream,
        SyncStage::SequenceExecutorVerify,
        SyncStage::Finish,
    ];

    pub fn from_name(name: &str) -> Option<SyncStage> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Operation context and state
// ---------------------------------------------------------------------------

/// Flags and handles passed to every stage operation of one pass.
#[derive(Clone, Debug, Default)]
pub struct StageCtx {
    pub first_cycle: bool,
    /// Set on the cycle following an unwind caused by a bad block; stages
    /// that download new data skip their work.
    pub bad_block_unwind: bool,
    /// Upper bound on the L2 block height to reach in this pass.
    pub target: Option<u64>,
    pub interrupt: Interrupt,
}

impl StageCtx {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            ..Default::default()
        }
    }

    pub fn with_first_cycle(mut self, first_cycle: bool) -> Self {
        self.first_cycle = first_cycle;
        self
    }

    pub fn with_bad_block_unwind(mut self, bad_block_unwind: bool) -> Self {
        self.bad_block_unwind = bad_block_unwind;
        self
    }

    pub fn with_target(mut self, target: u64) -> Self {
        self.target = Some(target);
        self
    }

    /// Clamps `height` to the pass target.
    pub fn clamp(&self, height: u64) -> u64 {
        match self.target {
            Some(target) => height.min(target),
            None => height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageState {
    pub id: SyncStage,
    /// Persisted forward progress.
    pub block_number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnwindState {
    pub id: SyncStage,
    pub unwind_point: u64,
    pub current_block_number: u64,
    pub reason: UnwindReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PruneState {
    pub id: SyncStage,
    pub forward_progress: u64,
    pub prune_progress: u64,
    /// Data strictly below this height may be discarded.
    pub prune_to: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnwindReason {
    BadBlock { block: u64 },
    StateRootMismatch {
        batch: u64,
        l1_state_root: Hash,
        local_state_root: Hash,
    },
    Requested(String),
}

impl UnwindReason {
    pub fn is_bad_block(&self) -> bool {
        matches!(
            self,
            UnwindReason::BadBlock { .. } | UnwindReason::StateRootMismatch { .. }
        )
    }
}

impl fmt::Display for UnwindReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnwindReason::BadBlock { block } => write!(f, "bad block {block}"),
            UnwindReason::StateRootMismatch { batch, .. } => {
                write!(f, "state root mismatch in batch {batch}")
            }
            UnwindReason::Requested(why) => write!(f, "requested: {why}"),
        }
    }
}

/// Result of a forward pass of one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// New progress to persist.
    Advanced(u64),
    /// The stage found a fault; the pipeline rolls back to `target`.
    UnwindRequested { target: u64, reason: UnwindReason },
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

pub trait Stage {
    fn id(&self) -> SyncStage;

    fn description(&self) -> &str;

    fn disabled(&self) -> bool {
        false
    }

    fn disabled_description(&self) -> &str {
        ""
    }

    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError>;

    /// Reverts the stage to `unwind.unwind_point` and returns the progress
    /// to persist.
    fn unwind(
        &mut self,
        ctx: &StageCtx,
        unwind: &UnwindState,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<u64, StageError>;

    fn prune(
        &mut self,
        _ctx: &StageCtx,
        _prune: &PruneState,
        _tx: &RwTx,
    ) -> Result<(), StageError> {
        Ok(())
    }
}
