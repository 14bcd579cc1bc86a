//! The two pipeline variants and their ordering tables.
//!
//! Unwind orders are declared separately from forward orders: intermediate
//! hashes unwind before execution and hashed state so the trie is never
//! rebuilt against history that is already gone.

use std::collections::HashMap;

use crate::config::ZkSyncConfig;
use crate::datastream::{DataStreamServer, DatastreamClient};
use crate::errors::PipelineError;
use crate::l1::L1Client;
use crate::pipeline::Pipeline;
use crate::stage::{Stage, SyncStage};
use crate::stages::{
    BatchesStage, DataStreamCatchupStage, ExternalStage, FinishStage, L1SequencerSyncStage,
    L1SyncerStage, StageWorker, TrackUpstream, WitnessGenerator, WitnessStage,
};

use SyncStage::*;

// ---------------------------------------------------------------------------
// Ordering tables
// ---------------------------------------------------------------------------

/// Canonical list of stage ids known to the zk node.
pub fn all_stages_zk() -> Vec<SyncStage> {
    vec![
        L1Syncer,
        Batches,
        CumulativeIndex,
        BlockHashes,
        Senders,
        Execution,
        Witness,
        HashState,
        IntermediateHashes,
        LogIndex,
        CallTraces,
        TxLookup,
        Finish,
    ]
}

pub fn zk_sequencer_unwind_order() -> Vec<SyncStage> {
    vec![
        IntermediateHashes,
        Execution,
        Witness,
        HashState,
        CallTraces,
        AccountHistoryIndex,
        StorageHistoryIndex,
        LogIndex,
        TxLookup,
        Finish,
    ]
}

pub fn zk_unwind_order() -> Vec<SyncStage> {
    vec![
        L1Syncer,
        Batches,
        BlockHashes,
        IntermediateHashes,
        Execution,
        Witness,
        HashState,
        Senders,
        CallTraces,
        AccountHistoryIndex,
        StorageHistoryIndex,
        LogIndex,
        TxLookup,
        Finish,
    ]
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Workers for the stages whose work lives outside the sync core.
#[derive(Default)]
pub struct ExternalWorkers {
    workers: HashMap<SyncStage, Box<dyn StageWorker>>,
}

impl ExternalWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SyncStage, worker: Box<dyn StageWorker>) {
        self.workers.insert(id, worker);
    }

    pub fn with(mut self, id: SyncStage, worker: impl StageWorker + 'static) -> Self {
        self.insert(id, Box::new(worker));
        self
    }

    /// Every stage in `ids` follows the progress of `upstream`.
    pub fn track_all(mut self, ids: &[SyncStage], upstream: SyncStage) -> Self {
        for id in ids {
            self.insert(*id, Box::new(TrackUpstream::new(upstream)));
        }
        self
    }

    fn take(&mut self, id: SyncStage) -> Result<Box<dyn StageWorker>, PipelineError> {
        self.workers
            .remove(&id)
            .ok_or(PipelineError::MissingWorker(id))
    }

    fn stage(
        &mut self,
        id: SyncStage,
        description: &'static str,
    ) -> Result<ExternalStage, PipelineError> {
        Ok(ExternalStage::new(id, description, self.take(id)?))
    }
}

/// Collaborators of the follower pipeline.
pub struct FollowerCollaborators {
    pub l1: Box<dyn L1Client>,
    pub datastream: Box<dyn DatastreamClient>,
    pub witness: Box<dyn WitnessGenerator>,
    pub datastream_server: Box<dyn DataStreamServer>,
    pub workers: ExternalWorkers,
}

/// Collaborators of the sequencer pipeline.
pub struct SequencerCollaborators {
    pub l1: Box<dyn L1Client>,
    pub witness: Box<dyn WitnessGenerator>,
    pub datastream_server: Box<dyn DataStreamServer>,
    pub workers: ExternalWorkers,
}

/// Stages of the follower pipeline that need an external worker.
pub const FOLLOWER_EXTERNAL_STAGES: [SyncStage; 11] = [
    BlockHashes,
    Senders,
    Execution,
    CumulativeIndex,
    HashState,
    IntermediateHashes,
    CallTraces,
    AccountHistoryIndex,
    StorageHistoryIndex,
    LogIndex,
    TxLookup,
];

/// Stages of the sequencer pipeline that need an external worker. Call
/// traces are disabled there and fall back to a placeholder.
pub const SEQUENCER_EXTERNAL_STAGES: [SyncStage; 8] = [
    Execution,
    IntermediateHashes,
    SequenceExecutorVerify,
    HashState,
    AccountHistoryIndex,
    StorageHistoryIndex,
    LogIndex,
    TxLookup,
];

// ---------------------------------------------------------------------------
// Stage lists
// ---------------------------------------------------------------------------

/// Stages of a node that follows batches downloaded from the data stream
/// and verified on L1.
pub fn default_zk_stages(
    cfg: &ZkSyncConfig,
    deps: FollowerCollaborators,
) -> Result<Vec<Box<dyn Stage>>, PipelineError> {
    let FollowerCollaborators {
        l1,
        datastream,
        witness,
        datastream_server,
        mut workers,
    } = deps;

    let stages: Vec<Box<dyn Stage>> = vec![
        Box::new(L1SyncerStage::new(cfg.l1_syncer.clone(), l1)),
        Box::new(BatchesStage::new(cfg.batches.clone(), datastream)),
        Box::new(workers.stage(BlockHashes, "Write block hashes")?),
        Box::new(workers.stage(Senders, "Recover senders from tx signatures")?),
        Box::new(workers.stage(Execution, "Execute blocks w/o hash checks")?),
        Box::new(WitnessStage::new(cfg.witness.clone(), witness)),
        Box::new(workers.stage(CumulativeIndex, "Write Cumulative Index")?),
        Box::new(workers.stage(HashState, "Hash the key in the state")?),
        Box::new(
            workers
                .stage(
                    IntermediateHashes,
                    "Generate intermediate hashes and computing state root",
                )?
                .without_prune(),
        ),
        Box::new(workers.stage(CallTraces, "Generate call traces index")?),
        Box::new(workers.stage(AccountHistoryIndex, "Generate account history index")?),
        Box::new(workers.stage(StorageHistoryIndex, "Generate storage history index")?),
        Box::new(workers.stage(LogIndex, "Generate receipt logs index")?),
        Box::new(workers.stage(TxLookup, "Generate tx lookup index")?),
        Box::new(DataStreamCatchupStage::new(datastream_server)),
        Box::new(FinishStage),
    ];
    Ok(stages)
}

/// Stages of a node that produces batches.
pub fn sequencer_zk_stages(
    cfg: &ZkSyncConfig,
    deps: SequencerCollaborators,
) -> Result<Vec<Box<dyn Stage>>, PipelineError> {
    let SequencerCollaborators {
        l1,
        witness,
        datastream_server,
        mut workers,
    } = deps;

    let call_traces = workers
        .take(CallTraces)
        .unwrap_or_else(|_| Box::new(TrackUpstream::new(Execution)));

    let stages: Vec<Box<dyn Stage>> = vec![
        Box::new(L1SequencerSyncStage::new(cfg.l1_syncer.clone(), l1)),
        Box::new(workers.stage(Execution, "Sequence transactions")?),
        Box::new(WitnessStage::new(cfg.witness.clone(), witness)),
        Box::new(workers.stage(IntermediateHashes, "Sequencer Intermediate Hashes")?),
        Box::new(workers.stage(
            SequenceExecutorVerify,
            "Sequencer, check batch with legacy executor",
        )?),
        Box::new(workers.stage(HashState, "Hash the key in the state")?),
        Box::new(
            ExternalStage::new(CallTraces, "Generate call traces index", call_traces)
                .disable("Work In Progress"),
        ),
        Box::new(workers.stage(AccountHistoryIndex, "Generate account history index")?),
        Box::new(workers.stage(StorageHistoryIndex, "Generate storage history index")?),
        Box::new(workers.stage(LogIndex, "Generate receipt logs index")?),
        Box::new(workers.stage(TxLookup, "Generate tx lookup index")?),
        Box::new(DataStreamCatchupStage::new(datastream_server)),
        Box::new(FinishStage),
    ];
    Ok(stages)
}

pub fn default_pipeline(
    cfg: &ZkSyncConfig,
    deps: FollowerCollaborators,
) -> Result<Pipeline, PipelineError> {
    Pipeline::new(default_zk_stages(cfg, deps)?, zk_unwind_order())
}

pub fn sequencer_pipeline(
    cfg: &ZkSyncConfig,
    deps: SequencerCollaborators,
) -> Result<Pipeline, PipelineError> {
    Pipeline::new(sequencer_zk_stages(cfg, deps)?, zk_sequencer_unwind_order())
}
