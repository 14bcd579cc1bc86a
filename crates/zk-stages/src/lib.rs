//! `zk-stages`: the staged sync pipeline of a zk rollup node.
//!
//! Stages run forward in a fixed order, unwind in a separately declared
//! order and prune history below a boundary. Each stage persists its own
//! progress in the `SyncStage` table of the correlation store; every pass
//! runs inside one write transaction owned by the caller.
//!
//! Two pipeline variants are defined in [`definitions`]: the follower, which
//! downloads batches from the data stream and checks them against L1
//! verifications, and the sequencer, which produces batches itself.

pub mod config;
pub mod datastream;
pub mod definitions;
pub mod errors;
pub mod interrupt;
pub mod l1;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod test_utils;

pub use config::ZkSyncConfig;
pub use definitions::{
    ExternalWorkers, FollowerCollaborators, SequencerCollaborators, all_stages_zk,
    default_pipeline, default_zk_stages, sequencer_pipeline, sequencer_zk_stages,
    zk_sequencer_unwind_order, zk_unwind_order,
};
pub use errors::{ConfigError, DatastreamError, L1Error, PipelineError, StageError, WitnessError};
pub use interrupt::Interrupt;
pub use pipeline::{CycleOutcome, ForwardResult, Pipeline};
pub use stage::{
    ForwardOutcome, PruneState, Stage, StageCtx, StageState, SyncStage, UnwindReason, UnwindState,
};
