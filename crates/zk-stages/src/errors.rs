use thiserror::Error;
use zk_db::DbError;

use crate::stage::SyncStage;

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    L1(#[from] L1Error),

    #[error(transparent)]
    Datastream(#[from] DatastreamError),

    #[error(transparent)]
    Witness(#[from] WitnessError),

    #[error("block gap: expected block {expected}, got {got}")]
    BlockGap { expected: u64, got: u64 },

    #[error("l1 info tree gap: expected index {expected}, got {got}")]
    L1InfoTreeGap { expected: u64, got: u64 },

    #[error("worker: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: SyncStage,
        #[source]
        source: StageError,
    },

    #[error("duplicate stage {0}")]
    DuplicateStage(SyncStage),

    #[error("duplicate unwind order entry {0}")]
    DuplicateUnwindEntry(SyncStage),

    #[error("no worker supplied for stage {0}")]
    MissingWorker(SyncStage),

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl PipelineError {
    pub(crate) fn from_stage(stage: SyncStage, source: StageError) -> Self {
        match source {
            StageError::Interrupted => Self::Interrupted,
            source => Self::Stage { stage, source },
        }
    }
}

#[derive(Debug, Error)]
pub enum L1Error {
    #[error("l1 rpc: {0}")]
    Rpc(String),

    #[error("l1 range {from}..={to} unavailable")]
    RangeUnavailable { from: u64, to: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DatastreamError {
    #[error("datastream connection: {0}")]
    Connection(String),

    #[error("datastream decode: {0}")]
    Decode(String),

    #[error("datastream server: {0}")]
    Server(String),
}

#[derive(Debug, Error)]
#[error("witness generation failed for batch {batch}: {reason}")]
pub struct WitnessError {
    pub batch: u64,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
