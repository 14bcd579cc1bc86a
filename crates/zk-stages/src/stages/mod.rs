//! Stages implemented inside the sync core, plus the adapter for stages
//! whose work is supplied from outside.

mod batches;
mod datastream_catchup;
mod external;
mod finish;
mod l1_sequencer_sync;
mod l1_syncer;
mod witness;

pub use batches::BatchesStage;
pub use datastream_catchup::DataStreamCatchupStage;
pub use external::{ExternalStage, StageWorker, TrackUpstream};
pub use finish::FinishStage;
pub use l1_sequencer_sync::L1SequencerSyncStage;
pub use l1_syncer::L1SyncerStage;
pub use witness::{WitnessGenerator, WitnessStage};
