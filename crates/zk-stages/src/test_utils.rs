//! In-memory collaborators for driving pipelines without L1, a data stream
//! or an executor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use zk_db::RwTx;

use crate::datastream::DataStreamServer;
use crate::errors::{DatastreamError, L1Error, WitnessError};
use crate::l1::{L1Client, L1Event};
use crate::stages::WitnessGenerator;

/// Serves a fixed list of events, each tagged with its L1 block.
pub struct StaticL1Client {
    latest: u64,
    events: Vec<(u64, L1Event)>,
}

impl StaticL1Client {
    pub fn new(latest: u64, events: Vec<(u64, L1Event)>) -> Self {
        Self { latest, events }
    }
}

impl L1Client for StaticL1Client {
    fn latest_block(&mut self) -> Result<u64, L1Error> {
        Ok(self.latest)
    }

    fn events(&mut self, from: u64, to: u64) -> Result<Vec<L1Event>, L1Error> {
        if from > self.latest {
            return Err(L1Error::RangeUnavailable { from, to });
        }
        Ok(self
            .events
            .iter()
            .filter(|(block, _)| (from..=to).contains(block))
            .map(|(_, event)| event.clone())
            .collect())
    }
}

/// Witness of every batch is `witness-<batch>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedWitnessGenerator;

impl FixedWitnessGenerator {
    pub fn witness_for(batch_no: u64) -> Vec<u8> {
        format!("witness-{batch_no}").into_bytes()
    }
}

impl WitnessGenerator for FixedWitnessGenerator {
    fn generate_witness(&mut self, _tx: &RwTx, batch_no: u64) -> Result<Vec<u8>, WitnessError> {
        Ok(Self::witness_for(batch_no))
    }
}

/// Remembers the highest published block. Clones share the counter.
#[derive(Clone, Debug, Default)]
pub struct MemoryDataStreamServer {
    published: Arc<AtomicU64>,
}

impl MemoryDataStreamServer {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }
}

impl DataStreamServer for MemoryDataStreamServer {
    fn highest_block(&self, _tx: &RwTx) -> Result<u64, DatastreamError> {
        Ok(self.published())
    }

    fn write_blocks(&mut self, _tx: &RwTx, from: u64, to: u64) -> Result<(), DatastreamError> {
        let current = self.published();
        if from != current + 1 {
            return Err(DatastreamError::Server(format!(
                "expected block {} got {from}",
                current + 1
            )));
        }
        self.published.store(to, Ordering::SeqCst);
        Ok(())
    }
}
