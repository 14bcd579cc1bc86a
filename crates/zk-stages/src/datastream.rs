//! Boundary to the L2 data-stream client.
//!
//! The client decodes the stream on its own and hands the results over on
//! three channels (blocks, GER updates, batch starts) plus an error channel.
//! Stages drain them without blocking and poll the liveness flags to detect
//! stalls.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use zk_db::types::Address;
use zk_db::{Hash, RwTx};

use crate::errors::DatastreamError;

pub use zk_db::GerUpdate;

// ---------------------------------------------------------------------------
// Stream entries
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct L2Transaction {
    pub hash: Hash,
    pub effective_gas_price_percentage: u8,
    pub is_valid: bool,
    pub intermediate_state_root: Hash,
    pub encoded: Vec<u8>,
}

/// A fully decoded L2 block with its batch context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FullL2Block {
    pub batch_number: u64,
    pub l2_block_number: u64,
    pub timestamp: u64,
    pub delta_timestamp: u32,
    pub l1_info_tree_index: u32,
    pub global_exit_root: Hash,
    pub coinbase: Address,
    pub fork_id: u64,
    pub chain_id: u32,
    pub l1_block_hash: Hash,
    pub l2_blockhash: Hash,
    pub parent_hash: Hash,
    pub state_root: Hash,
    pub block_gas_limit: u64,
    pub block_info_root: Hash,
    pub l2_txs: Vec<L2Transaction>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchType {
    #[default]
    Unspecified,
    Regular,
    Forced,
    Injected,
    Invalid,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchStart {
    pub number: u64,
    pub batch_type: BatchType,
    pub fork_id: u64,
    pub chain_id: u64,
}

/// Position to resume the stream from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bookmark {
    Batch(u64),
    L2Block(u64),
}

// ---------------------------------------------------------------------------
// Client contract
// ---------------------------------------------------------------------------

pub trait DatastreamClient {
    /// Streams every entry from `bookmark` onwards into the channels.
    fn read_all_entries_to_channel(&mut self, bookmark: Bookmark) -> Result<(), DatastreamError>;

    fn l2_block_rx(&mut self) -> &mut UnboundedReceiver<FullL2Block>;

    fn ger_updates_rx(&mut self) -> &mut UnboundedReceiver<GerUpdate>;

    fn batch_start_rx(&mut self) -> &mut UnboundedReceiver<BatchStart>;

    fn err_rx(&mut self) -> &mut UnboundedReceiver<DatastreamError>;

    /// Unix seconds of the last entry written to a channel.
    fn last_written_time(&self) -> &AtomicI64;

    fn streaming(&self) -> &AtomicBool;
}

/// Sink that re-publishes executed blocks to data-stream consumers.
pub trait DataStreamServer {
    /// Highest L2 block already published.
    fn highest_block(&self, tx: &RwTx) -> Result<u64, DatastreamError>;

    /// Publishes blocks `from..=to`.
    fn write_blocks(&mut self, tx: &RwTx, from: u64, to: u64) -> Result<(), DatastreamError>;
}

// ---------------------------------------------------------------------------
// TestDatastreamClient
// ---------------------------------------------------------------------------

/// In-memory client replaying preloaded blocks and GER updates.
pub struct TestDatastreamClient {
    full_l2_blocks: Vec<FullL2Block>,
    ger_updates: Vec<GerUpdate>,
    last_written_time: AtomicI64,
    streaming: AtomicBool,
    l2_block_tx: UnboundedSender<FullL2Block>,
    l2_block_rx: UnboundedReceiver<FullL2Block>,
    ger_updates_tx: UnboundedSender<GerUpdate>,
    ger_updates_rx: UnboundedReceiver<GerUpdate>,
    err_tx: UnboundedSender<DatastreamError>,
    err_rx: UnboundedReceiver<DatastreamError>,
    batch_start_tx: UnboundedSender<BatchStart>,
    batch_start_rx: UnboundedReceiver<BatchStart>,
}

impl TestDatastreamClient {
    pub fn new(full_l2_blocks: Vec<FullL2Block>, ger_updates: Vec<GerUpdate>) -> Self {
        let (l2_block_tx, l2_block_rx) = mpsc::unbounded_channel();
        let (ger_updates_tx, ger_updates_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (batch_start_tx, batch_start_rx) = mpsc::unbounded_channel();
        Self {
            full_l2_blocks,
            ger_updates,
            last_written_time: AtomicI64::new(0),
            streaming: AtomicBool::new(false),
            l2_block_tx,
            l2_block_rx,
            ger_updates_tx,
            ger_updates_rx,
            err_tx,
            err_rx,
            batch_start_tx,
            batch_start_rx,
        }
    }

    /// Queues a batch start marker for the next read.
    pub fn push_batch_start(&self, start: BatchStart) {
        let _ = self.batch_start_tx.send(start);
    }

    /// Queues an error for the next read.
    pub fn push_error(&self, err: DatastreamError) {
        let _ = self.err_tx.send(err);
    }

    fn touch(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        self.last_written_time.store(now, Ordering::SeqCst);
    }
}

impl DatastreamClient for TestDatastreamClient {
    fn read_all_entries_to_channel(&mut self, _bookmark: Bookmark) -> Result<(), DatastreamError> {
        self.streaming.store(true, Ordering::SeqCst);

        for block in &self.full_l2_blocks {
            self.l2_block_tx
                .send(block.clone())
                .map_err(|e| DatastreamError::Connection(e.to_string()))?;
        }
        for update in &self.ger_updates {
            self.ger_updates_tx
                .send(update.clone())
                .map_err(|e| DatastreamError::Connection(e.to_string()))?;
        }
        if !self.full_l2_blocks.is_empty() || !self.ger_updates.is_empty() {
            self.touch();
        }

        Ok(())
    }

    fn l2_block_rx(&mut self) -> &mut UnboundedReceiver<FullL2Block> {
        &mut self.l2_block_rx
    }

    fn ger_updates_rx(&mut self) -> &mut UnboundedReceiver<GerUpdate> {
        &mut self.ger_updates_rx
    }

    fn batch_start_rx(&mut self) -> &mut UnboundedReceiver<BatchStart> {
        &mut self.batch_start_rx
    }

    fn err_rx(&mut self) -> &mut UnboundedReceiver<DatastreamError> {
        &mut self.err_rx
    }

    fn last_written_time(&self) -> &AtomicI64 {
        &self.last_written_time
    }

    fn streaming(&self) -> &AtomicBool {
        &self.streaming
    }
}
