//! Boundary to the L1 event source.

use zk_db::{Hash, L1InfoTreeUpdate, L1InjectedBatch};

use crate::errors::L1Error;

/// A rollup contract event observed on L1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum L1Event {
    Sequence {
        l1_block_no: u64,
        batch_no: u64,
        l1_tx_hash: Hash,
        state_root: Hash,
        l1_info_root: Option<Hash>,
    },
    Verification {
        l1_block_no: u64,
        batch_no: u64,
        l1_tx_hash: Hash,
        state_root: Hash,
    },
    /// Rollup upgraded to `fork_id` starting at `batch_no`.
    ForkId { batch_no: u64, fork_id: u64 },
    InfoTreeUpdate(L1InfoTreeUpdate),
    InjectedBatch(L1InjectedBatch),
}

pub trait L1Client {
    fn latest_block(&mut self) -> Result<u64, L1Error>;

    /// Events emitted in L1 blocks `from..=to`, in log order.
    fn events(&mut self, from: u64, to: u64) -> Result<Vec<L1Event>, L1Error>;
}

/// Walks `[from, latest]` in windows of at most `range` blocks.
pub(crate) fn windows(from: u64, latest: u64, range: u64) -> impl Iterator<Item = (u64, u64)> {
    let range = range.max(1);
    let mut next = Some(from).filter(|f| *f <= latest);
    std::iter::from_fn(move || {
        let start = next?;
        let end = start.saturating_add(range - 1).min(latest);
        next = end.checked_add(1).filter(|n| *n <= latest);
        Some((start, end))
    })
}
