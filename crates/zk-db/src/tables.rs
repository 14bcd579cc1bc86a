//! Table identifiers and their redb definitions.
//!
//! Every table maps raw bytes to raw bytes; layouts are documented per
//! variant and encoded by [`crate::keys`] and [`crate::types`].

use redb::TableDefinition;

pub(crate) type BytesTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    /// (l1 block, batch) composite key -> L1 batch info.
    L1Verifications,
    /// (l1 block, batch) composite key -> L1 batch info.
    L1Sequences,
    /// batch -> fork id.
    ForkIds,
    /// fork id -> first L2 block of the fork.
    ForkIdBlock,
    /// L2 block -> batch.
    BlockBatches,
    /// GER -> 0x01, a membership set.
    GlobalExitRoots,
    /// GER key (block, optional L1 block hash) -> GER.
    BlockGlobalExitRoots,
    /// batch -> encoded GER update.
    GlobalExitRootsBatches,
    /// tx hash -> effective gas price percentage.
    TxPricePercentage,
    /// L2 block -> state root.
    StateRoots,
    /// info tree index -> encoded L1 info tree update.
    L1InfoTreeUpdates,
    /// L2 block -> L1 info tree index.
    BlockL1InfoTreeIndex,
    /// injected batch index -> encoded injected batch.
    L1InjectedBatches,
    /// L2 block -> block info root.
    BlockInfoRoots,
    /// chunked batch key -> witness fragment.
    BatchWitness,
    /// stage name -> forward progress.
    SyncStage,
    /// stage name -> prune progress.
    SyncStagePrune,
}

impl Table {
    /// Correlation tables, in the order they are created.
    pub const HERMEZ: [Table; 15] = [
        Table::L1Verifications,
        Table::L1Sequences,
        Table::ForkIds,
        Table::ForkIdBlock,
        Table::BlockBatches,
        Table::GlobalExitRoots,
        Table::BlockGlobalExitRoots,
        Table::GlobalExitRootsBatches,
        Table::TxPricePercentage,
        Table::StateRoots,
        Table::L1InfoTreeUpdates,
        Table::BlockL1InfoTreeIndex,
        Table::L1InjectedBatches,
        Table::BlockInfoRoots,
        Table::BatchWitness,
    ];

    pub const PROGRESS: [Table; 2] = [Table::SyncStage, Table::SyncStagePrune];

    pub const fn name(self) -> &'static str {
        match self {
            Table::L1Verifications => "hermez_l1Verifications",
            Table::L1Sequences => "hermez_l1Sequences",
            Table::ForkIds => "hermez_forkIds",
            Table::ForkIdBlock => "hermez_forkIdBlock",
            Table::BlockBatches => "hermez_blockBatches",
            Table::GlobalExitRoots => "hermez_globalExitRootsSaved",
            Table::BlockGlobalExitRoots => "hermez_globalExitRoots",
            Table::GlobalExitRootsBatches => "hermez_globalExitRoots_batches",
            Table::TxPricePercentage => "hermez_txPricePercentage",
            Table::StateRoots => "hermez_stateRoots",
            Table::L1InfoTreeUpdates => "l1_info_tree_updates",
            Table::BlockL1InfoTreeIndex => "block_l1_info_tree_index",
            Table::L1InjectedBatches => "l1_injected_batches",
            Table::BlockInfoRoots => "block_info_roots",
            Table::BatchWitness => "batch_witness",
            Table::SyncStage => "SyncStage",
            Table::SyncStagePrune => "SyncStagePrune",
        }
    }

    pub(crate) const fn definition(self) -> BytesTable {
        TableDefinition::new(self.name())
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
