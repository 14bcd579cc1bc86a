//! Value records stored in the correlation tables and their byte layouts.

use crate::errors::{DbError, DbResult};
use crate::keys::{read_hash, read_u64_be};
use crate::tables::Table;

pub type Hash = [u8; 32];
pub type Address = [u8; 20];

pub const ZERO_HASH: Hash = [0u8; 32];

fn read_address(data: &[u8]) -> Address {
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&data[..20]);
    addr
}

/// Decodes a 32-byte hash value.
pub fn decode_hash(table: Table, data: &[u8]) -> DbResult<Hash> {
    if data.len() != 32 {
        return Err(DbError::MalformedValue {
            table: table.name(),
            len: data.len(),
        });
    }
    Ok(read_hash(data))
}

/// Decodes a big-endian u64 value.
pub fn decode_u64(table: Table, data: &[u8]) -> DbResult<u64> {
    if data.len() != 8 {
        return Err(DbError::MalformedValue {
            table: table.name(),
            len: data.len(),
        });
    }
    Ok(read_u64_be(data))
}

// ---------------------------------------------------------------------------
// L1 batch info: tx_hash[32] || state_root[32] || l1_info_root[32]?
// ---------------------------------------------------------------------------

/// One L1 transaction that sequenced or verified an L2 batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct L1BatchInfo {
    pub batch_no: u64,
    pub l1_block_no: u64,
    pub l1_tx_hash: Hash,
    pub state_root: Hash,
    pub l1_info_root: Option<Hash>,
}

impl L1BatchInfo {
    pub fn encode_value(&self) -> Vec<u8> {
        encode_l1_batch_value(&self.l1_tx_hash, &self.state_root, self.l1_info_root.as_ref())
    }
}

pub fn encode_l1_batch_value(
    l1_tx_hash: &Hash,
    state_root: &Hash,
    l1_info_root: Option<&Hash>,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(l1_tx_hash);
    buf.extend_from_slice(state_root);
    if let Some(root) = l1_info_root {
        buf.extend_from_slice(root);
    }
    buf
}

pub fn decode_l1_batch_info(
    table: Table,
    l1_block_no: u64,
    batch_no: u64,
    data: &[u8],
) -> DbResult<L1BatchInfo> {
    let l1_info_root = match data.len() {
        64 => None,
        96 => Some(read_hash(&data[64..96])),
        len => {
            return Err(DbError::MalformedValue {
                table: table.name(),
                len,
            });
        }
    };
    Ok(L1BatchInfo {
        batch_no,
        l1_block_no,
        l1_tx_hash: read_hash(&data[0..32]),
        state_root: read_hash(&data[32..64]),
        l1_info_root,
    })
}

// ---------------------------------------------------------------------------
// GER update: batch_le[8] || timestamp_le[8] || ger[32] || coinbase[20]
//             || fork_id_le[2] || chain_id_le[4] || state_root[32] = 106 bytes
// ---------------------------------------------------------------------------

pub const GER_UPDATE_LEN: usize = 106;

/// Global exit root update attached to a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GerUpdate {
    pub batch_number: u64,
    pub timestamp: u64,
    pub global_exit_root: Hash,
    pub coinbase: Address,
    pub fork_id: u16,
    pub chain_id: u32,
    pub state_root: Hash,
}

impl GerUpdate {
    pub fn encode(&self) -> [u8; GER_UPDATE_LEN] {
        let mut buf = [0u8; GER_UPDATE_LEN];
        buf[0..8].copy_from_slice(&self.batch_number.to_le_bytes());
        buf[8..16].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[16..48].copy_from_slice(&self.global_exit_root);
        buf[48..68].copy_from_slice(&self.coinbase);
        buf[68..70].copy_from_slice(&self.fork_id.to_le_bytes());
        buf[70..74].copy_from_slice(&self.chain_id.to_le_bytes());
        buf[74..106].copy_from_slice(&self.state_root);
        buf
    }

    pub fn decode(data: &[u8]) -> DbResult<Self> {
        if data.len() != GER_UPDATE_LEN {
            return Err(DbError::MalformedValue {
                table: Table::GlobalExitRootsBatches.name(),
                len: data.len(),
            });
        }
        let mut batch = [0u8; 8];
        batch.copy_from_slice(&data[0..8]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&data[8..16]);
        Ok(Self {
            batch_number: u64::from_le_bytes(batch),
            timestamp: u64::from_le_bytes(timestamp),
            global_exit_root: read_hash(&data[16..48]),
            coinbase: read_address(&data[48..68]),
            fork_id: u16::from_le_bytes([data[68], data[69]]),
            chain_id: u32::from_le_bytes([data[70], data[71], data[72], data[73]]),
            state_root: read_hash(&data[74..106]),
        })
    }
}

// ---------------------------------------------------------------------------
// L1 info tree update: index_be[8] || ger[32] || mainnet_exit_root[32]
//   || rollup_exit_root[32] || parent_hash[32] || timestamp_be[8]
//   || block_number_be[8] = 152 bytes
// ---------------------------------------------------------------------------

pub const L1_INFO_TREE_UPDATE_LEN: usize = 152;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct L1InfoTreeUpdate {
    pub index: u64,
    pub ger: Hash,
    pub mainnet_exit_root: Hash,
    pub rollup_exit_root: Hash,
    pub parent_hash: Hash,
    pub timestamp: u64,
    pub block_number: u64,
}

impl L1InfoTreeUpdate {
    pub fn encode(&self) -> [u8; L1_INFO_TREE_UPDATE_LEN] {
        let mut buf = [0u8; L1_INFO_TREE_UPDATE_LEN];
        buf[0..8].copy_from_slice(&self.index.to_be_bytes());
        buf[8..40].copy_from_slice(&self.ger);
        buf[40..72].copy_from_slice(&self.mainnet_exit_root);
        buf[72..104].copy_from_slice(&self.rollup_exit_root);
        buf[104..136].copy_from_slice(&self.parent_hash);
        buf[136..144].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[144..152].copy_from_slice(&self.block_number.to_be_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> DbResult<Self> {
        if data.len() != L1_INFO_TREE_UPDATE_LEN {
            return Err(DbError::MalformedValue {
                table: Table::L1InfoTreeUpdates.name(),
                len: data.len(),
            });
        }
        Ok(Self {
            index: read_u64_be(&data[0..8]),
            ger: read_hash(&data[8..40]),
            mainnet_exit_root: read_hash(&data[40..72]),
            rollup_exit_root: read_hash(&data[72..104]),
            parent_hash: read_hash(&data[104..136]),
            timestamp: read_u64_be(&data[136..144]),
            block_number: read_u64_be(&data[144..152]),
        })
    }
}

// ---------------------------------------------------------------------------
// L1 injected batch: l1_block_be[8] || timestamp_be[8] || l1_block_hash[32]
//   || l1_parent_hash[32] || last_ger[32] || sequencer[20] || transaction[var]
// ---------------------------------------------------------------------------

pub const L1_INJECTED_BATCH_MIN_LEN: usize = 132;

/// A batch injected at genesis before regular sequencing starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct L1InjectedBatch {
    pub l1_block_number: u64,
    pub timestamp: u64,
    pub l1_block_hash: Hash,
    pub l1_parent_hash: Hash,
    pub last_global_exit_root: Hash,
    pub sequencer: Address,
    pub transaction: Vec<u8>,
}

impl L1InjectedBatch {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(L1_INJECTED_BATCH_MIN_LEN + self.transaction.len());
        buf.extend_from_slice(&self.l1_block_number.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.l1_block_hash);
        buf.extend_from_slice(&self.l1_parent_hash);
        buf.extend_from_slice(&self.last_global_exit_root);
        buf.extend_from_slice(&self.sequencer);
        buf.extend_from_slice(&self.transaction);
        buf
    }

    pub fn decode(data: &[u8]) -> DbResult<Self> {
        if data.len() < L1_INJECTED_BATCH_MIN_LEN {
            return Err(DbError::MalformedValue {
                table: Table::L1InjectedBatches.name(),
                len: data.len(),
            });
        }
        Ok(Self {
            l1_block_number: read_u64_be(&data[0..8]),
            timestamp: read_u64_be(&data[8..16]),
            l1_block_hash: read_hash(&data[16..48]),
            l1_parent_hash: read_hash(&data[48..80]),
            last_global_exit_root: read_hash(&data[80..112]),
            sequencer: read_address(&data[112..132]),
            transaction: data[132..].to_vec(),
        })
    }
}
