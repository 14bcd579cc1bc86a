//! Storage of values larger than a single entry as numbered fragments.
//!
//! A value stored under `key` is split into [`CHUNK_SIZE`] pieces written at
//! `key ++ "_chunk_" ++ index` for index 0, 1, 2, ... No count is stored: the
//! first missing index ends the value.
//!
//! A zero-length fragment reads the same as a missing one. Writes never
//! produce one, so this only matters for foreign data. The on-disk layout is
//! shared with existing databases and carries no length header.

use tracing::*;

use crate::errors::DbResult;
use crate::kv::{KvRead, KvWrite};
use crate::tables::Table;

pub const CHUNK_SIZE: usize = 100_000;

const CHUNK_SEPARATOR: &[u8] = b"_chunk_";

pub fn chunk_key(key: &[u8], index: usize) -> Vec<u8> {
    let index = index.to_string();
    let mut buf = Vec::with_capacity(key.len() + CHUNK_SEPARATOR.len() + index.len());
    buf.extend_from_slice(key);
    buf.extend_from_slice(CHUNK_SEPARATOR);
    buf.extend_from_slice(index.as_bytes());
    buf
}

/// Writes `value` as fragments under `key`.
///
/// Fragments left over from a longer value previously stored under the same
/// key are removed so that a read returns exactly `value`.
pub fn write_chunks(kv: &dyn KvWrite, table: Table, key: &[u8], value: &[u8]) -> DbResult<()> {
    let mut written = 0;
    for (index, chunk) in value.chunks(CHUNK_SIZE).enumerate() {
        kv.put(table, &chunk_key(key, index), chunk)?;
        written = index + 1;
    }
    let stale = delete_chunks_from(kv, table, key, written)?;
    if stale > 0 {
        debug!(%table, stale, "removed stale chunks");
    }
    Ok(())
}

/// Concatenates the fragments stored under `key`; empty when there are none.
pub fn read_chunks(kv: &dyn KvRead, table: Table, key: &[u8]) -> DbResult<Vec<u8>> {
    let mut value = Vec::new();
    for index in 0.. {
        match kv.get_one(table, &chunk_key(key, index))? {
            Some(chunk) if !chunk.is_empty() => value.extend_from_slice(&chunk),
            _ => break,
        }
    }
    Ok(value)
}

/// Deletes the fragments stored under `key`, returning how many were removed.
pub fn delete_chunks(kv: &dyn KvWrite, table: Table, key: &[u8]) -> DbResult<usize> {
    delete_chunks_from(kv, table, key, 0)
}

fn delete_chunks_from(
    kv: &dyn KvWrite,
    table: Table,
    key: &[u8],
    start: usize,
) -> DbResult<usize> {
    let mut index = start;
    loop {
        let k = chunk_key(key, index);
        match kv.get_one(table, &k)? {
            Some(chunk) if !chunk.is_empty() => kv.delete(table, &k)?,
            _ => break,
        }
        index += 1;
    }
    Ok(index - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ZkDb;
    use proptest::prelude::*;

    fn temp_db() -> (tempfile::TempDir, ZkDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = ZkDb::open(&dir.path().join("chunks.redb")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_chunk_key_format() {
        assert_eq!(chunk_key(b"abc", 0), b"abc_chunk_0".to_vec());
        assert_eq!(chunk_key(b"abc", 12), b"abc_chunk_12".to_vec());
    }

    #[test]
    fn test_roundtrip_boundary_sizes() {
        let (_dir, db) = temp_db();
        let tx = db.begin_write().unwrap();
        for (i, len) in [0usize, 1, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 3 * CHUNK_SIZE]
            .into_iter()
            .enumerate()
        {
            let key = (i as u64).to_be_bytes();
            let value: Vec<u8> = (0..len).map(|b| (b % 251) as u8).collect();
            write_chunks(&tx, Table::BatchWitness, &key, &value).unwrap();
            assert_eq!(read_chunks(&tx, Table::BatchWitness, &key).unwrap(), value);
        }
    }

    #[test]
    fn test_exact_multiple_writes_no_trailing_chunk() {
        let (_dir, db) = temp_db();
        let tx = db.begin_write().unwrap();
        write_chunks(&tx, Table::BatchWitness, b"k", &vec![1u8; 2 * CHUNK_SIZE]).unwrap();
        assert!(tx.get_one(Table::BatchWitness, &chunk_key(b"k", 1)).unwrap().is_some());
        assert!(tx.get_one(Table::BatchWitness, &chunk_key(b"k", 2)).unwrap().is_none());
        assert_eq!(tx.count(Table::BatchWitness).unwrap(), 2);
    }

    #[test]
    fn test_overwrite_with_shorter_value_drops_stale_chunks() {
        let (_dir, db) = temp_db();
        let tx = db.begin_write().unwrap();
        write_chunks(&tx, Table::BatchWitness, b"k", &vec![1u8; 2 * CHUNK_SIZE + 5]).unwrap();
        write_chunks(&tx, Table::BatchWitness, b"k", &[9u8; 10]).unwrap();
        assert_eq!(read_chunks(&tx, Table::BatchWitness, b"k").unwrap(), vec![9u8; 10]);
        assert_eq!(tx.count(Table::BatchWitness).unwrap(), 1);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let (_dir, db) = temp_db();
        let tx = db.begin_write().unwrap();
        assert_eq!(delete_chunks(&tx, Table::BatchWitness, b"none").unwrap(), 0);
        assert!(read_chunks(&tx, Table::BatchWitness, b"none").unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_every_chunk() {
        let (_dir, db) = temp_db();
        let tx = db.begin_write().unwrap();
        write_chunks(&tx, Table::BatchWitness, b"a", &vec![3u8; CHUNK_SIZE + 1]).unwrap();
        write_chunks(&tx, Table::BatchWitness, b"b", &[4u8; 8]).unwrap();
        assert_eq!(delete_chunks(&tx, Table::BatchWitness, b"a").unwrap(), 2);
        assert!(read_chunks(&tx, Table::BatchWitness, b"a").unwrap().is_empty());
        assert_eq!(read_chunks(&tx, Table::BatchWitness, b"b").unwrap(), vec![4u8; 8]);
    }

    #[test]
    fn test_empty_intermediate_chunk_ends_value() {
        let (_dir, db) = temp_db();
        let tx = db.begin_write().unwrap();
        tx.put(Table::BatchWitness, &chunk_key(b"k", 0), b"head").unwrap();
        tx.put(Table::BatchWitness, &chunk_key(b"k", 1), b"").unwrap();
        tx.put(Table::BatchWitness, &chunk_key(b"k", 2), b"tail").unwrap();
        assert_eq!(read_chunks(&tx, Table::BatchWitness, b"k").unwrap(), b"head".to_vec());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn chunk_read_inverts_write(
            value in proptest::collection::vec(any::<u8>(), 0..(2 * CHUNK_SIZE + 17))
        ) {
            let (_dir, db) = temp_db();
            let tx = db.begin_write().unwrap();
            write_chunks(&tx, Table::BatchWitness, b"w", &value).unwrap();
            prop_assert_eq!(read_chunks(&tx, Table::BatchWitness, b"w").unwrap(), value);
        }
    }
}
