//! Byte-level access to tables through an open redb transaction.
//!
//! The correlation store and the progress tracker are written against these
//! traits, so every read works over both read-only and read-write
//! transactions. A table may be open at most once at a time inside a write
//! transaction: `walk` callbacks must not touch the table being walked.

use std::ops::ControlFlow;

use redb::{ReadTransaction, ReadableTable, ReadableTableMetadata, WriteTransaction};

use crate::errors::DbResult;
use crate::tables::Table;

pub type RwTx = WriteTransaction;
pub type RoTx = ReadTransaction;

/// An owned key/value pair.
pub type Entry = (Vec<u8>, Vec<u8>);

pub trait KvRead {
    fn get_one(&self, table: Table, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// First entry whose key is >= `key`.
    fn seek(&self, table: Table, key: &[u8]) -> DbResult<Option<Entry>>;

    fn last(&self, table: Table) -> DbResult<Option<Entry>>;

    /// Visits entries in ascending key order starting at `from` until the
    /// callback breaks or the table ends.
    fn walk(
        &self,
        table: Table,
        from: &[u8],
        f: &mut dyn FnMut(&[u8], &[u8]) -> DbResult<ControlFlow<()>>,
    ) -> DbResult<()>;

    fn count(&self, table: Table) -> DbResult<u64>;
}

pub trait KvWrite: KvRead {
    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> DbResult<()>;

    fn delete(&self, table: Table, key: &[u8]) -> DbResult<()>;
}

macro_rules! impl_kv_read {
    ($tx:ty) => {
        impl KvRead for $tx {
            fn get_one(&self, table: Table, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
                let t = self.open_table(table.definition())?;
                Ok(t.get(key)?.map(|guard| guard.value().to_vec()))
            }

            fn seek(&self, table: Table, key: &[u8]) -> DbResult<Option<Entry>> {
                let t = self.open_table(table.definition())?;
                let mut range = t.range::<&[u8]>(key..)?;
                match range.next() {
                    Some(entry) => {
                        let (k, v) = entry?;
                        Ok(Some((k.value().to_vec(), v.value().to_vec())))
                    }
                    None => Ok(None),
                }
            }

            fn last(&self, table: Table) -> DbResult<Option<Entry>> {
                let t = self.open_table(table.definition())?;
                Ok(t.last()?
                    .map(|(k, v)| (k.value().to_vec(), v.value().to_vec())))
            }

            fn walk(
                &self,
                table: Table,
                from: &[u8],
                f: &mut dyn FnMut(&[u8], &[u8]) -> DbResult<ControlFlow<()>>,
            ) -> DbResult<()> {
                let t = self.open_table(table.definition())?;
                for entry in t.range::<&[u8]>(from..)? {
                    let (k, v) = entry?;
                    if f(k.value(), v.value())?.is_break() {
                        break;
                    }
                }
                Ok(())
            }

            fn count(&self, table: Table) -> DbResult<u64> {
                let t = self.open_table(table.definition())?;
                Ok(t.len()?)
            }
        }
    };
}

impl_kv_read!(ReadTransaction);
impl_kv_read!(WriteTransaction);

impl KvWrite for WriteTransaction {
    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> DbResult<()> {
        let mut t = self.open_table(table.definition())?;
        t.insert(key, value)?;
        Ok(())
    }

    fn delete(&self, table: Table, key: &[u8]) -> DbResult<()> {
        let mut t = self.open_table(table.definition())?;
        t.remove(key)?;
        Ok(())
    }
}

/// Collects the keys visited by `walk` from `from` while `keep` holds.
pub(crate) fn collect_keys<K: KvRead + ?Sized>(
    kv: &K,
    table: Table,
    from: &[u8],
    mut keep: impl FnMut(&[u8]) -> DbResult<bool>,
) -> DbResult<Vec<Vec<u8>>> {
    let mut keys = Vec::new();
    kv.walk(table, from, &mut |k, _| {
        if !keep(k)? {
            return Ok(ControlFlow::Break(()));
        }
        keys.push(k.to_vec());
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(keys)
}
