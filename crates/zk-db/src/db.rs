//! redb-backed database handle for the sync core.
//!
//! Holds the fifteen correlation tables plus the two stage progress tables.
//! Callers open one transaction per pipeline pass and pass it down to every
//! stage; the handle itself performs no locking.

use std::path::Path;

use redb::Database;
use tracing::*;

use crate::errors::DbResult;
use crate::kv::{RoTx, RwTx};
use crate::tables::Table;

pub struct ZkDb {
    db: Database,
}

impl ZkDb {
    /// Open (or create) a redb database at `path` and make sure every table
    /// exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let db = Database::create(path)?;
        let tx = db.begin_write()?;
        create_hermez_buckets(&tx)?;
        create_progress_buckets(&tx)?;
        tx.commit()?;
        debug!(path = %path.display(), "opened zk database");
        Ok(Self { db })
    }

    pub fn begin_write(&self) -> DbResult<RwTx> {
        Ok(self.db.begin_write()?)
    }

    pub fn begin_read(&self) -> DbResult<RoTx> {
        Ok(self.db.begin_read()?)
    }
}

/// Creates the correlation tables. Safe to call on a populated database.
pub fn create_hermez_buckets(tx: &RwTx) -> DbResult<()> {
    for table in Table::HERMEZ {
        tx.open_table(table.definition())?;
    }
    Ok(())
}

pub fn create_progress_buckets(tx: &RwTx) -> DbResult<()> {
    for table in Table::PROGRESS {
        tx.open_table(table.definition())?;
    }
    Ok(())
}
