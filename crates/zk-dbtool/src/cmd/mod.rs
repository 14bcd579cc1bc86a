use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use argh::FromArgs;
use zk_db::ZkDb;

use batch::InspectBatchArgs;
use check_config::CheckConfigArgs;
use progress::{ProgressArgs, SetProgressArgs};
use witness::DeleteWitnessesArgs;

pub mod batch;
pub mod check_config;
pub mod progress;
pub mod witness;

/// Database file inside the data directory.
pub const DB_FILE: &str = "zk.redb";

/// Inspect and repair the zk sync database
#[derive(FromArgs, PartialEq, Debug)]
pub struct TopLevel {
    /// data directory holding the database
    #[argh(option, short = 'd', default = "PathBuf::from(\"data\")")]
    pub datadir: PathBuf,

    #[argh(subcommand)]
    pub cmd: Commands,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub enum Commands {
    Progress(ProgressArgs),
    SetProgress(SetProgressArgs),
    InspectBatch(InspectBatchArgs),
    DeleteWitnesses(DeleteWitnessesArgs),
    CheckConfig(CheckConfigArgs),
}

/// Opens an existing database. Refuses to create a fresh one.
pub fn open_db(datadir: &Path) -> anyhow::Result<ZkDb> {
    let path = datadir.join(DB_FILE);
    if !path.exists() {
        bail!("no database at {}", path.display());
    }
    ZkDb::open(&path).with_context(|| format!("opening {}", path.display()))
}
