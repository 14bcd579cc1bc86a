use anyhow::anyhow;
use argh::FromArgs;
use serde_json::json;
use tracing::*;
use zk_db::{
    ZkDb, get_stage_progress, get_stage_prune_progress, save_stage_progress,
    save_stage_prune_progress,
};
use zk_stages::SyncStage;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "progress")]
/// Shows forward and prune progress of every stage
pub struct ProgressArgs {
    /// print JSON instead of a table
    #[argh(switch)]
    pub json: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "set-progress")]
/// Overwrites the progress of one stage
pub struct SetProgressArgs {
    /// stage name, e.g. Batches
    #[argh(positional)]
    pub stage: String,

    /// new progress
    #[argh(positional)]
    pub block: u64,

    /// set prune progress instead of forward progress
    #[argh(switch)]
    pub prune: bool,

    /// commit the change; without it the transaction is dropped
    #[argh(switch)]
    pub commit: bool,
}

pub fn progress(db: &ZkDb, args: ProgressArgs) -> anyhow::Result<()> {
    let tx = db.begin_read()?;
    let mut rows = Vec::with_capacity(SyncStage::ALL.len());
    for stage in SyncStage::ALL {
        rows.push((
            stage,
            get_stage_progress(&tx, stage.name())?,
            get_stage_prune_progress(&tx, stage.name())?,
        ));
    }
    drop(tx);

    if args.json {
        let out: Vec<_> = rows
            .iter()
            .map(|(stage, fwd, prune)| {
                json!({ "stage": stage.name(), "progress": fwd, "prune": prune })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{:<24} {:>12} {:>12}", "stage", "progress", "prune");
        for (stage, fwd, prune) in rows {
            println!("{:<24} {fwd:>12} {prune:>12}", stage.name());
        }
    }
    Ok(())
}

pub fn set_progress(db: &ZkDb, args: SetProgressArgs) -> anyhow::Result<()> {
    let stage =
        SyncStage::from_name(&args.stage).ok_or_else(|| anyhow!("unknown stage {}", args.stage))?;

    let tx = db.begin_write()?;
    let old = if args.prune {
        let old = get_stage_prune_progress(&tx, stage.name())?;
        save_stage_prune_progress(&tx, stage.name(), args.block)?;
        old
    } else {
        let old = get_stage_progress(&tx, stage.name())?;
        save_stage_progress(&tx, stage.name(), args.block)?;
        old
    };

    println!("{stage}: {old} -> {}", args.block);
    if args.commit {
        tx.commit()?;
        info!(%stage, old, new = args.block, prune = args.prune, "progress updated");
    } else {
        println!("dry run, pass --commit to apply");
    }
    Ok(())
}
