use std::ops::ControlFlow;

use anyhow::bail;
use argh::FromArgs;
use tracing::*;
use zk_db::chunks::chunk_key;
use zk_db::keys::{U64_LEN, bytes_to_uint64, uint64_to_bytes};
use zk_db::{HermezDb, HermezWrite, KvRead, RwTx, Table, ZkDb};

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "delete-witnesses")]
/// Deletes stored witnesses of a batch range
pub struct DeleteWitnessesArgs {
    /// first batch to delete
    #[argh(option)]
    pub from: u64,

    /// last batch to delete, inclusive
    #[argh(option)]
    pub to: u64,

    /// commit the deletion; without it the transaction is dropped
    #[argh(switch)]
    pub commit: bool,
}

/// Batches in `[from, to]` that have a stored witness.
fn count_witnesses(tx: &RwTx, from: u64, to: u64) -> anyhow::Result<usize> {
    let first_chunk = chunk_key(&[], 0);
    let mut count = 0;
    tx.walk(Table::BatchWitness, &uint64_to_bytes(from), &mut |k, _| {
        if k.len() < U64_LEN || bytes_to_uint64(&k[..U64_LEN])? > to {
            return Ok(ControlFlow::Break(()));
        }
        if k[U64_LEN..] == first_chunk[..] {
            count += 1;
        }
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(count)
}

pub fn delete_witnesses(db: &ZkDb, args: DeleteWitnessesArgs) -> anyhow::Result<()> {
    if args.from > args.to {
        bail!("--from {} is above --to {}", args.from, args.to);
    }

    let tx = db.begin_write()?;
    let present = count_witnesses(&tx, args.from, args.to)?;
    HermezDb::new(&tx).delete_witness_by_batch_range(args.from, args.to)?;
    println!("batches {}..={}: {present} witnesses", args.from, args.to);

    if args.commit {
        tx.commit()?;
        info!(from = args.from, to = args.to, present, "witnesses deleted");
    } else {
        println!("dry run, pass --commit to apply");
    }
    Ok(())
}
