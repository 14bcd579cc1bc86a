use argh::FromArgs;
use serde_json::{Value, json};
use zk_db::{HermezDbReader, HermezRead, L1BatchInfo, ZkDb};

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "inspect-batch")]
/// Shows everything the store correlates with one batch
pub struct InspectBatchArgs {
    /// batch number
    #[argh(positional)]
    pub batch: u64,
}

fn l1_info(info: Option<L1BatchInfo>) -> Value {
    match info {
        Some(info) => json!({
            "l1_block": info.l1_block_no,
            "l1_tx_hash": hex::encode(info.l1_tx_hash),
            "state_root": hex::encode(info.state_root),
            "l1_info_root": info.l1_info_root.map(hex::encode),
        }),
        None => Value::Null,
    }
}

pub fn inspect_batch(db: &ZkDb, args: InspectBatchArgs) -> anyhow::Result<()> {
    let tx = db.begin_read()?;
    let reader = HermezDbReader::new(&tx);
    let batch = args.batch;

    let blocks = reader.get_l2_block_nos_by_batch(batch)?;
    let highest = blocks.last().copied().unwrap_or(0);
    let state_root = match highest {
        0 => Value::Null,
        b => json!(hex::encode(reader.get_state_root(b)?)),
    };
    let ger_update = reader.get_batch_global_exit_root(batch)?.map(|u| {
        json!({
            "global_exit_root": hex::encode(u.global_exit_root),
            "timestamp": u.timestamp,
            "fork_id": u.fork_id,
        })
    });

    let out = json!({
        "batch": batch,
        "blocks": blocks,
        "highest_block": highest,
        "state_root": state_root,
        "fork_id": reader.get_fork_id(batch)?,
        "sequence": l1_info(reader.get_sequence_by_batch_no(batch)?),
        "verification": l1_info(reader.get_verification_by_batch_no(batch)?),
        "ger_update": ger_update,
        "witness_bytes": reader.get_witness_by_batch_no(batch)?.len(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
