use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use zk_stages::ZkSyncConfig;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "check-config")]
/// Validates a sync config file and prints it with defaults filled in
pub struct CheckConfigArgs {
    /// path to the TOML config
    #[argh(positional)]
    pub path: PathBuf,
}

pub fn check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let cfg = ZkSyncConfig::load(&args.path)
        .with_context(|| format!("loading {}", args.path.display()))?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}
