//! Operator tool for inspecting and repairing a zk sync database.

mod cmd;
mod logging;

use std::process::ExitCode;

use cmd::{Commands, TopLevel, batch, check_config, open_db, progress, witness};

fn main() -> ExitCode {
    let TopLevel { datadir, cmd } = argh::from_env();
    logging::init();

    let res = match cmd {
        Commands::CheckConfig(args) => check_config::check_config(args),
        Commands::Progress(args) => open_db(&datadir).and_then(|db| progress::progress(&db, args)),
        Commands::SetProgress(args) => {
            open_db(&datadir).and_then(|db| progress::set_progress(&db, args))
        }
        Commands::InspectBatch(args) => {
            open_db(&datadir).and_then(|db| batch::inspect_batch(&db, args))
        }
        Commands::DeleteWitnesses(args) => {
            open_db(&datadir).and_then(|db| witness::delete_witnesses(&db, args))
        }
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
