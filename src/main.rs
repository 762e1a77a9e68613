use std::process;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use tracing::error;

use rsmachine::cli::{self, Cli, Commands};

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    if let Commands::Completions(opts) = &args.command {
        let mut cmd = Cli::command();
        generate(opts.shell, &mut cmd, env!("CARGO_PKG_NAME"), &mut std::io::stdout());
        return Ok(());
    }

    let log_level = match &args.command {
        Commands::Provision(opts) => opts.log_level,
        Commands::Validate(opts) => opts.log_level,
        Commands::Completions(_) => unreachable!("handled above"),
    };
    rsmachine::init_logging(log_level)?;

    let result = match &args.command {
        Commands::Provision(opts) => rsmachine::run_provision(opts).map(|_| ()),
        Commands::Validate(opts) => rsmachine::run_validate(opts),
        Commands::Completions(_) => unreachable!("handled above"),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
