//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::process;

use clap::Parser;
use log::*;
use spook::{
    cli::Cli,
    exit_codes::ExitError,
    load_configuration,
    logging::initialize_logging,
    run_crawler,
    ApplicationConfig,
};
use spook_shutdown::Shutdown;

const LOG_TARGET: &str = "spook::app";

fn main() {
    if let Err(err) = main_inner() {
        eprintln!("{:?}", err);
        let exit_code = err.exit_code;
        if let Some(hint) = exit_code.hint() {
            eprintln!();
            eprintln!("{}", hint);
            eprintln!();
        }
        error!(
            target: LOG_TARGET,
            "Exiting with code ({}): {:?}", exit_code as i32, err
        );
        process::exit(exit_code as i32);
    }
}

fn main_inner() -> Result<(), ExitError> {
    let cli = Cli::parse();
    initialize_logging(cli.log_config.as_deref(), cli.quiet)?;

    info!(
        target: LOG_TARGET,
        "Starting spook version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let cfg = load_configuration(cli.config.as_deref())?;
    let config = ApplicationConfig::load_from(&cfg)?;
    debug!(target: LOG_TARGET, "Using crawler configuration: {:?}", config);

    // The shutdown trigger for the system
    let shutdown = Shutdown::new();

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run_crawler(cli, config, shutdown))
}
