//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{fs, path::Path};

use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Logger, Root},
    encode::pattern::PatternEncoder,
};

use crate::exit_codes::{ExitCode, ExitError};

const STDERR_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S.%f)} {h({l}):5} [{t}] {m}{n}";

/// Initialises logging. With `config_file` the log4rs configuration is read from it, and a sample is written there
/// first if it does not exist. Otherwise everything goes to stderr, errors only when `quiet`.
pub fn initialize_logging(config_file: Option<&Path>, quiet: bool) -> Result<(), ExitError> {
    match config_file {
        Some(path) => initialize_from_file(path),
        None => initialize_console(quiet),
    }
}

fn initialize_from_file(path: &Path) -> Result<(), ExitError> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, include_str!("../log4rs_sample.yml"))?;
        eprintln!("Installed a sample log configuration at {}", path.display());
    }
    log4rs::init_file(path, Default::default()).map_err(|e| {
        ExitError::new(
            ExitCode::ConfigError,
            format!("Could not load the log configuration {}: {}", path.display(), e),
        )
    })
}

fn initialize_console(quiet: bool) -> Result<(), ExitError> {
    let (root_level, spook_level) = if quiet {
        (LevelFilter::Error, LevelFilter::Error)
    } else {
        (LevelFilter::Warn, LevelFilter::Debug)
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(STDERR_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .logger(Logger::builder().build("spook", spook_level))
        .build(Root::builder().appender("stderr").build(root_level))
        .map_err(|e| ExitError::new(ExitCode::ConfigError, e))?;
    log4rs::init_config(config).map_err(|e| ExitError::new(ExitCode::ConfigError, e))?;
    Ok(())
}
