//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt;

use thiserror::Error;

use crate::{identity::IdentityError, TransportError};

#[derive(Debug, Clone, Error)]
pub struct ExitError {
    pub exit_code: ExitCode,
    pub details: Option<String>,
}

impl ExitError {
    pub fn new(exit_code: ExitCode, details: impl ToString) -> Self {
        let details = Some(details.to_string());
        Self { exit_code, details }
    }
}

impl From<ExitCode> for ExitError {
    fn from(exit_code: ExitCode) -> Self {
        Self {
            exit_code,
            details: None,
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self.details.as_deref().unwrap_or_default();
        write!(f, "{} {}", self.exit_code, details)
    }
}

/// Enum to show failure information
#[repr(i32)]
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ExitCode {
    #[error("There is an error in the configuration.")]
    ConfigError = 101,
    #[error("The node identity could not be loaded or created.")]
    IdentityError = 102,
    #[error("The networking host could not be started.")]
    NetworkError = 103,
    #[error("IO error.")]
    IoError = 104,
}

impl ExitCode {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ExitCode::IdentityError => Some("Check that the --id path is writable, or remove the corrupt identity file."),
            ExitCode::IoError => Some("Check that the output file is writable."),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ExitError {
    fn from(err: config::ConfigError) -> Self {
        Self::new(ExitCode::ConfigError, err)
    }
}

impl From<IdentityError> for ExitError {
    fn from(err: IdentityError) -> Self {
        Self::new(ExitCode::IdentityError, err)
    }
}

impl From<TransportError> for ExitError {
    fn from(err: TransportError) -> Self {
        Self::new(ExitCode::NetworkError, err)
    }
}

impl From<std::io::Error> for ExitError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ExitCode::IoError, err)
    }
}
