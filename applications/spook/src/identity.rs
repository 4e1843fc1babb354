//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fs,
    fs::OpenOptions,
    io,
    io::Write,
    path::{Path, PathBuf},
};

use log::*;
use spook_network::identity::Keypair;

const LOG_TARGET: &str = "spook::identity";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity file {path} could not be read: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Identity file {path} could not be written: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Identity file {path} has an error: {details}")]
    Decode { path: PathBuf, details: String },
    #[error("Unable to encode the identity: {0}")]
    Encode(String),
}

/// The identity file of the `index`th identity: `<base>.<index>`
pub fn identity_path(base: &Path, index: usize) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(format!(".{}", index));
    PathBuf::from(path)
}

/// Loads the keypair stored at `path`, or creates and stores a new ed25519 keypair if the file does not exist.
pub fn load_or_create_identity<P: AsRef<Path>>(path: P) -> Result<Keypair, IdentityError> {
    let path = path.as_ref();
    if path.exists() {
        return load_identity(path);
    }

    debug!(target: LOG_TARGET, "Identity file {} not found. Creating new identity", path.display());
    let keypair = Keypair::generate_ed25519();
    save_identity(path, &keypair)?;
    info!(
        target: LOG_TARGET,
        "New identity {} has been created at {}",
        keypair.public().to_peer_id(),
        path.display()
    );
    Ok(keypair)
}

pub fn load_identity<P: AsRef<Path>>(path: P) -> Result<Keypair, IdentityError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| IdentityError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let keypair = Keypair::from_protobuf_encoding(&bytes).map_err(|e| IdentityError::Decode {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    info!(
        target: LOG_TARGET,
        "Identity {} loaded from {}",
        keypair.public().to_peer_id(),
        path.display()
    );
    Ok(keypair)
}

fn save_identity(path: &Path, keypair: &Keypair) -> Result<(), IdentityError> {
    let bytes = keypair
        .to_protobuf_encoding()
        .map_err(|e| IdentityError::Encode(e.to_string()))?;
    let to_write_error = |source| IdentityError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_write_error)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(to_write_error)?;
    file.write_all(&bytes).map_err(to_write_error)?;
    file.sync_all().map_err(to_write_error)
}
