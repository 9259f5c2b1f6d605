// ABOUTME: Private key discovery for SSH public-key authentication.
// ABOUTME: Scans a key directory for id_* files and keeps every key that parses.

use super::error::{Error, Result};
use russh::keys::{decode_secret_key, ssh_key};
use std::path::PathBuf;
use std::sync::Arc;

/// Files in an SSH directory that are never private keys.
const NON_KEY_FILES: [&str; 3] = ["config", "known_hosts", "authorized_keys"];

/// Private keys follow the `id_<algorithm>` naming convention.
const KEY_PREFIX: &str = "id_";

/// A parsed private key and the file it came from.
#[derive(Debug, Clone)]
pub struct Signer {
    pub path: PathBuf,
    pub key: Arc<ssh_key::PrivateKey>,
}

/// Signers discovered in a key directory, in file-name order.
#[derive(Debug, Clone, Default)]
pub struct KeyMaterial {
    signers: Arc<[Signer]>,
}

impl KeyMaterial {
    pub fn new(signers: Vec<Signer>) -> Self {
        Self {
            signers: signers.into(),
        }
    }

    pub fn signers(&self) -> &[Signer] {
        &self.signers
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

/// Discovers private keys in a directory such as `~/.ssh`.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Parse every candidate key file in the directory.
    ///
    /// Unreadable or unparsable files are logged and skipped. Only a failure
    /// to list the directory itself is an error. An empty result is valid.
    pub fn discover(&self) -> Result<KeyMaterial> {
        let dir_error = |source| Error::KeyDirectory {
            path: self.dir.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(dir_error)? {
            let entry = entry.map_err(dir_error)?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        let mut signers = Vec::new();
        for name in names.iter().filter(|name| is_candidate(name)) {
            let path = self.dir.join(name);

            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("Skipping unreadable key file {}: {}", path.display(), e);
                    continue;
                }
            };

            match decode_secret_key(&contents, None) {
                Ok(key) => {
                    tracing::debug!("Loaded private key {}", path.display());
                    signers.push(Signer {
                        path,
                        key: Arc::new(key),
                    });
                }
                Err(e) => {
                    tracing::warn!("Skipping unparsable key file {}: {}", path.display(), e);
                }
            }
        }

        tracing::debug!(
            "Discovered {} private key(s) in {}",
            signers.len(),
            self.dir.display()
        );
        Ok(KeyMaterial::new(signers))
    }
}

fn is_candidate(name: &str) -> bool {
    !NON_KEY_FILES.contains(&name) && name.starts_with(KEY_PREFIX) && !name.ends_with(".pub")
}
