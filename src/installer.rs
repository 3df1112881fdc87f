use std::path::Path;

use der::oid::ObjectIdentifier;
use tracing::{info, warn};

use crate::{
    Result,
    container::ContainerName,
    error::{CryptoError, Error},
    pfx::{Pkcs12Reader, PfxReader},
    store::{ContainerFlags, KeyContainerStore},
};

/// Result of a successful installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledKey {
    pub container: ContainerName,
    pub key_algorithm: ObjectIdentifier,
    pub certificate_subject: Option<String>,
}

/// Installs PFX key pairs into strong name key containers.
///
/// A container is checked before the PFX file is opened, and an existing container is never
/// replaced: both the early check and the store itself report [Error::AlreadyInstalled].
#[derive(Debug, Clone)]
pub struct KeyInstaller<S, R = Pkcs12Reader> {
    store: S,
    reader: R,
}

impl<S: KeyContainerStore> KeyInstaller<S> {
    pub fn new(store: S) -> Self {
        Self::with_reader(store, Pkcs12Reader)
    }
}

impl<S: KeyContainerStore, R: PfxReader> KeyInstaller<S, R> {
    pub fn with_reader(store: S, reader: R) -> Self {
        Self { store, reader }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_installed(&self, name: &ContainerName) -> Result<bool> {
        self.store.exists(name)
    }

    /// Extracts the private key from `pfx_path` and installs it under `name` as a machine-wide,
    /// non-exportable container.
    pub fn install(&self, pfx_path: &Path, password: &str, name: &ContainerName) -> Result<InstalledKey> {
        if self.store.exists(name)? {
            warn!(container = %name, "key container already exists");
            return Err(Error::AlreadyInstalled(name.clone()));
        }

        let pair = self.reader.open_pfx(pfx_path, password)?;
        let key = pair.key();
        if !key.is_rsa() {
            return Err(CryptoError::UnsupportedKeyAlgorithm(key.oid()).into());
        }

        self.store.install(name, key, ContainerFlags::STRONG_NAME)?;

        let certificate_subject = pair.certificate().map(|c| c.subject().to_owned());
        info!(
            container = %name,
            subject = certificate_subject.as_deref().unwrap_or("<none>"),
            "key pair installed"
        );

        Ok(InstalledKey {
            container: name.clone(),
            key_algorithm: key.oid(),
            certificate_subject,
        })
    }
}
