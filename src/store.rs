//!
//! Machine-wide key container store.
//!
//! A store maps [ContainerName]s to private keys. Installing into a name that is already taken
//! is a conflict ([Error::AlreadyInstalled]), never an update.
//!
use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use der::{Decode, Encode, Sequence, asn1::OctetString, oid::ObjectIdentifier};
use tracing::{debug, info, warn};

use crate::{
    Result,
    container::ContainerName,
    error::{CryptoError, Error},
    key::PrivateKey,
};

const CONTAINER_FILE_EXTENSION: &str = "key";
const RECORD_VERSION: u8 = 1;

/// Storage options of a key container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerFlags {
    /// The container lives in the machine store rather than in the user profile.
    pub machine_scoped: bool,
    /// The private key may be exported back out of the container.
    pub exportable: bool,
}

impl ContainerFlags {
    /// Flags used for strong name signing containers.
    pub const STRONG_NAME: ContainerFlags = ContainerFlags {
        machine_scoped: true,
        exportable: false,
    };
}

/// Key store keyed by container name.
pub trait KeyContainerStore {
    /// Whether a container with this name already exists.
    fn exists(&self, name: &ContainerName) -> Result<bool>;

    /// Persists `key` under `name`. Fails with [Error::AlreadyInstalled] if the name is taken.
    fn install(&self, name: &ContainerName, key: &PrivateKey, flags: ContainerFlags) -> Result<()>;
}

impl<S: KeyContainerStore + ?Sized> KeyContainerStore for &S {
    fn exists(&self, name: &ContainerName) -> Result<bool> {
        (**self).exists(name)
    }

    fn install(&self, name: &ContainerName, key: &PrivateKey, flags: ContainerFlags) -> Result<()> {
        (**self).install(name, key, flags)
    }
}

/// On-disk form of a container
#[derive(Clone, PartialEq, Eq, Sequence)]
struct ContainerRecord {
    version: u8,
    machine_scoped: bool,
    exportable: bool,
    private_key: OctetString,
}

/// A container read back from a [FileKeyStore].
///
/// The key material itself is not handed out for non-exportable containers.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredContainer {
    flags: ContainerFlags,
    key: PrivateKey,
}

impl StoredContainer {
    pub fn flags(&self) -> ContainerFlags {
        self.flags
    }

    /// Algorithm of the stored private key.
    pub fn key_algorithm(&self) -> ObjectIdentifier {
        self.key.oid()
    }

    /// Whether the container holds exactly this private key.
    pub fn matches(&self, key: &PrivateKey) -> bool {
        self.key == *key
    }

    /// The private key, for exportable containers only.
    pub fn export_key(&self) -> Option<&PrivateKey> {
        self.flags.exportable.then_some(&self.key)
    }
}

impl fmt::Debug for StoredContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredContainer")
            .field("flags", &self.flags)
            .field("key", &self.key)
            .finish()
    }
}

/// Machine-wide key store keeping one file per container under a root directory.
///
/// Entries are created with `create_new`, so two processes installing the same name cannot
/// both succeed.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `name`.
    pub fn container_path(&self, name: &ContainerName) -> PathBuf {
        self.root
            .join(format!("{}.{CONTAINER_FILE_EXTENSION}", name.as_str()))
    }

    /// Reads a container back, `None` if it does not exist.
    pub fn load(&self, name: &ContainerName) -> Result<Option<StoredContainer>> {
        let path = self.container_path(name);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };

        let record = ContainerRecord::from_der(&data).map_err(CryptoError::from)?;
        if record.version != RECORD_VERSION {
            return Err(CryptoError::InvalidVersion.into());
        }

        Ok(Some(StoredContainer {
            flags: ContainerFlags {
                machine_scoped: record.machine_scoped,
                exportable: record.exportable,
            },
            key: PrivateKey::from_der(record.private_key.as_bytes())?,
        }))
    }

    fn write_record(&self, path: &Path, record: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        let written = file.write_all(record).and_then(|_| file.sync_all());
        if written.is_err() {
            drop(file);
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove partially written container");
            }
        }
        written
    }
}

impl KeyContainerStore for FileKeyStore {
    fn exists(&self, name: &ContainerName) -> Result<bool> {
        let path = self.container_path(name);
        path.try_exists().map_err(|e| Error::io(path, e))
    }

    fn install(&self, name: &ContainerName, key: &PrivateKey, flags: ContainerFlags) -> Result<()> {
        if !flags.machine_scoped {
            return Err(CryptoError::InstallRejected(format!(
                "{} only holds machine-wide containers",
                self.root.display()
            ))
            .into());
        }

        let record = ContainerRecord {
            version: RECORD_VERSION,
            machine_scoped: flags.machine_scoped,
            exportable: flags.exportable,
            private_key: OctetString::new(key.as_der()).map_err(CryptoError::from)?,
        }
        .to_der()
        .map_err(CryptoError::from)?;

        let path = self.container_path(name);
        debug!(path = %path.display(), "writing key container");

        match self.write_record(&path, &record) {
            Ok(()) => {
                info!(container = %name, ?flags, "key container created");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::AlreadyInstalled(name.clone())),
            Err(e) => Err(CryptoError::InstallRejected(format!("{}: {e}", path.display())).into()),
        }
    }
}

/// Platform default root of the machine-wide store.
pub fn default_store_dir() -> PathBuf {
    if cfg!(windows) {
        std::env::var_os("ProgramData")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
            .join("sn-install-pfx")
            .join("containers")
    } else {
        PathBuf::from("/var/lib/sn-install-pfx/containers")
    }
}
