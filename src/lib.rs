//!
//! Installs PKCS#12/PFX key pairs into strong name key containers, written in pure Rust.
//!
//! The legacy `sn -i <infile> <container>` command cannot take the password of a `.pfx` file on the
//! command line. This crate installs the key pair itself and, unless a container name is given,
//! picks the same container name MSBuild derives for the file, so builds find the key without
//! prompting for a password.
//!
//! Container names have the form `VS_KEY_<16 hex digits>`. The digits are a 64-bit fingerprint of
//! the file contents ([hash64]) XOR-ed with the fingerprint of the lower-cased `<domain>\<user>`
//! identity encoded as UTF-16LE, so each user of a machine gets its own container:
//!
//! ```rust
//! use sn_install_pfx::{UserIdentity, derive_container_name};
//!
//! let user = UserIdentity::new("HOST", "user");
//! let name = derive_container_name(&[0xDE, 0xAD, 0xBE, 0xEF], &user).unwrap();
//! assert_eq!(name.as_str(), "VS_KEY_D8483EA2C7BCC0F6");
//! ```
//!
//! Key pairs are read with [Pkcs12Reader] and installed through [KeyInstaller] into a
//! [KeyContainerStore]; [FileKeyStore] is the machine-wide store used by the command line tool.
//!
//! Supported PFX encryption schemes:
//!
//! * PBES2 (PBKDF2 with AES-CBC) - the default of current tools
//! * `pbeWithSHAAnd3-KeyTripleDES-CBC`, `pbeWithSHAAnd40BitRC2-CBC` - legacy files, `pbes1` feature
//!
//! Supported MAC algorithms: HMAC-SHA1, HMAC-SHA256
//!

mod cert;
pub mod cli;
mod codec;
pub mod config;
mod container;
pub mod error;
mod hash;
mod identity;
mod installer;
mod key;
pub mod logging;
mod oid;
#[cfg(feature = "pbes1")]
mod pbes1;
mod pfx;
pub mod store;

/// Result type for container name derivation and key installation
pub type Result<T> = std::result::Result<T, error::Error>;

pub use cert::Certificate;
pub use container::{CONTAINER_PREFIX, ContainerName, PFX_EXTENSION, derive_container_name, resolve_key_file};
pub use error::{CryptoError, Error};
pub use hash::{HashState, hash64};
pub use identity::UserIdentity;
pub use installer::{InstalledKey, KeyInstaller};
pub use key::{KeyPair, LocalKeyId, PrivateKey};
pub use pfx::{Pkcs12Reader, PfxReader, parse_pfx};
pub use store::{ContainerFlags, FileKeyStore, KeyContainerStore, StoredContainer};
