//!
//! [Error] and [CryptoError] enum definitions
//!
use std::{io, path::PathBuf};

use der::oid::ObjectIdentifier;
use x509_parser::error::X509Error;

use crate::container::ContainerName;

/// Possible errors for container name derivation and key installation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot read {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("The key pair is already installed in key container '{0}'")]
    AlreadyInstalled(ContainerName),

    #[error(transparent)]
    CryptoFailure(#[from] CryptoError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Failures while opening a PFX file or persisting its key material
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid password or the PFX integrity check failed")]
    BadPassword,

    #[error(transparent)]
    Der(#[from] der::Error),

    #[error("Invalid PFX version")]
    InvalidVersion,

    #[error("Unsupported ContentType")]
    UnsupportedContentType,

    #[error("Unsupported certificate type")]
    UnsupportedCertificateType,

    #[error(transparent)]
    Certificate(#[from] x509_parser::nom::Err<X509Error>),

    #[error("Invalid parameters")]
    InvalidParameters,

    #[error("Invalid length")]
    InvalidLength,

    #[error("Unsupported encryption scheme")]
    UnsupportedEncryptionScheme,

    #[error("Unsupported MAC algorithm")]
    UnsupportedMacAlgorithm,

    #[error("{0}")]
    Pkcs5Error(String),

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("The PFX file does not contain a private key")]
    MissingPrivateKey,

    #[error("Unsupported key algorithm {0}, strong name signing requires an RSA key")]
    UnsupportedKeyAlgorithm(ObjectIdentifier),

    #[error("Key store rejected the key pair: {0}")]
    InstallRejected(String),
}

impl CryptoError {
    /// The password does not open the file.
    pub fn is_bad_password(&self) -> bool {
        matches!(self, CryptoError::BadPassword)
    }

    /// The file is not a readable PKCS#12 structure.
    pub fn is_corrupt_file(&self) -> bool {
        matches!(
            self,
            CryptoError::Der(_)
                | CryptoError::InvalidVersion
                | CryptoError::UnsupportedContentType
                | CryptoError::UnsupportedCertificateType
                | CryptoError::Certificate(_)
                | CryptoError::InvalidParameters
                | CryptoError::InvalidPrivateKey
                | CryptoError::MissingPrivateKey
        )
    }
}

impl From<pkcs5::Error> for CryptoError {
    fn from(e: pkcs5::Error) -> Self {
        match e {
            pkcs5::Error::DecryptFailed => CryptoError::BadPassword,
            e => CryptoError::Pkcs5Error(e.to_string()),
        }
    }
}
