use std::fmt;

use der::oid::ObjectIdentifier;
use pkcs8::PrivateKeyInfo;

use crate::{cert::Certificate, error::CryptoError, oid};

/// PKCS#8 private key wrapper
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub(crate) data: Vec<u8>,
    pub(crate) oid: ObjectIdentifier,
}

impl PrivateKey {
    /// Parses a PKCS#8 private key encoded in DER format and constructs a new instance of the struct.
    pub fn from_der(data: &[u8]) -> Result<Self, CryptoError> {
        let info: PrivateKeyInfo = data.try_into().map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self {
            data: data.to_vec(),
            oid: info.algorithm.oid,
        })
    }

    /// Returns a reference to the private key data in PKCS#8 DER-encoded format.
    pub fn as_der(&self) -> &[u8] {
        &self.data
    }

    /// Returns an ObjectIdentifier of the key algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        self.oid
    }

    pub fn is_rsa(&self) -> bool {
        self.oid == oid::RSA_ENCRYPTION_OID
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("data", &"<PKCS#8>")
            .field("oid", &self.oid)
            .finish()
    }
}

/// Wrapper for the local key id linking a key bag to its certificate bag.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalKeyId(pub Vec<u8>);

impl fmt::Debug for LocalKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalKeyId").field(&hex::encode(&self.0)).finish()
    }
}

/// Private key extracted from a PFX file, with its entity certificate when the file has one.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub(crate) key: PrivateKey,
    pub(crate) local_key_id: Option<LocalKeyId>,
    pub(crate) friendly_name: Option<String>,
    pub(crate) certificate: Option<Certificate>,
}

impl KeyPair {
    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    pub fn local_key_id(&self) -> Option<&LocalKeyId> {
        self.local_key_id.as_ref()
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("key", &self.key)
            .field("local_key_id", &self.local_key_id)
            .field("friendly_name", &self.friendly_name)
            .field("certificate", &self.certificate)
            .finish()
    }
}
