use std::{fs, path::Path};

use der::{Decode, Encode, asn1::OctetString};
use pkcs12::{
    authenticated_safe::AuthenticatedSafe,
    pfx::{Pfx, Version},
};
use tracing::debug;

use crate::{
    Result,
    codec::{self, ParsedAuthSafe},
    error::{CryptoError, Error},
    key::KeyPair,
    oid,
};

/// Source of private key material stored in password protected PFX files.
pub trait PfxReader {
    /// Opens the PFX file at `path` and returns its private key.
    fn open_pfx(&self, path: &Path, password: &str) -> Result<KeyPair>;
}

/// [PfxReader] backed by the PKCS#12 decoder of this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct Pkcs12Reader;

impl PfxReader for Pkcs12Reader {
    fn open_pfx(&self, path: &Path, password: &str) -> Result<KeyPair> {
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        debug!(path = %path.display(), len = data.len(), "opening PFX file");
        Ok(parse_pfx(&data, password)?)
    }
}

/// Parses PKCS#12 data and extracts the first private key with its entity certificate.
///
/// The MAC is verified before anything is decrypted, so a wrong password is reported as
/// [CryptoError::BadPassword] rather than as a decoding failure.
pub fn parse_pfx(data: &[u8], password: &str) -> std::result::Result<KeyPair, CryptoError> {
    let pfx = Pfx::from_der(data)?;

    if pfx.version != Version::V3 {
        return Err(CryptoError::InvalidVersion);
    }

    if let Some(mac_data) = &pfx.mac_data {
        codec::verify_mac(mac_data, password, pfx.auth_safe.content.value())?;
    }

    let safes: AuthenticatedSafe = if pfx.auth_safe.content_type == oid::CONTENT_TYPE_DATA_OID {
        AuthenticatedSafe::from_der(&OctetString::from_der(&pfx.auth_safe.content.to_der()?)?.into_bytes())?
    } else {
        return Err(CryptoError::UnsupportedContentType);
    };

    let mut parsed = ParsedAuthSafe::default();
    for safe in &safes {
        parsed.extend(codec::parse_auth_safe(safe, password)?);
    }

    let ParsedAuthSafe { keys, certs } = parsed;
    let key = keys.into_iter().next().ok_or(CryptoError::MissingPrivateKey)?;

    let certificate = match &key.local_key_id {
        Some(id) => certs.into_iter().find(|c| c.local_key_id.as_ref() == Some(id)),
        None => certs.into_iter().next(),
    }
    .map(|c| c.cert);

    Ok(KeyPair {
        key: key.key,
        local_key_id: key.local_key_id,
        friendly_name: key.friendly_name,
        certificate,
    })
}
