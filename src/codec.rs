use cms::{
    cert::x509::{attr::Attributes, spki::AlgorithmIdentifierOwned},
    content_info::{CmsVersion, ContentInfo},
    encrypted_data::EncryptedData,
};
use der::{
    Any, Decode, Encode,
    asn1::{BmpString, ContextSpecific, ObjectIdentifier, OctetString},
};
use hmac::{Hmac, Mac};
use pkcs5::pbes2;
use pkcs12::{
    cert_type::CertBag,
    kdf,
    mac_data::MacData,
    pbe_params::EncryptedPrivateKeyInfo,
    safe_bag::SafeContents,
};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tracing::trace;
#[cfg(feature = "pbes1")]
use crate::pbes1::Pbes1;

use crate::{
    cert::Certificate,
    error::CryptoError,
    key::{LocalKeyId, PrivateKey},
    oid,
};

type Result<T> = std::result::Result<T, CryptoError>;

pub struct ParsedKey {
    pub friendly_name: Option<String>,
    pub local_key_id: Option<LocalKeyId>,
    pub key: PrivateKey,
}

pub struct ParsedCertificate {
    pub local_key_id: Option<LocalKeyId>,
    pub cert: Certificate,
}

#[derive(Default)]
pub struct ParsedAuthSafe {
    pub keys: Vec<ParsedKey>,
    pub certs: Vec<ParsedCertificate>,
}

impl ParsedAuthSafe {
    pub fn extend(&mut self, other: ParsedAuthSafe) {
        self.keys.extend(other.keys);
        self.certs.extend(other.certs);
    }
}

/// Checks the PFX integrity MAC. A mismatch almost always means a wrong password.
pub fn verify_mac(mac_data: &MacData, password: &str, data: &[u8]) -> Result<()> {
    match mac_data.mac.algorithm.oid {
        oid::SHA1_OID => {
            let key = kdf::derive_key_utf8::<Sha1>(
                password,
                mac_data.mac_salt.as_bytes(),
                kdf::Pkcs12KeyType::Mac,
                mac_data.iterations as _,
                <Sha1 as Digest>::output_size(),
            )?;
            let mut hmac = <Hmac<Sha1> as Mac>::new_from_slice(&key).map_err(|_| CryptoError::InvalidLength)?;
            hmac.update(data);
            hmac.verify_slice(mac_data.mac.digest.as_bytes())
                .map_err(|_| CryptoError::BadPassword)
        }
        oid::SHA256_OID => {
            let key = kdf::derive_key_utf8::<Sha256>(
                password,
                mac_data.mac_salt.as_bytes(),
                kdf::Pkcs12KeyType::Mac,
                mac_data.iterations as _,
                <Sha256 as Digest>::output_size(),
            )?;
            let mut hmac = <Hmac<Sha256> as Mac>::new_from_slice(&key).map_err(|_| CryptoError::InvalidLength)?;
            hmac.update(data);
            hmac.verify_slice(mac_data.mac.digest.as_bytes())
                .map_err(|_| CryptoError::BadPassword)
        }
        _ => Err(CryptoError::UnsupportedMacAlgorithm),
    }
}

pub fn parse_auth_safe(safe: &ContentInfo, password: &str) -> Result<ParsedAuthSafe> {
    let data = match safe.content_type {
        oid::CONTENT_TYPE_DATA_OID => OctetString::from_der(&safe.content.to_der()?)?.as_bytes().to_vec(),
        oid::CONTENT_TYPE_ENCRYPTED_DATA_OID => {
            let enc_data = EncryptedData::from_der(&safe.content.to_der()?)?;
            if enc_data.version != CmsVersion::V0 {
                return Err(CryptoError::InvalidVersion);
            }
            match enc_data.enc_content_info.encrypted_content.as_ref() {
                Some(data) => decrypt(&enc_data.enc_content_info.content_enc_alg, data.as_bytes(), password)?,
                None => return Ok(ParsedAuthSafe::default()),
            }
        }
        _ => return Err(CryptoError::UnsupportedContentType),
    };

    parse_bags(SafeContents::from_der(&data)?, password)
}

fn decrypt(alg: &AlgorithmIdentifierOwned, data: &[u8], password: &str) -> Result<Vec<u8>> {
    let params = alg
        .parameters
        .as_ref()
        .ok_or(CryptoError::InvalidParameters)?
        .to_der()?;

    match alg.oid {
        oid::PBES2_OID => {
            let params = pbes2::Parameters::from_der(&params)?;
            Ok(params.decrypt(password.as_bytes(), data)?)
        }
        #[cfg(feature = "pbes1")]
        oid::PBE_WITH_SHA_AND_40BIT_RC2_CBC_OID | oid::PBE_WITH_SHA_AND3_KEY_TRIPLE_DES_CBC_OID => {
            let params = Pbes1::parse_parameters(&params)?;
            Pbes1::new(alg.oid, &params).decrypt(data, password)
        }
        _ => Err(CryptoError::UnsupportedEncryptionScheme),
    }
}

fn get_bag_attribute(oid: &ObjectIdentifier, attributes: Option<&Attributes>) -> Option<Vec<u8>> {
    attributes?.iter().find_map(|a| {
        if a.oid == *oid {
            a.values.iter().next().and_then(|v| v.to_der().ok())
        } else {
            None
        }
    })
}

fn parse_bags(bags: SafeContents, password: &str) -> Result<ParsedAuthSafe> {
    let mut parsed = ParsedAuthSafe::default();

    for bag in bags {
        let local_key_id = get_bag_attribute(&oid::LOCAL_KEY_ID_OID, bag.bag_attributes.as_ref())
            .and_then(|a| OctetString::from_der(&a).ok().map(|a| LocalKeyId(a.as_bytes().to_vec())));

        let friendly_name = get_bag_attribute(&oid::FRIENDLY_NAME_OID, bag.bag_attributes.as_ref())
            .and_then(|n| BmpString::from_der(&n).ok().map(|a| a.to_string()));

        match bag.bag_id {
            oid::PKCS_12_CERT_BAG_OID => {
                let cs: ContextSpecific<CertBag> = ContextSpecific::from_der(&bag.bag_value)?;
                if cs.value.cert_id != oid::CERT_TYPE_X509_CERTIFICATE_OID {
                    return Err(CryptoError::UnsupportedCertificateType);
                }
                let cert = Certificate::from_der(cs.value.cert_value.as_bytes())?;
                trace!(subject = cert.subject(), "certificate bag");
                parsed.certs.push(ParsedCertificate { local_key_id, cert });
            }
            oid::PKCS_12_SHROUDED_KEY_BAG_OID => {
                let cs: ContextSpecific<EncryptedPrivateKeyInfo> = ContextSpecific::from_der(&bag.bag_value)?;

                let decrypted = decrypt(
                    &cs.value.encryption_algorithm,
                    cs.value.encrypted_data.as_bytes(),
                    password,
                )?;

                trace!(?local_key_id, "shrouded key bag");
                parsed.keys.push(ParsedKey {
                    friendly_name,
                    local_key_id,
                    key: PrivateKey::from_der(&decrypted)?,
                });
            }
            oid::PKCS_12_KEY_BAG_OID => {
                let cs: ContextSpecific<Any> = ContextSpecific::from_der(&bag.bag_value)?;

                trace!(?local_key_id, "key bag");
                parsed.keys.push(ParsedKey {
                    friendly_name,
                    local_key_id,
                    key: PrivateKey::from_der(&cs.value.to_der()?)?,
                });
            }
            other => trace!(bag_id = %other, "skipping unsupported bag"),
        }
    }

    Ok(parsed)
}
