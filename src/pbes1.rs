use cbc::cipher::{BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7};
use der::{Decode, Sequence, asn1::OctetString, oid::ObjectIdentifier};
use des::TdesEde3;
use pkcs12::kdf;
use rc2::Rc2;
use sha1::Sha1;

use crate::{error::CryptoError, oid};

/// `pkcs-12PbeParams` of the legacy PKCS#12 password based encryption schemes
#[derive(Debug, Clone, PartialEq, Eq, Sequence)]
pub struct PbeParameters {
    pub salt: OctetString,
    pub iterations: u64,
}

/// Decryption with `pbeWithSHAAnd3-KeyTripleDES-CBC` and `pbeWithSHAAnd40BitRC2-CBC`
pub struct Pbes1<'a> {
    alg_oid: ObjectIdentifier,
    salt: &'a [u8],
    iterations: u64,
}

impl<'a> Pbes1<'a> {
    pub fn new(alg_oid: ObjectIdentifier, params: &'a PbeParameters) -> Self {
        Self {
            alg_oid,
            salt: params.salt.as_bytes(),
            iterations: params.iterations,
        }
    }

    pub fn parse_parameters(der: &[u8]) -> Result<PbeParameters, CryptoError> {
        Ok(PbeParameters::from_der(der)?)
    }

    fn cbc<T>(&self, data: &[u8], password: &str, size: usize) -> Result<Vec<u8>, CryptoError>
    where
        T: BlockCipher + BlockDecryptMut + KeyInit,
    {
        let key = kdf::derive_key_utf8::<Sha1>(
            password,
            self.salt,
            kdf::Pkcs12KeyType::EncryptionKey,
            self.iterations as _,
            size,
        )?;

        let iv = kdf::derive_key_utf8::<Sha1>(password, self.salt, kdf::Pkcs12KeyType::Iv, self.iterations as _, 8)?;

        let cipher = cbc::Decryptor::<T>::new_from_slices(&key, &iv).map_err(|_| CryptoError::InvalidLength)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|_| CryptoError::BadPassword)
    }

    pub fn decrypt(&self, data: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        match self.alg_oid {
            oid::PBE_WITH_SHA_AND3_KEY_TRIPLE_DES_CBC_OID => self.cbc::<TdesEde3>(data, password, 24),
            oid::PBE_WITH_SHA_AND_40BIT_RC2_CBC_OID => self.cbc::<Rc2>(data, password, 5),
            _ => Err(CryptoError::UnsupportedEncryptionScheme),
        }
    }
}
