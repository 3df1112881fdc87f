use std::{env, fmt, fs};

use crate::{Result, error::Error};

const DOMAIN_SEPARATOR: char = '\\';
const FALLBACK_DOMAIN: &str = "localhost";
/// The only character whose full lowercase mapping has more than one code point.
const DOTTED_CAPITAL_I: char = '\u{130}';

/// The `<domain>\<user>` identity that salts container names.
///
/// Strong name containers live in the machine-wide store but are only usable by their creator,
/// so two users importing the same file must end up with different containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Builds the identity from a domain (or host) qualifier and a user name.
    pub fn new(domain: &str, user: &str) -> Self {
        Self(format!("{domain}{DOMAIN_SEPARATOR}{user}"))
    }

    /// Uses an already qualified identity as is, e.g. `CORP\alice`.
    pub fn from_qualified(qualified: impl Into<String>) -> Self {
        Self(qualified.into())
    }

    /// Identity of the user running this process.
    ///
    /// The domain comes from `USERDOMAIN`, then `HOSTNAME`, then `/etc/hostname`.
    /// The user name comes from `USERNAME`, `USER` or `LOGNAME`.
    pub fn current() -> Result<Self> {
        let user = ["USERNAME", "USER", "LOGNAME"]
            .into_iter()
            .find_map(non_empty_var)
            .ok_or_else(|| Error::invalid_input("Cannot determine the current user name"))?;

        let domain = ["USERDOMAIN", "HOSTNAME"]
            .into_iter()
            .find_map(non_empty_var)
            .or_else(|| {
                fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|h| h.trim().to_owned())
                    .filter(|h| !h.is_empty())
            })
            .unwrap_or_else(|| FALLBACK_DOMAIN.to_owned());

        Ok(Self::new(&domain, &user))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased identity as UTF-16LE bytes, the input of the salt fingerprint.
    ///
    /// Lower-casing maps each character on its own, without the context rules of
    /// [str::to_lowercase] (final sigma), and follows the invariant culture of .NET in mapping
    /// `İ` (U+0130) to a plain `i`.
    pub fn to_hash_bytes(&self) -> Result<Vec<u8>> {
        let mut lower = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            match c {
                DOTTED_CAPITAL_I => lower.push('i'),
                c => lower.extend(c.to_lowercase()),
            }
        }

        let bytes: Vec<u8> = lower
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();

        if bytes.is_empty() {
            return Err(Error::invalid_input("User identity cannot be empty"));
        }
        Ok(bytes)
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_qualified_form() {
        let identity = UserIdentity::new("HOST", "user");
        assert_eq!(identity.as_str(), "HOST\\user");
        assert_eq!(identity, UserIdentity::from_qualified("HOST\\user"));
        assert_eq!(identity.to_string(), "HOST\\user");
    }

    #[test]
    fn test_hash_bytes_are_lowercase_utf16le() {
        let bytes = UserIdentity::from_qualified("Ab\\C").to_hash_bytes().unwrap();
        assert_eq!(bytes, [b'a', 0, b'b', 0, b'\\', 0, b'c', 0]);
    }

    #[test]
    fn test_hash_bytes_non_ascii() {
        let bytes = UserIdentity::from_qualified("Ä😀").to_hash_bytes().unwrap();
        // U+00E4, then U+1F600 as a surrogate pair
        assert_eq!(bytes, [0xE4, 0x00, 0x3D, 0xD8, 0x00, 0xDE]);
    }

    #[test]
    fn test_sigma_is_mapped_per_character() {
        let lower = UserIdentity::from_qualified("ΟΔΟΣ").to_hash_bytes().unwrap();
        let expected: Vec<u8> = "οδοσ".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(lower, expected);
    }

    #[test]
    fn test_empty_identity_is_rejected() {
        let err = UserIdentity::from_qualified("").to_hash_bytes().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_dotted_capital_i_maps_to_plain_i() {
        let bytes = UserIdentity::from_qualified("\u{130}STANBUL\\\u{130}").to_hash_bytes().unwrap();
        let expected: Vec<u8> = "istanbul\\i".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(bytes, expected);
    }

    /// Sets `vars` for the duration of `f`, restoring the previous values afterwards.
    fn with_vars(vars: &[(&str, &str)], f: impl FnOnce()) {
        let saved: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var_os(k))).collect();
        // SAFETY: callers are #[serial], no other test thread touches the environment meanwhile
        unsafe {
            for (k, v) in vars {
                env::set_var(k, v);
            }
        }
        f();
        unsafe {
            for (k, v) in saved {
                match v {
                    Some(v) => env::set_var(k, v),
                    None => env::remove_var(k),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_current_identity_from_environment() {
        with_vars(&[("USERNAME", "alice"), ("USERDOMAIN", "CORP")], || {
            assert_eq!(UserIdentity::current().unwrap().as_str(), "CORP\\alice");
        });
    }

    #[test]
    #[serial]
    fn test_current_identity_skips_blank_variables() {
        with_vars(&[("USERNAME", " "), ("USER", "bob"), ("USERDOMAIN", ""), ("HOSTNAME", "build01")], || {
            assert_eq!(UserIdentity::current().unwrap().as_str(), "build01\\bob");
        });
    }
}
