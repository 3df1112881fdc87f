use std::{fmt, fs, path::Path};

use tracing::debug;

use crate::{Result, error::Error, hash::hash64, identity::UserIdentity};

/// Prefix of derived container names, shared with MSBuild.
pub const CONTAINER_PREFIX: &str = "VS_KEY_";

/// The only key file extension accepted for derivation.
pub const PFX_EXTENSION: &str = "pfx";

/// Characters that cannot appear in a container file name on any supported platform.
const RESERVED_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Windows device names, reserved with or without an extension.
const RESERVED_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1",
    "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_reserved_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    RESERVED_DEVICE_NAMES.iter().any(|d| stem.eq_ignore_ascii_case(d))
}

/// Name of a key container in the key store
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerName(String);

impl ContainerName {
    /// Validates an explicitly chosen container name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_input("Container name cannot be empty"));
        }
        if name == "." || name == ".." {
            return Err(Error::invalid_input(format!("Invalid container name \"{name}\"")));
        }
        if let Some(c) = name.chars().find(|c| RESERVED_CHARS.contains(c) || c.is_control()) {
            return Err(Error::invalid_input(format!(
                "Invalid character {c:?} in container name \"{name}\""
            )));
        }
        if name.ends_with(['.', ' ']) || is_reserved_device_name(&name) {
            return Err(Error::invalid_input(format!("Invalid container name \"{name}\"")));
        }
        Ok(Self(name))
    }

    /// Renders a fingerprint as `VS_KEY_` followed by 16 upper-case hex digits.
    pub fn from_fingerprint(fingerprint: u64) -> Self {
        Self(format!("{CONTAINER_PREFIX}{fingerprint:016X}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContainerName").field(&self.0).finish()
    }
}

impl AsRef<str> for ContainerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the container name for a key blob and a user.
///
/// The blob fingerprint is XOR-ed with the fingerprint of the lower-cased, UTF-16LE encoded
/// identity, so each user gets a different container for the same key.
pub fn derive_container_name(blob: &[u8], user: &UserIdentity) -> Result<ContainerName> {
    let user_bytes = user.to_hash_bytes()?;
    let fingerprint = hash64(blob) ^ hash64(&user_bytes);
    Ok(ContainerName::from_fingerprint(fingerprint))
}

/// Reads a `.pfx` key file and derives its container name.
///
/// The path is validated before any I/O: it must not be empty and must carry the `.pfx`
/// extension (compared case-insensitively).
pub fn resolve_key_file(path: &Path, user: &UserIdentity) -> Result<ContainerName> {
    validate_key_file(path)?;

    let blob = fs::read(path).map_err(|e| Error::io(path, e))?;
    let name = derive_container_name(&blob, user)?;

    debug!(path = %path.display(), len = blob.len(), container = %name, "derived container name");
    Ok(name)
}

pub(crate) fn validate_key_file(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_input("Key file path cannot be empty"));
    }

    let is_pfx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PFX_EXTENSION));

    if !is_pfx {
        return Err(Error::invalid_input(format!(
            "Invalid key file \"{}\": this implementation only works with .{PFX_EXTENSION} keys",
            path.display()
        )));
    }
    Ok(())
}
