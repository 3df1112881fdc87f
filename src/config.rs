use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{
    Result,
    identity::UserIdentity,
    store::{FileKeyStore, default_store_dir},
};

/// Prefix of environment overrides, e.g. `SNPFX_STORE_DIR`.
pub const ENV_PREFIX: &str = "SNPFX";

/// Tool settings, layered from an optional TOML file and `SNPFX_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory of the machine-wide key container store.
    pub store_dir: Option<PathBuf>,
    /// Qualified `<domain>\<user>` identity used instead of the current user.
    pub user_identity: Option<String>,
    /// tracing filter directives, e.g. `sn_install_pfx=debug`.
    pub log_filter: Option<String>,
}

impl Settings {
    /// Loads settings. An explicitly given file must exist; environment variables override it.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        Ok(settings)
    }

    pub fn key_store(&self) -> FileKeyStore {
        FileKeyStore::new(self.store_dir.clone().unwrap_or_else(default_store_dir))
    }

    pub fn user_identity(&self) -> Result<UserIdentity> {
        match &self.user_identity {
            Some(identity) => Ok(UserIdentity::from_qualified(identity.as_str())),
            None => UserIdentity::current(),
        }
    }
}
