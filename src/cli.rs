//! # Command line interface
//!
//! `sn-install-pfx <pfx_infile> [<pfx_password> [<container_name>]]`
//!
//! * one argument: print the container name of the file and whether it is installed
//! * two arguments: install the key pair under the derived container name
//! * three arguments: install the key pair under `container_name`
//!
//! Exit codes: `0` success, `254` (-2) the container already exists, `255` (-1) usage, `1` any other failure.

use std::{
    ffi::OsString,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{ArgAction, CommandFactory, Parser, error::ErrorKind};
use tracing::debug;

use crate::{
    Result,
    config::Settings,
    container::{ContainerName, resolve_key_file},
    error::Error,
    installer::{InstalledKey, KeyInstaller},
    store::FileKeyStore,
};

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_ALREADY_INSTALLED: u8 = 254;
pub const EXIT_USAGE: u8 = 255;

/// Help aliases of `sn.exe`, accepted anywhere on the command line.
const HELP_ALIASES: [&str; 2] = ["?", "-?"];

const LONG_ABOUT: &str = "Installs the key pair from <PFX_INFILE> into a strong name key container compatible with MSBuild.

This is an alternative to `sn -i <infile> <container>`. It accepts the password on the command line and \
derives the container name MSBuild expects for <PFX_INFILE> unless one is given with <CONTAINER_NAME>.";

const AFTER_HELP: &str = "Examples:
  sn-install-pfx key.pfx                     show the container name of key.pfx and whether it is installed
  sn-install-pfx key.pfx secret              install key.pfx
  sn-install-pfx key.pfx secret MyContainer  install key.pfx into MyContainer";

/// Command line arguments
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "sn-install-pfx")]
#[command(version)]
#[command(about = "Installs a .pfx key pair into a strong name key container")]
#[command(long_about = LONG_ABOUT)]
#[command(after_help = AFTER_HELP)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// PKCS#12 key pair file (.pfx)
    #[arg(value_name = "PFX_INFILE")]
    pub pfx_path: PathBuf,

    /// Password of the .pfx file; the key pair is installed when given
    #[arg(value_name = "PFX_PASSWORD", allow_hyphen_values = true)]
    pub password: Option<String>,

    /// Install under this container name instead of the derived one
    #[arg(value_name = "CONTAINER_NAME", requires = "password")]
    pub container_name: Option<String>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory of the machine-wide key container store
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parses arguments, printing usage for help requests and malformed command lines.
    ///
    /// Returns the exit code to terminate with when there is nothing to run.
    pub fn parse_args<I, T>(args: I) -> std::result::Result<Self, ExitCode>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        if args
            .iter()
            .skip(1)
            .any(|a| HELP_ALIASES.iter().any(|h| a.as_os_str() == *h))
        {
            // nothing sensible to do if stdout is gone
            let _ = Self::command().print_long_help();
            return Err(ExitCode::from(EXIT_USAGE));
        }

        Self::try_parse_from(args).map_err(|e| {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            }
        })
    }

    /// Applies command line overrides on top of loaded settings.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(dir) = &self.store_dir {
            settings.store_dir = Some(dir.clone());
        }
        settings
    }
}

/// What a successful run reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Status { container: ContainerName, installed: bool },
    Installed(InstalledKey),
}

/// Resolves the container name and either reports its status or installs the key pair.
pub fn execute(cli: &Cli, settings: &Settings) -> Result<Report> {
    let container = match &cli.container_name {
        Some(name) => ContainerName::new(name.as_str())?,
        None => resolve_key_file(&cli.pfx_path, &settings.user_identity()?)?,
    };
    debug!(%container, "resolved container name");

    let installer = KeyInstaller::new(settings.key_store());

    match &cli.password {
        None => {
            let installed = installer.is_installed(&container)?;
            Ok(Report::Status { container, installed })
        }
        Some(password) => Ok(Report::Installed(installer.install(
            &cli.pfx_path,
            password,
            &container,
        )?)),
    }
}

/// Writes the outcome: the container name goes to `out`, notes to `err`.
pub fn write_report(report: &Report, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    match report {
        Report::Status { container, installed } => {
            writeln!(out, "{container}")?;
            writeln!(out, "Installed: {installed}")?;
        }
        Report::Installed(key) => {
            writeln!(
                err,
                "The key pair has been installed into the strong name key container '{}'.",
                key.container
            )?;
            writeln!(out, "{}", key.container)?;
        }
    }
    Ok(())
}

/// Writes a failure to `err` and returns the matching exit code.
pub fn write_failure(error: &Error, store: &FileKeyStore, err: &mut impl Write) -> ExitCode {
    let _ = match error {
        Error::AlreadyInstalled(container) => write_conflict(container, &store.container_path(container), err),
        other => writeln!(err, "error: {other}"),
    };
    exit_code(error)
}

fn write_conflict(container: &ContainerName, path: &Path, err: &mut impl Write) -> io::Result<()> {
    writeln!(
        err,
        "The key pair is already installed in the strong name key container '{container}'."
    )?;
    writeln!(err, "The container is stored in {}.", path.display())?;
    writeln!(err, "Delete that file to remove the container before installing again.")
}

pub fn exit_code(error: &Error) -> ExitCode {
    match error {
        Error::AlreadyInstalled(_) => ExitCode::from(EXIT_ALREADY_INSTALLED),
        _ => ExitCode::from(EXIT_FAILURE),
    }
}
