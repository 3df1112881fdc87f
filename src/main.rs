use std::{env, io, process::ExitCode};

use sn_install_pfx::{
    cli::{self, Cli},
    config::Settings,
    logging,
};

fn main() -> ExitCode {
    let cli = match Cli::parse_args(env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => cli.apply(settings),
        Err(e) => {
            eprintln!("error: {e}");
            return cli::exit_code(&e);
        }
    };

    if let Err(e) = logging::builder()
        .verbosity(cli.verbose)
        .filter(settings.log_filter.clone())
        .init()
    {
        eprintln!("error: {e}");
        return cli::exit_code(&e);
    }
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "loaded config file");
    }

    match cli::execute(&cli, &settings) {
        Ok(report) => match cli::write_report(&report, &mut io::stdout().lock(), &mut io::stderr().lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::from(cli::EXIT_FAILURE),
        },
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            cli::write_failure(&e, &settings.key_store(), &mut io::stderr().lock())
        }
    }
}
