mod cli;
mod commands;
mod config;
mod decode;
mod error;
mod output;
mod surface;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Local commands: no service needed
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Params(ref args) => commands::params::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "siteplan", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let session = config::resolve_session(&cli.global)?;
            tracing::debug!(
                command = ?cmd,
                profile = session.profile_name.as_deref().unwrap_or("(ad-hoc)"),
                service = %session.profile.service,
                "dispatching command"
            );
            commands::dispatch(cmd, &session, &cli.global).await
        }
    }
}
