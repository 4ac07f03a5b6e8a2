mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use franklinwh_core::{CoordinatorConfig, HttpCoordinator};

use crate::cli::{Cli, Command, GlobalOpts, ModeCommand};
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
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a gateway
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "franklinwh", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            if let Command::Mode(ref args) = cmd {
                let ModeCommand::Set { ref mode } = args.command;
                commands::mode::validate(mode)?;
            }

            let cfg = config::load_config()?;
            let profile_name = config::active_profile_name(&cli.global, &cfg);
            let coordinator_config = build_coordinator_config(&cmd, &cli.global, &cfg)?;
            let coordinator = HttpCoordinator::from_config(coordinator_config);

            tracing::debug!(command = ?cmd, profile = %profile_name, "dispatching command");
            commands::dispatch(cmd, &coordinator, &cli.global)
                .await
                .map_err(|e| e.with_profile(&profile_name))
        }
    }
}

/// Build a `CoordinatorConfig` from the config file, profile, and CLI overrides.
fn build_coordinator_config(
    cmd: &Command,
    global: &GlobalOpts,
    cfg: &config::Config,
) -> Result<CoordinatorConfig, CliError> {
    let mut resolved = config::resolve_coordinator_config(global, cfg)?;

    if let Command::Watch(cli::WatchArgs { interval: Some(secs) }) = cmd {
        let secs = *secs;
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        resolved.scan_interval = Duration::from_secs(secs);
    }

    Ok(resolved)
}
