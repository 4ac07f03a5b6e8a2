//! Config subcommand handlers.

use std::fmt::Write as _;
use std::io::{self, BufRead, IsTerminal};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "max_failures = {}", cfg.defaults.max_failures);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        let _ = writeln!(out, "gateway_id = \"{}\"", p.gateway_id);
        if p.use_local_api {
            let _ = writeln!(out, "use_local_api = true");
        }
        if let Some(ref host) = p.local_host {
            let _ = writeln!(out, "local_host = \"{host}\"");
        }
        if let Some(secs) = p.scan_interval {
            let _ = writeln!(out, "scan_interval = {secs}");
        }
        if let Some(max) = p.max_failures {
            let _ = writeln!(out, "max_failures = {max}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if p.preserve_mode_on_reserve {
            let _ = writeln!(out, "preserve_mode_on_reserve = true");
        }
    }

    out
}

fn read_password() -> Result<String, CliError> {
    if io::stdin().is_terminal() {
        eprint!("Password: ");
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(password)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load_config()?;
            let profile = config::active_profile_name(global, &cfg);
            let password = read_password()?;
            config::store_password(&profile, &password)?;
            if !global.quiet {
                eprintln!("Password stored in keyring for profile '{profile}'");
            }
            Ok(())
        }
    }
}
