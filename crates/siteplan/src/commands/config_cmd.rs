//! Config subcommand handlers.

use dialoguer::{Input, Select};

use siteplan_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: std::str::FromStr>(
    field: &str,
    value: &str,
    expected: &str,
) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = siteplan_config::load_config()?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &siteplan_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = siteplan_config::load_config()?;
            let profile_name = active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            match key.as_str() {
                "service" => {
                    url::Url::parse(&value).map_err(|e| CliError::Validation {
                        field: "service".into(),
                        reason: format!("invalid URL: {e}"),
                    })?;
                    profile.service = value;
                }
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                "insecure" => {
                    profile.insecure =
                        Some(parse_value("insecure", &value, "'true' or 'false'")?);
                }
                "timeout" => {
                    profile.timeout = Some(parse_value("timeout", &value, "a number (seconds)")?);
                }
                "poll_interval_ms" | "poll-interval-ms" => {
                    let ms: u64 =
                        parse_value("poll_interval_ms", &value, "a number (milliseconds)")?;
                    if ms == 0 {
                        return Err(CliError::Validation {
                            field: "poll_interval_ms".into(),
                            reason: "must be greater than 0".into(),
                        });
                    }
                    profile.poll_interval_ms = Some(ms);
                }
                "max_attempts" | "max-attempts" => {
                    profile.max_attempts =
                        Some(parse_value("max_attempts", &value, "a whole number")?);
                }
                "deadline_secs" | "deadline-secs" => {
                    profile.deadline_secs =
                        Some(parse_value("deadline_secs", &value, "a number (seconds)")?);
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: service, ca_cert, \
                             insecure, timeout, poll_interval_ms, max_attempts, deadline_secs"
                        ),
                    });
                }
            }

            let path = siteplan_config::save_config(&cfg)?;
            if !global.quiet {
                let color = output::should_color(&global.color);
                let message = format!("Set {key} on profile '{profile_name}' ({})", path.display());
                eprintln!("{}", output::success(&message, color));
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = siteplan_config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: cfg.profile_names(),
                });
            }
            cfg.default_profile = Some(name.clone());
            siteplan_config::save_config(&cfg)?;
            if !global.quiet {
                let color = output::should_color(&global.color);
                let message = format!("Default profile is now '{name}'");
                eprintln!("{}", output::success(&message, color));
            }
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    // A config that exists but does not parse is reported, never replaced.
    let mut cfg: Config = siteplan_config::load_config()?;
    let config_path = siteplan_config::config_path();
    eprintln!("siteplan: configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let service: String = Input::new()
        .with_prompt("Prediction service URL")
        .default("http://localhost:8080".into())
        .validate_with(|s: &String| url::Url::parse(s).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(prompt_err)?;

    let tls_choices = &[
        "Verify with system roots",
        "Verify with a custom CA certificate",
        "Accept any certificate (insecure)",
    ];
    let tls = Select::new()
        .with_prompt("TLS verification")
        .items(tls_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(service);
    match tls {
        1 => {
            let path: String = Input::new()
                .with_prompt("CA certificate (PEM) path")
                .interact_text()
                .map_err(prompt_err)?;
            profile.ca_cert = Some(path.into());
        }
        2 => profile.insecure = Some(true),
        _ => {}
    }

    let interval: u64 = Input::new()
        .with_prompt("Poll interval (ms)")
        .default(1000)
        .validate_with(|v: &u64| if *v > 0 { Ok(()) } else { Err("must be greater than 0") })
        .interact_text()
        .map_err(prompt_err)?;
    if interval != 1000 {
        profile.poll_interval_ms = Some(interval);
    }

    let first_profile = cfg.profiles.is_empty();
    cfg.profiles.insert(profile_name.clone(), profile);
    if first_profile
        || cfg
            .default_profile
            .as_ref()
            .is_none_or(|d| !cfg.profiles.contains_key(d))
    {
        cfg.default_profile = Some(profile_name.clone());
    }

    let path = siteplan_config::save_config(&cfg)?;

    let color = output::should_color(&global.color);
    eprintln!(
        "\n{}",
        output::success(&format!("Configuration written to {}", path.display()), color)
    );
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Try it: siteplan predict --name Test --lat 51.1 --lon -114.1");
    Ok(())
}
