//! Bot configuration handlers.
//!
//! Every edit goes through a dashboard session so it lands on the
//! server config merged over the defaults, and every save runs the same
//! validation the dashboard does.

use botdeck_core::{BotConfig, DashboardConfig, SECRET_KEYS};
use secrecy::SecretString;
use serde_json::Value;

use crate::cli::{ConfigArgs, ConfigCommand, EnvCommand, GlobalOpts, OutputFormat};
use crate::error::{CliError, bullet_list};
use crate::output::{self, Painter};

use super::util;

pub async fn handle(
    config: DashboardConfig,
    args: ConfigArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show { section } => {
            util::with_session(config, global, |dashboard| async move {
                let snap = util::loaded_snapshot(&dashboard).await?;
                let value = match section {
                    Some(name) => snap
                        .config
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| CliError::NotFound {
                            resource_type: "config section".into(),
                            identifier: name,
                            list_command: "config show".into(),
                        })?,
                    None => snap.config,
                };
                print_value(&value, global);
                Ok(())
            })
            .await
        }

        ConfigCommand::Get { path } => {
            util::with_session(config, global, |dashboard| async move {
                let snap = util::loaded_snapshot(&dashboard).await?;
                let config = BotConfig::from_value(snap.config)?;
                let value = config.get_path(&path).ok_or_else(|| CliError::NotFound {
                    resource_type: "config key".into(),
                    identifier: path.clone(),
                    list_command: "config show".into(),
                })?;
                print_value(value, global);
                Ok(())
            })
            .await
        }

        ConfigCommand::Set { path, value, force } => {
            let value = util::parse_value(&value);
            util::with_session(config, global, |dashboard| async move {
                util::loaded_snapshot(&dashboard).await?;
                dashboard.set_config_value(&path, value).await?;
                util::save_config(&dashboard, force, global).await
            })
            .await
        }

        ConfigCommand::Traits { set, force } => {
            util::with_session(config, global, |dashboard| async move {
                let snap = util::loaded_snapshot(&dashboard).await?;
                match set {
                    Some(text) => {
                        dashboard.set_traits_text(&text).await?;
                        util::save_config(&dashboard, force, global).await
                    }
                    None => {
                        let traits = BotConfig::from_value(snap.config)?.traits();
                        let out = output::render_single(
                            global.output,
                            &traits,
                            |t| t.join("\n"),
                            |t| t.join("\n"),
                        );
                        output::print_output(&out, global.quiet);
                        Ok(())
                    }
                }
            })
            .await
        }

        ConfigCommand::Validate => {
            util::with_session(config, global, |dashboard| async move {
                util::loaded_snapshot(&dashboard).await?;
                let report = dashboard.validate_config().await?;
                if !global.quiet {
                    let paint = Painter::new(global.color);
                    for warning in &report.warnings {
                        eprintln!("{} {warning}", paint.warn("warning:"));
                    }
                    if report.is_ok() {
                        eprintln!("{} Configuration is valid", paint.good("✓"));
                    }
                }
                if report.is_ok() {
                    Ok(())
                } else {
                    Err(CliError::InvalidBotConfig {
                        details: bullet_list(&report.errors),
                    })
                }
            })
            .await
        }

        ConfigCommand::Env(args) => match args.command {
            EnvCommand::Show => {
                util::with_session(config, global, |dashboard| async move {
                    let snap = util::loaded_snapshot(&dashboard).await?;
                    let out = output::render_single(
                        global.output,
                        &snap.env,
                        |env| {
                            let rows: Vec<_> = env
                                .iter()
                                .map(|(k, v)| {
                                    let shown = if v.is_empty() { "(unset)".into() } else { v.clone() };
                                    (k.as_str(), shown)
                                })
                                .collect();
                            output::detail(&rows)
                        },
                        |env| env.keys().cloned().collect::<Vec<_>>().join("\n"),
                    );
                    output::print_output(&out, global.quiet);
                    Ok(())
                })
                .await
            }

            EnvCommand::Set { key, force } => {
                if !SECRET_KEYS.contains(&key.as_str()) {
                    return Err(CliError::Validation {
                        field: "key".into(),
                        reason: format!("expected one of {}", SECRET_KEYS.join(", ")),
                    });
                }
                let secret = rpassword::prompt_password(format!("{key}: "))
                    .map_err(CliError::Io)?;
                if secret.trim().is_empty() {
                    return Err(CliError::Validation {
                        field: key,
                        reason: "value cannot be empty".into(),
                    });
                }
                let secret = SecretString::from(secret.trim().to_owned());

                util::with_session(config, global, |dashboard| async move {
                    util::loaded_snapshot(&dashboard).await?;
                    dashboard.set_env(&key, secret).await?;
                    util::save_config(&dashboard, force, global).await
                })
                .await
            }
        },
    }
}

/// Table/plain show scalars bare and documents as pretty JSON.
fn print_value(value: &Value, global: &GlobalOpts) {
    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => match value {
            Value::Object(_) | Value::Array(_) => output::render_json_pretty(value),
            other => output::value_text(other),
        },
        format => output::render_single(format, value, output::value_text, output::value_text),
    };
    output::print_output(&out, global.quiet);
}
