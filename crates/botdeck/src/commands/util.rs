//! Shared helpers for command handlers.

use std::future::Future;
use std::io::IsTerminal;
use std::time::Duration;

use botdeck_core::{CoreError, Dashboard, DashboardConfig, DashboardSnapshot, Validation};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::Painter;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Spinner on stderr while waiting on the server; hidden when piped or quiet.
pub fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// Build a dashboard for direct client calls (no session).
pub fn dashboard(config: DashboardConfig) -> Result<Dashboard, CliError> {
    Ok(Dashboard::new(config)?)
}

/// Run `f` against a started dashboard session without the push
/// channel, stopping the session afterwards whatever `f` returns.
pub async fn with_session<T, F, Fut>(
    mut config: DashboardConfig,
    global: &GlobalOpts,
    f: F,
) -> Result<T, CliError>
where
    F: FnOnce(Dashboard) -> Fut,
    Fut: Future<Output = Result<T, CliError>>,
{
    config.push_enabled = false;
    let dashboard = Dashboard::new(config)?;

    let pb = spinner(global, "Loading from admin server...");
    let started = dashboard.start().await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    started?;

    let result = f(dashboard.clone()).await;
    dashboard.stop().await;
    result
}

/// Snapshot with the server config merged in. A failed initial load is
/// retried once so its error reaches the user instead of the defaults.
pub async fn loaded_snapshot(dashboard: &Dashboard) -> Result<DashboardSnapshot, CliError> {
    let snap = dashboard.settled_snapshot().await?;
    if snap.config_loaded {
        return Ok(snap);
    }
    dashboard.refresh_config().await?;
    Ok(dashboard.settled_snapshot().await?)
}

/// Save the working config, printing validation warnings.
pub async fn save_config(
    dashboard: &Dashboard,
    force: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let validation = if force {
        Validation::Skip
    } else {
        Validation::Strict
    };
    let report = dashboard.save_config(validation).await?;

    if !global.quiet {
        let paint = Painter::new(global.color);
        for warning in &report.warnings {
            eprintln!("{} {warning}", paint.warn("warning:"));
        }
        for error in &report.errors {
            eprintln!("{} {error} (saved anyway)", paint.bad("error:"));
        }
        eprintln!("{} Configuration saved", paint.good("✓"));
    }
    Ok(())
}

/// Parse a command-line value: JSON if it parses, a string otherwise.
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()))
}

/// Wait for Ctrl-C.
pub async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub fn core_err(err: impl Into<CoreError>) -> CliError {
    CliError::from(err.into())
}
