//! CLI configuration -- thin wrapper around `botdeck_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--url,
//! --insecure, --timeout).

use std::time::Duration;

use botdeck_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use botdeck_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the runtime config: profile values, then flag overrides.
///
/// Without a matching profile, `--url` alone is enough. An explicitly
/// requested profile that does not exist is an error.
pub fn resolve_dashboard_config(global: &GlobalOpts) -> Result<DashboardConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly requested profile must exist.
        None if global.profile.is_some() && global.url.is_none() => {
            cfg.profile(&profile_name)?.clone()
        }
        None => Profile::default(),
    };

    // Flag > env > profile
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if profile.url.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    if global.insecure {
        profile.insecure = Some(true);
    }

    let mut config = botdeck_config::profile_to_dashboard_config(&profile, &cfg.defaults)?;
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}
