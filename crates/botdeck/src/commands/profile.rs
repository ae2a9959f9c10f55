//! Profile subcommand handlers. Local only; never contacts a server.

use crate::cli::{GlobalOpts, ProfileArgs, ProfileCommand};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output::{self, Painter};

pub fn handle(args: ProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let paint = Painter::new(global.color);

    match args.command {
        ProfileCommand::Show { name } => {
            let cfg = config::load_config()?;
            let name = name.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            let profile = cfg.profile(&name)?;
            let out = output::render_single(
                global.output,
                profile,
                |p| {
                    let body = toml::to_string_pretty(p).unwrap_or_default();
                    format!("# profile '{name}'\n{body}")
                },
                |p| p.url.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProfileCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        ProfileCommand::Add { name, url, default } => {
            url.parse::<url::Url>().map_err(|e| CliError::Validation {
                field: "url".into(),
                reason: format!("invalid URL {url}: {e}"),
            })?;

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(name.clone(), Profile::new(url));
            if default || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("{} Profile '{name}' saved", paint.good("✓"));
            }
            Ok(())
        }

        ProfileCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            cfg.profile(&name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("{} Default profile set to '{name}'", paint.good("✓"));
            }
            Ok(())
        }
    }
}
