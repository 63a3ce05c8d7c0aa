//! Config subcommand handlers.

use dialoguer::{Input, Select};

use isoft_config::{ConfigError, store_password};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn keyring_err(e: ConfigError) -> CliError {
    CliError::Validation {
        field: "keyring".into(),
        reason: format!("failed to store password in keyring: {e}"),
    }
}

/// Copy of `cfg` safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    cfg
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| Ok(toml::to_string_pretty(c)?),
                |c| {
                    let mut names: Vec<_> = c.profiles.keys().cloned().collect();
                    names.sort();
                    names.join("\n")
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            store_password(&profile_name, &secret).map_err(keyring_err)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }
    }
}

/// Interactive wizard writing a single profile.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("isoft configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let host: String = Input::new()
        .with_prompt("Softener IP address or host name")
        .interact_text()
        .map_err(prompt_err)?;

    let username: String = Input::new()
        .with_prompt("User name")
        .default("admin".into())
        .interact_text()
        .map_err(prompt_err)?;

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;

    if host.trim().is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "host and password cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store password in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let password_field = if store_selection == 0 {
        store_password(&profile_name, &password).map_err(keyring_err)?;
        eprintln!("   ✓ Password stored in system keyring");
        None
    } else {
        Some(password)
    };

    let profile = Profile {
        host: host.trim().to_owned(),
        username: Some(username),
        password: password_field,
        ..Profile::default()
    };

    // Keep any other profiles already on disk.
    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: isoft check");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_never_prints_plaintext_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                host: "192.168.0.50".into(),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("cellar".into(), Profile::default());

        let shown = redacted(&cfg);
        assert_eq!(shown.profiles["home"].password.as_deref(), Some(REDACTED));
        assert_eq!(shown.profiles["cellar"].password, None);
        assert_eq!(cfg.profiles["home"].password.as_deref(), Some("hunter2"));
    }
}
