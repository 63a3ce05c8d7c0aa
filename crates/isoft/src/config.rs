//! CLI configuration: thin wrapper around `isoft_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --port, --username, --timeout, --url).

use isoft_core::DeviceConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use isoft_config::{Config, Profile, config_path, load_config, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Build a `DeviceConfig` from the config file, profile, and CLI overrides.
///
/// Without a stored profile, `--host` (or `--url`) plus credentials from
/// the environment are enough.
pub fn build_device_config(global: &GlobalOpts) -> Result<DeviceConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.host.is_some() || global.url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global);
    let mut device = isoft_config::profile_to_device_config(&profile, &profile_name, &cfg.defaults)?;
    device.base_url.clone_from(&global.url);
    Ok(device)
}

/// Flags take priority over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(host) = global
        .url
        .as_ref()
        .and_then(url::Url::host_str)
        .filter(|_| profile.host.trim().is_empty())
    {
        profile.host = host.to_owned();
    }
    if let Some(port) = global.port {
        profile.port = Some(port);
    }
    if let Some(ref user) = global.username {
        profile.username = Some(user.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}
