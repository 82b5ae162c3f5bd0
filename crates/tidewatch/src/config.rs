//! CLI configuration: thin wrapper around `tidewatch_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--auth-center, --data-center, etc.).

use std::time::Duration;

use tidewatch_core::{ConsoleConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use tidewatch_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config, session_path,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build the `ConsoleConfig` for this invocation.
///
/// CLI flags override profile values. Without a profile, both service
/// URLs must come from flags or the environment.
pub fn resolve_console_config(
    global: &GlobalOpts,
    cfg: &Config,
    profile_name: &str,
) -> Result<ConsoleConfig, CliError> {
    let mut console = if let Some(profile) = cfg.profiles.get(profile_name) {
        tidewatch_config::profile_to_console_config(profile, profile_name, &cfg.defaults)?
    } else {
        let (Some(auth), Some(data)) = (global.auth_center.as_deref(), global.data_center.as_deref())
        else {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        };
        let mut console = ConsoleConfig::new(
            parse_url("auth-center", auth)?,
            parse_url("data-center", data)?,
        );
        console.page_size = cfg.defaults.page_size;
        console
    };

    // 1. Service URLs (flag > env > profile)
    if let Some(ref auth) = global.auth_center {
        console.auth_center_url = parse_url("auth-center", auth)?;
    }
    if let Some(ref data) = global.data_center {
        console.data_center_url = parse_url("data-center", data)?;
    }

    // 2. TLS verification
    if global.insecure {
        console.tls = TlsVerification::DangerAcceptInvalid;
    }

    // 3. Timeout
    console.timeout = Duration::from_secs(global.timeout);

    Ok(console)
}
