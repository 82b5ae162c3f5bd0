//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;

use tidewatch_api::data_center::models::{Device, DeviceModel};
use tidewatch_core::CoreError;

use crate::context::Context;
use crate::error::CliError;

/// Make sure the session is usable, refreshing the access token if needed.
pub async fn ready(ctx: &Context) -> Result<(), CliError> {
    match ctx.console.ensure_fresh().await {
        Ok(()) => Ok(()),
        Err(CoreError::NotAuthenticated) => Err(ctx.not_signed_in()),
        Err(e) => Err(e.into()),
    }
}

/// Resolve a model ID or model number via the cached catalog.
pub async fn resolve_model(ctx: &Context, key: &str) -> Result<Arc<DeviceModel>, CliError> {
    ctx.console.device_models(false).await?;
    ctx.console
        .catalog()
        .find_model(key)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "model".into(),
            identifier: key.into(),
            list_command: "models list".into(),
        })
}

/// Resolve a serial number or device ID via the cached catalog.
pub async fn resolve_device(ctx: &Context, key: &str) -> Result<Arc<Device>, CliError> {
    ctx.console.device_models(false).await?;
    let catalog = ctx.console.catalog();
    catalog
        .device_by_serial(key)
        .or_else(|| catalog.device(key))
        .ok_or_else(|| CliError::NotFound {
            resource_type: "device".into(),
            identifier: key.into(),
            list_command: "devices list".into(),
        })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON in {}: {e}", path.display()),
    })
}

/// Spinner on stderr for slow operations; hidden when not interactive.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
