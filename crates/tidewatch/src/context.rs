//! Per-invocation console context.
//!
//! Builds the `Console` for the active profile, restores the saved
//! session, and writes it back after the command so refreshed tokens
//! survive between runs.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use tracing::{debug, warn};

use tidewatch_core::{Console, Notice, Notifier, SessionStore};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

/// Prints pager notices to stderr and remembers failures so the command
/// can exit non-zero.
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    color: bool,
    quiet: bool,
    failed: AtomicBool,
}

impl TerminalNotifier {
    pub fn new(color: bool, quiet: bool) -> Self {
        Self {
            color,
            quiet,
            failed: AtomicBool::new(false),
        }
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(message) => debug!(%message, "query succeeded"),
            Notice::Warning(message) => {
                if !self.quiet {
                    if self.color {
                        eprintln!("{} {message}", "warning:".yellow());
                    } else {
                        eprintln!("warning: {message}");
                    }
                }
            }
            Notice::Error(message) => {
                self.failed.store(true, Ordering::SeqCst);
                if self.color {
                    eprintln!("{} {message}", "error:".red());
                } else {
                    eprintln!("error: {message}");
                }
            }
        }
    }
}

pub struct Context {
    pub console: Console,
    pub profile_name: String,
    pub notifier: Arc<TerminalNotifier>,
    pub color: bool,
    session_path: PathBuf,
}

impl Context {
    /// Resolve configuration and restore any saved session.
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = config::load_config_or_default();
        let profile_name = config::active_profile_name(global, &cfg);
        let console_config = config::resolve_console_config(global, &cfg, &profile_name)?;

        let session = Arc::new(SessionStore::new());
        let session_path = config::session_path(&profile_name);
        match tidewatch_config::load_session(&session_path) {
            Ok(Some(saved)) => {
                debug!(path = %session_path.display(), "restored saved session");
                session.restore(saved);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable session file"),
        }

        let color = output::should_color(&global.color);
        let notifier = Arc::new(TerminalNotifier::new(color, global.quiet));
        let console = Console::with_parts(console_config, session, notifier.clone())?;

        Ok(Self {
            console,
            profile_name,
            notifier,
            color,
            session_path,
        })
    }

    /// Save the current session, or delete the file once signed out.
    pub fn persist(&self) -> Result<(), CliError> {
        match self.console.session().to_file() {
            Some(file) => tidewatch_config::save_session(&self.session_path, &file)?,
            None => tidewatch_config::remove_session(&self.session_path)?,
        }
        Ok(())
    }

    /// Fail the command if any pager reported an error.
    pub fn check_notices(&self) -> Result<(), CliError> {
        if self.notifier.failed() {
            return Err(CliError::ApiError {
                code: "query".into(),
                message: "one or more telemetry queries failed".into(),
            });
        }
        Ok(())
    }

    pub fn not_signed_in(&self) -> CliError {
        CliError::NotSignedIn {
            profile: self.profile_name.clone(),
        }
    }
}
