//! Plugin Fault Reporting
//!
//! Every call into third-party plugin code is wrapped by [`guarded_call`]:
//! error returns and panics are both converted into a report against the
//! host's error surface plus an absent outcome, so a misbehaving plugin can
//! never unwind through orchestration logic.
//!
//! The error surface itself is the [`FaultReporter`] trait. The default
//! [`LogReporter`] emits a `tracing` event and appends to a persistent
//! error-log file.

use std::any::Any;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use chrono::Local;
use tabweave_core::{CoreError, CoreResult};
use tracing::error;

use crate::error::RuntimeResult;

/// Opaque handle of the host window a fault belongs to, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowId(pub u64);

// ============================================================================
// Fault Reporter
// ============================================================================

/// The host's error surface for plugin and module faults.
///
/// One uniform entry point: the failed operation's error, the owning window
/// when known, the plugin identifier (or display name when no identifier
/// exists yet), and a short phase description such as `"loading plugin"`.
pub trait FaultReporter: Send + Sync {
    /// Report one contained fault.
    fn report(&self, error: &CoreError, window: Option<WindowId>, plugin: &str, phase: &str);
}

/// Default reporter: structured log event plus optional error-log file.
#[derive(Default)]
pub struct LogReporter {
    log: Option<ErrorLog>,
}

impl LogReporter {
    /// Reporter that only emits tracing events.
    pub fn new() -> Self {
        Self { log: None }
    }

    /// Reporter that also appends to the given error log.
    pub fn with_log(log: ErrorLog) -> Self {
        Self { log: Some(log) }
    }
}

impl FaultReporter for LogReporter {
    fn report(&self, error: &CoreError, window: Option<WindowId>, plugin: &str, phase: &str) {
        error!(plugin, phase, window = ?window, %error, "plugin fault");
        if let Some(log) = &self.log {
            if let Err(e) = log.append(plugin, phase, &error.to_string()) {
                error!(%e, "failed to append to plugin error log");
            }
        }
    }
}

// ============================================================================
// Error Log
// ============================================================================

/// Append-only error-log file with local timestamps.
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    /// Log writing to the given file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `~/.tabweave/plugin-errors.log`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".tabweave").join("plugin-errors.log"))
    }

    /// Append one entry. Creates the parent directory if needed.
    pub fn append(&self, plugin: &str, phase: &str, detail: &str) -> RuntimeResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{} [{}] {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            plugin,
            phase,
            detail
        )?;
        Ok(())
    }
}

// ============================================================================
// Guarded Calls
// ============================================================================

/// Run a fallible call into plugin code, containing both error returns and
/// panics. A fault is reported through `reporter` and yields `None`.
pub fn guarded_call<T>(
    reporter: &dyn FaultReporter,
    window: Option<WindowId>,
    plugin: &str,
    phase: &str,
    call: impl FnOnce() -> CoreResult<T>,
) -> Option<T> {
    // catch_unwind because plugin code may panic instead of returning an
    // error; panic = "unwind" is kept in the release profile for this.
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            reporter.report(&e, window, plugin, phase);
            None
        }
        Err(payload) => {
            let e = CoreError::internal(format!("panicked: {}", panic_message(payload)));
            reporter.report(&e, window, plugin, phase);
            None
        }
    }
}

/// Printable message from a panic payload.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic reason".to_string()
    }
}
