//! Runtime control of the operator's own log verbosity.
//!
//! `spec.operatorLogLevel` on the operator resource is mapped to an
//! [`EnvFilter`] and swapped into the running subscriber through a reload
//! handle, so changing the level needs no restart.

use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::{EnvFilter, Registry, reload};

use crate::crd::LogLevel;

/// Filter directives for an operator log level.
pub fn filter_directives(level: Option<LogLevel>) -> &'static str {
    match level {
        Some(LogLevel::Debug) => "info,lws_operator=debug",
        Some(LogLevel::Trace) => "info,lws_operator=trace,kube=debug",
        Some(LogLevel::TraceAll) => "trace",
        Some(LogLevel::Normal) | None => "info",
    }
}

/// Applies `operatorLogLevel` changes to the tracing subscriber.
pub struct LogLevelController<S = Registry> {
    handle: reload::Handle<EnvFilter, S>,
    current: Mutex<Option<LogLevel>>,
}

impl<S> LogLevelController<S>
where
    S: tracing::Subscriber + 'static,
{
    /// Wrap a reload handle whose filter currently reflects `initial`.
    pub fn new(handle: reload::Handle<EnvFilter, S>, initial: Option<LogLevel>) -> Self {
        Self {
            handle,
            current: Mutex::new(Some(initial.unwrap_or_default())),
        }
    }

    /// Switch to `level` if it differs from the active one.
    ///
    /// Returns true when the filter was replaced.
    pub fn apply(&self, level: Option<LogLevel>) -> bool {
        let level = Some(level.unwrap_or_default());
        let Ok(mut current) = self.current.lock() else {
            return false;
        };
        if *current == level {
            return false;
        }

        match self.handle.reload(EnvFilter::new(filter_directives(level))) {
            Ok(()) => {
                info!(
                    from = ?current.unwrap_or_default(),
                    to = ?level.unwrap_or_default(),
                    "Changed operator log level"
                );
                *current = level;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to reload log filter");
                false
            }
        }
    }

    /// Log level currently in effect.
    pub fn current(&self) -> LogLevel {
        self.current
            .lock()
            .ok()
            .and_then(|c| *c)
            .unwrap_or_default()
    }
}
