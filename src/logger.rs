// src/logger.rs

//! Resolution progress reporting
//!
//! The `ResolutionLogger` trait is the progress surface the orchestrator
//! drives: `init()` before the engine runs, `stop()` after, regardless of
//! success or failure, with per-fetch hooks in between. Implementations
//! cover interactive use (spinner), logging, and silence.

use crate::module::Module;
use crate::version::Version;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// Progress hooks around a resolution run
///
/// Implementations must be thread-safe: fetch hooks fire from concurrent
/// metadata downloads.
pub trait ResolutionLogger: Send + Sync {
    /// Called once before the engine first runs
    fn init(&self) {}

    /// Called once after resolution ends, on success and on failure
    fn stop(&self) {}

    /// A metadata fetch is starting
    fn fetching(&self, _module: &Module, _version: &Version) {}

    /// A metadata fetch finished
    fn fetched(&self, _module: &Module, _version: &Version) {}
}

/// No-op logger for scripted or embedded use
#[derive(Debug, Default)]
pub struct SilentLogger;

impl ResolutionLogger for SilentLogger {}

/// Logs resolution progress through tracing
#[derive(Debug, Default)]
pub struct TraceLogger {
    fetches: AtomicU64,
}

impl TraceLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResolutionLogger for TraceLogger {
    fn init(&self) {
        info!("resolution started");
    }

    fn stop(&self) {
        info!("resolution finished after {} fetches", self.fetches.load(Ordering::Relaxed));
    }

    fn fetching(&self, module: &Module, version: &Version) {
        debug!("fetching {} {}", module, version);
    }

    fn fetched(&self, module: &Module, version: &Version) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!("fetched {} {}", module, version);
    }
}

/// Interactive spinner for terminal use
#[derive(Default)]
pub struct SpinnerLogger {
    bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResolutionLogger for SpinnerLogger {
    fn init(&self) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("resolving dependencies");
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn stop(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn fetching(&self, module: &Module, version: &Version) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_message(format!("fetching {module} {version}"));
            }
        }
    }
}
