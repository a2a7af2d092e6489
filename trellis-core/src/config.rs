//! Runtime Configuration
//!
//! Process-wide settings that change how notifications fire and how loudly
//! the runtime complains about misuse. Stored behind a lock so embedders can
//! flip them at startup or from tests; the hot paths take a read lock once
//! per notification batch, not per subscriber.

use parking_lot::RwLock;

/// Global runtime configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// When `true` (the default), cell notifications hand recomputation to
    /// the scheduler installed on each computation, which owns ordering.
    ///
    /// When `false` the runtime is in synchronous mode: a cell sorts its
    /// subscriber snapshot by computation id before firing, guaranteeing
    /// deterministic creation-order delivery without a scheduler.
    pub batched_notify: bool,

    /// Gates programmer-misuse warnings (duplicate sibling keys, unknown
    /// element kinds, hydration bailout diagnostics).
    pub dev_warnings: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batched_notify: true,
            dev_warnings: true,
        }
    }
}

static CONFIG: RwLock<Config> = RwLock::new(Config {
    batched_notify: true,
    dev_warnings: true,
});

/// Read the current configuration.
pub fn get() -> Config {
    *CONFIG.read()
}

/// Replace the configuration wholesale.
pub fn set(config: Config) {
    *CONFIG.write() = config;
}

/// Toggle synchronous (unbatched) notification mode.
pub fn set_batched_notify(batched: bool) {
    CONFIG.write().batched_notify = batched;
}

/// Toggle misuse warnings.
pub fn set_dev_warnings(enabled: bool) {
    CONFIG.write().dev_warnings = enabled;
}
