//! Error Taxonomy
//!
//! Failures in the runtime fall into a small number of categories:
//!
//! 1. User getter/callback failures. A user-registered watch whose getter or
//!    callback fails must not abort the batch it runs in. These errors are
//!    routed to the process-wide error hook and the watch simply produces no
//!    new value that pass.
//!
//! 2. Framework-internal evaluation failures. An error inside a non-user
//!    computation (for example the one driving tree reconciliation) is fatal
//!    to that pass and propagates to the caller.
//!
//! 3. Hydration mismatches. Structural incompatibility between a virtual
//!    tree and an existing host tree is recovered locally: the caller falls
//!    back to full reconciliation from an empty tree.
//!
//! Programmer-misuse diagnostics (duplicate sibling keys, unknown element
//! kinds) are not errors at all; they are warnings emitted through `tracing`
//! and execution continues with best-effort behavior.
//!
//! # The error hook
//!
//! User-watch failures are reported through a single process-wide hook
//! rather than propagated, so an embedding application can surface them in
//! its own way (dev overlay, crash reporting, ...). The default hook logs
//! through `tracing::error!`.

use parking_lot::RwLock;

/// Errors produced by the reactive and reconciliation engines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A computation's getter or callback failed.
    ///
    /// For user watches this is reported through the error hook; for
    /// internal computations it propagates to the caller.
    #[error("evaluation of {context} failed: {source}")]
    Evaluation {
        /// Human-readable description of the failing computation.
        context: String,
        #[source]
        source: Box<dyn std::error::Error>,
    },

    /// A virtual tree could not be matched against an existing host tree.
    #[error("hydration mismatch at {expected}: found {found}")]
    HydrationMismatch {
        /// Description of the expected node.
        expected: String,
        /// Description of the host node actually present.
        found: String,
    },

    /// Catch-all for failures raised inside user-provided closures.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Convenience constructor for ad-hoc user errors.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Message(message.into())
    }
}

/// The error hook signature: `(error, context)` where `context` describes
/// where the error surfaced (e.g. `callback for watcher "price"`).
pub type ErrorHook = Box<dyn Fn(&Error, &str) + Send + Sync>;

static ERROR_HOOK: RwLock<Option<ErrorHook>> = RwLock::new(None);

/// Install a process-wide hook for user-watch failures.
///
/// Replaces any previously installed hook.
pub fn set_error_hook(hook: ErrorHook) {
    *ERROR_HOOK.write() = Some(hook);
}

/// Remove the installed hook, restoring the default (`tracing::error!`).
pub fn clear_error_hook() {
    *ERROR_HOOK.write() = None;
}

/// Report a user-level failure without propagating it.
///
/// Called by computations for `user`-flagged getters and callbacks, and by
/// the batch scheduler for task errors.
pub fn report(error: &Error, context: &str) {
    let hook = ERROR_HOOK.read();
    match &*hook {
        Some(hook) => hook(error, context),
        None => tracing::error!(context, %error, "unhandled error in {context}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn report_routes_through_installed_hook() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        // Other tests may report concurrently; count only our own context.
        set_error_hook(Box::new(move |_error, context| {
            if context == "test context" {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }
        }));

        report(&Error::msg("boom"), "test context");
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        clear_error_hook();
    }

    #[test]
    fn error_display_includes_context() {
        let err = Error::Evaluation {
            context: "watcher \"price\"".into(),
            source: Box::new(Error::msg("division by zero")),
        };
        let text = err.to_string();
        assert!(text.contains("watcher \"price\""));
    }
}
