//! Error types used by the orchestration machine and module instances.
//!
//! Two enums cover the taxonomy:
//!
//! - [`WallError`] — failures that reach the state machine: a module that
//!   could not be loaded, a session that could not be opened, or a module
//!   hook that failed. All of them are recoverable at the machine level:
//!   the machine quiesces the affected region instead of crashing.
//! - [`TeardownError`] — best-effort resource release failures (network
//!   channel or state scope refusing to close). Logged, never propagated;
//!   a stuck external session is the transport's concern.
//!
//! A preparation timeout is deliberately **not** an error: it is a designed
//! fallback that forces progress, reported as
//! [`EventKind::PreparationTimeout`](crate::events::EventKind).

use thiserror::Error;

/// # Failures surfaced to the orchestration machine.
///
/// Every variant is caught at the state boundary that invoked the failing
/// operation, converted into a disposal of the failing instance, and either
/// absorbed locally or escalated to the `Error` sink state. Nothing unwinds
/// past the machine.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum WallError {
    /// Module code failed to load or lacked a required load entry point.
    #[error("module '{module}' failed to load: {reason}")]
    Load {
        /// Name of the module that failed to load.
        module: String,
        /// Underlying failure description.
        reason: String,
    },

    /// Opening the network channel or state scope for an instance failed.
    #[error("failed to open session '{key}': {reason}")]
    Session {
        /// The instance key the session was addressed by.
        key: String,
        /// Underlying failure description.
        reason: String,
    },

    /// A module's own lifecycle hook threw.
    #[error("module '{module}' hook '{hook}' failed: {reason}")]
    Behavior {
        /// Name of the offending module.
        module: String,
        /// The lifecycle hook that failed.
        hook: &'static str,
        /// Underlying failure description.
        reason: String,
    },
}

impl WallError {
    /// Shorthand for a load failure.
    pub fn load(module: impl Into<String>, reason: impl Into<String>) -> Self {
        WallError::Load {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a behavior hook failure.
    pub fn behavior(
        module: impl Into<String>,
        hook: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        WallError::Behavior {
            module: module.into(),
            hook,
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            WallError::Load { .. } => "module_load_failed",
            WallError::Session { .. } => "session_open_failed",
            WallError::Behavior { .. } => "behavior_hook_failed",
        }
    }
}

/// # Failures while releasing an instance's external resources.
///
/// Produced by [`NetworkChannel::close`](crate::net::NetworkChannel) and
/// [`StateScope::close`](crate::net::StateScope). Disposal logs these and
/// carries on; they never block a state transition.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TeardownError {
    /// The network channel refused to close.
    #[error("failed to close network channel '{key}': {reason}")]
    Channel { key: String, reason: String },

    /// The shared-state scope refused to close.
    #[error("failed to close state scope '{key}': {reason}")]
    Scope { key: String, reason: String },
}

impl TeardownError {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TeardownError::Channel { .. } => "channel_close_failed",
            TeardownError::Scope { .. } => "scope_close_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            WallError::load("clock", "missing").as_label(),
            "module_load_failed"
        );
        assert_eq!(
            WallError::behavior("clock", "will_be_shown_soon", "boom").as_label(),
            "behavior_hook_failed"
        );
        let td = TeardownError::Scope {
            key: "k".into(),
            reason: "stuck".into(),
        };
        assert_eq!(td.as_label(), "scope_close_failed");
    }

    #[test]
    fn display_includes_module_and_hook() {
        let err = WallError::behavior("clock", "begin_fade_in", "boom");
        let text = err.to_string();
        assert!(text.contains("clock"));
        assert!(text.contains("begin_fade_in"));
    }
}
