//! Daemon-related errors.

use thiserror::Error;

use sentinel_config::ConfigError;
use sentinel_monitor::MonitorError;

/// Errors that can occur while starting or running the monitor.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration could not be loaded or was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to set up signal handlers.
    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),

    /// Invalid daemon state transition.
    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: DaemonState, to: DaemonState },

    /// A monitor component failed to start.
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            DaemonError::Config(_) | DaemonError::Monitor(MonitorError::InvalidConfig(_)) => 2,
            _ => 1,
        }
    }
}

/// Daemon state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DaemonState {
    /// Initial state.
    Stopped = 0,
    /// Starting up.
    Starting = 1,
    /// Running normally.
    Running = 2,
    /// Shutting down.
    ShuttingDown = 3,
}

impl From<u8> for DaemonState {
    fn from(v: u8) -> Self {
        match v {
            1 => DaemonState::Starting,
            2 => DaemonState::Running,
            3 => DaemonState::ShuttingDown,
            _ => DaemonState::Stopped,
        }
    }
}

impl std::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonState::Stopped => write!(f, "stopped"),
            DaemonState::Starting => write!(f, "starting"),
            DaemonState::Running => write!(f, "running"),
            DaemonState::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_exit_code() {
        let err: DaemonError = ConfigError::Rejected("mail/chat: missing".to_string()).into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("mail/chat"));
    }

    #[test]
    fn test_invalid_channel_config_exit_code() {
        let err: DaemonError = MonitorError::InvalidConfig("bad relay".to_string()).into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_other_errors_exit_code() {
        let err = DaemonError::SignalSetup("denied".to_string());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_daemon_state_display() {
        assert_eq!(DaemonState::Stopped.to_string(), "stopped");
        assert_eq!(DaemonState::Starting.to_string(), "starting");
        assert_eq!(DaemonState::Running.to_string(), "running");
        assert_eq!(DaemonState::ShuttingDown.to_string(), "shutting_down");
    }

    #[test]
    fn test_daemon_state_from_u8() {
        assert_eq!(DaemonState::from(DaemonState::Running as u8), DaemonState::Running);
        assert_eq!(DaemonState::from(42), DaemonState::Stopped);
    }

    #[test]
    fn test_invalid_state_transition() {
        let err = DaemonError::InvalidStateTransition {
            from: DaemonState::Running,
            to: DaemonState::Starting,
        };
        let msg = err.to_string();
        assert!(msg.contains("Running"));
        assert!(msg.contains("Starting"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let daemon_err: DaemonError = io_err.into();
        assert!(daemon_err.to_string().contains("file not found"));
    }
}
