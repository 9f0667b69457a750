//! Connector lifecycle state machine.
//!
//! ```text
//! Uninitialized ──► Initializing ──► Connected ──► Disconnected
//!       ▲               │               │              │
//!       │               ▼               ▼              │
//!       │             Error ◄───────────┘              │
//!       │               │                              │
//!       │               └──────► Initializing ◄────────┘
//!  any state ──► Disposed (terminal)
//! ```

use std::{
    fmt,
    sync::Mutex,
    time::{Duration, Instant},
};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::error::{ConnectorError, ConnectorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorState {
    Uninitialized,
    Initializing,
    Connected,
    Disconnected,
    Error,
    Disposed,
}

impl ConnectorState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initializing => "Initializing",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Error => "Error",
            Self::Disposed => "Disposed",
        }
    }

    /// States from which `initialize` may start.
    #[must_use]
    pub fn can_initialize(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Disconnected | Self::Error)
    }

    #[must_use]
    pub fn can_transition_to(&self, next: ConnectorState) -> bool {
        use ConnectorState::*;
        match (self, next) {
            (Disposed, _) => false,
            (_, Disposed) => true,
            (Uninitialized | Disconnected | Error, Initializing) => true,
            (Initializing, Connected | Error) => true,
            (Connected, Disconnected | Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the lifecycle record.
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    pub state: ConnectorState,
    pub changed_at: DateTime<Utc>,
    pub connected_since: Option<Instant>,
    pub last_error: Option<String>,
}

impl Lifecycle {
    pub fn uptime(&self) -> Option<Duration> {
        self.connected_since.map(|since| since.elapsed())
    }
}

/// Lifecycle record behind a mutex. Every transition is a compare-and-set
/// under the lock, so two callers can never both win the same transition.
/// The lock is never held across an await point.
#[derive(Debug)]
pub(crate) struct StateCell {
    inner: Mutex<Lifecycle>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Lifecycle {
                state: ConnectorState::Uninitialized,
                changed_at: Utc::now(),
                connected_since: None,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> ConnectorState {
        self.lock().state
    }

    pub fn snapshot(&self) -> Lifecycle {
        self.lock().clone()
    }

    /// Move from `from` to `to` if the current state is still `from`.
    /// Returns the state actually observed on failure.
    pub fn compare_and_set(
        &self,
        from: ConnectorState,
        to: ConnectorState,
    ) -> Result<(), ConnectorState> {
        let mut record = self.lock();
        if record.state != from || !from.can_transition_to(to) {
            return Err(record.state);
        }
        record.state = to;
        record.changed_at = Utc::now();
        match to {
            ConnectorState::Connected => {
                record.connected_since = Some(Instant::now());
                record.last_error = None;
            },
            ConnectorState::Initializing => {},
            _ => record.connected_since = None,
        }
        Ok(())
    }

    /// Claim the `Initializing` state. Only one concurrent caller wins.
    pub fn begin_initialize(&self) -> ConnectorResult<ConnectorState> {
        let mut record = self.lock();
        let current = record.state;
        match current {
            ConnectorState::Disposed => Err(ConnectorError::disposed("initialize")),
            state if state.can_initialize() => {
                record.state = ConnectorState::Initializing;
                record.changed_at = Utc::now();
                Ok(current)
            },
            state => Err(ConnectorError::invalid_state("initialize", state)),
        }
    }

    /// Move to `Error` from `from`, recording why. A concurrent dispose wins.
    pub fn fail(&self, from: ConnectorState, reason: impl Into<String>) {
        let mut record = self.lock();
        record.last_error = Some(reason.into());
        if record.state == from && from.can_transition_to(ConnectorState::Error) {
            record.state = ConnectorState::Error;
            record.changed_at = Utc::now();
            record.connected_since = None;
        }
    }

    pub fn record_error(&self, reason: impl Into<String>) {
        self.lock().last_error = Some(reason.into());
    }

    /// Enter the terminal state, returning the previous one.
    pub fn dispose(&self) -> ConnectorState {
        let mut record = self.lock();
        let previous = record.state;
        if previous != ConnectorState::Disposed {
            record.state = ConnectorState::Disposed;
            record.changed_at = Utc::now();
            record.connected_since = None;
        }
        previous
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::error::ErrorCode, rstest::rstest};

    #[rstest]
    #[case(ConnectorState::Uninitialized, ConnectorState::Initializing, true)]
    #[case(ConnectorState::Initializing, ConnectorState::Connected, true)]
    #[case(ConnectorState::Initializing, ConnectorState::Error, true)]
    #[case(ConnectorState::Connected, ConnectorState::Disconnected, true)]
    #[case(ConnectorState::Connected, ConnectorState::Error, true)]
    #[case(ConnectorState::Disconnected, ConnectorState::Initializing, true)]
    #[case(ConnectorState::Error, ConnectorState::Initializing, true)]
    #[case(ConnectorState::Connected, ConnectorState::Disposed, true)]
    #[case(ConnectorState::Uninitialized, ConnectorState::Connected, false)]
    #[case(ConnectorState::Connected, ConnectorState::Initializing, false)]
    #[case(ConnectorState::Disconnected, ConnectorState::Connected, false)]
    #[case(ConnectorState::Disposed, ConnectorState::Initializing, false)]
    #[case(ConnectorState::Disposed, ConnectorState::Disposed, false)]
    fn transitions(
        #[case] from: ConnectorState,
        #[case] to: ConnectorState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn only_one_initializer_wins() {
        let cell = StateCell::new();
        assert_eq!(cell.begin_initialize().unwrap(), ConnectorState::Uninitialized);
        let err = cell.begin_initialize().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
        assert_eq!(cell.current(), ConnectorState::Initializing);
    }

    #[test]
    fn compare_and_set_reports_observed_state() {
        let cell = StateCell::new();
        assert_eq!(
            cell.compare_and_set(ConnectorState::Connected, ConnectorState::Disconnected),
            Err(ConnectorState::Uninitialized)
        );
        cell.begin_initialize().unwrap();
        cell.compare_and_set(ConnectorState::Initializing, ConnectorState::Connected)
            .unwrap();
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.state, ConnectorState::Connected);
        assert!(snapshot.uptime().is_some());
    }

    #[test]
    fn dispose_is_terminal() {
        let cell = StateCell::new();
        assert_eq!(cell.dispose(), ConnectorState::Uninitialized);
        assert_eq!(cell.dispose(), ConnectorState::Disposed);
        let err = cell.begin_initialize().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Disposed);
        cell.fail(ConnectorState::Disposed, "late failure");
        assert_eq!(cell.current(), ConnectorState::Disposed);
    }

    #[test]
    fn failure_records_reason() {
        let cell = StateCell::new();
        cell.begin_initialize().unwrap();
        cell.fail(ConnectorState::Initializing, "handshake refused");
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.state, ConnectorState::Error);
        assert_eq!(snapshot.last_error.as_deref(), Some("handshake refused"));
    }
}
