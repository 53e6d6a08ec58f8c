//! Reconnect-tolerant monitor loop.
//!
//! The K380 forgets its function-key mode whenever it re-pairs or wakes, so
//! monitor mode re-opens the keyboard every interval and rewrites the
//! configured mode. A write that fails is simply retried on the next cycle.

use crate::applier::send_configuration;
use crate::clock::Clock;
use crate::device::FnKeysMode;
use crate::locator::Locator;
use crate::transport::HidOpener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Time between polling cycles.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long without a successful write before status lines are emitted.
pub const STATUS_AFTER: Duration = Duration::from_secs(60);

/// Monitor timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub status_after: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            status_after: STATUS_AFTER,
        }
    }
}

/// Keyboard presence as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unknown,
    Connected,
    Disconnected,
}

/// Periodic liveness line for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Connected, but no write has succeeded recently.
    Stale { since_success: Option<Duration> },
    /// Not connected.
    Waiting,
}

/// What happened during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// New state, if presence changed this cycle.
    pub transition: Option<ConnectionState>,
    /// Write outcome, if the keyboard was found.
    pub applied: Option<bool>,
    pub status: Option<Status>,
}

/// Monitor loop state.
pub struct Monitor<O, C> {
    locator: Locator<O>,
    clock: C,
    mode: FnKeysMode,
    config: MonitorConfig,
    state: ConnectionState,
    last_success: Option<Instant>,
}

impl<O: HidOpener, C: Clock> Monitor<O, C> {
    pub fn new(locator: Locator<O>, clock: C, mode: FnKeysMode) -> Self {
        Self::with_config(locator, clock, mode, MonitorConfig::default())
    }

    pub fn with_config(
        locator: Locator<O>,
        clock: C,
        mode: FnKeysMode,
        config: MonitorConfig,
    ) -> Self {
        Self {
            locator,
            clock,
            mode,
            config,
            state: ConnectionState::Unknown,
            last_success: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }

    /// Run cycles until `running` is cleared.
    ///
    /// The flag is checked before each cycle, so a cycle that has started
    /// always finishes, including its sleep.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            mode = self.mode.label(),
            interval_secs = self.config.interval.as_secs(),
            "Starting K380 monitoring mode"
        );

        while running.load(Ordering::Relaxed) {
            self.poll();
            self.clock.sleep(self.config.interval);
        }

        info!("Monitoring stopped");
    }

    /// One cycle without the trailing sleep.
    pub fn poll(&mut self) -> CycleReport {
        let mut report = CycleReport {
            transition: None,
            applied: None,
            status: None,
        };

        match self.locator.locate() {
            Some(mut handle) => {
                if self.state != ConnectionState::Connected {
                    info!(mode = self.mode.label(), "K380 connected, applying settings");
                    self.state = ConnectionState::Connected;
                    report.transition = Some(ConnectionState::Connected);
                }

                let ok = match send_configuration(&mut handle, self.mode) {
                    Ok(()) => {
                        self.last_success = Some(self.clock.now());
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "Write failed, retrying next cycle");
                        false
                    }
                };
                report.applied = Some(ok);
            }
            None => {
                if self.state != ConnectionState::Disconnected {
                    info!("K380 disconnected, waiting for reconnection");
                    self.state = ConnectionState::Disconnected;
                    report.transition = Some(ConnectionState::Disconnected);
                }
            }
        }

        report.status = self.status();
        match report.status {
            Some(Status::Stale {
                since_success: Some(since),
            }) => info!(
                last_success_secs = since.as_secs(),
                "Status: device connected, last successful config {}s ago",
                since.as_secs()
            ),
            Some(Status::Stale {
                since_success: None,
            }) => info!("Status: device connected, no successful config yet"),
            Some(Status::Waiting) => info!("Status: waiting for K380 connection"),
            None => {}
        }

        report
    }

    fn status(&self) -> Option<Status> {
        let since_success = self
            .last_success
            .map(|t| self.clock.now().saturating_duration_since(t));
        if matches!(since_success, Some(since) if since <= self.config.status_after) {
            return None;
        }

        match self.state {
            ConnectionState::Connected => Some(Status::Stale { since_success }),
            _ => Some(Status::Waiting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fake::FakeClock;
    use crate::transport::mock::{MockOpener, MockStep, WriteOutcome};
    use std::sync::Arc;

    const PRESENT: MockStep = MockStep::Present(WriteOutcome::Full);

    fn monitor(mock: &MockOpener, clock: &FakeClock) -> Monitor<MockOpener, FakeClock> {
        Monitor::new(Locator::new(mock.clone()), clock.clone(), FnKeysMode::On)
    }

    #[test]
    fn first_cycle_always_reports_transition() {
        let clock = FakeClock::new();
        let mut present = monitor(&MockOpener::always(PRESENT), &clock);
        assert_eq!(present.poll().transition, Some(ConnectionState::Connected));

        let mut absent = monitor(&MockOpener::always(MockStep::Absent), &clock);
        assert_eq!(
            absent.poll().transition,
            Some(ConnectionState::Disconnected)
        );
    }

    #[test]
    fn transitions_only_on_presence_change() {
        let mock = MockOpener::new([
            PRESENT,
            PRESENT,
            MockStep::Absent,
            MockStep::Absent,
            PRESENT,
            MockStep::Absent,
        ]);
        let clock = FakeClock::new();
        let mut m = monitor(&mock, &clock);

        let transitions: Vec<_> = (0..6).map(|_| m.poll().transition).collect();
        assert_eq!(
            transitions,
            vec![
                Some(ConnectionState::Connected),
                None,
                Some(ConnectionState::Disconnected),
                None,
                Some(ConnectionState::Connected),
                Some(ConnectionState::Disconnected),
            ]
        );
    }

    #[test]
    fn writes_every_connected_cycle_and_releases_handle() {
        let mock = MockOpener::always(PRESENT);
        let clock = FakeClock::new();
        let mut m = monitor(&mock, &clock);
        for _ in 0..3 {
            assert_eq!(m.poll().applied, Some(true));
        }
        assert_eq!(mock.writes().len(), 3);
        assert_eq!(mock.opened(), 3);
        assert_eq!(mock.closed(), 3);
        assert_eq!(m.last_success(), Some(clock.now()));
    }

    #[test]
    fn failed_write_is_not_retried_within_cycle() {
        let mock = MockOpener::always(MockStep::Present(WriteOutcome::Partial(3)));
        let clock = FakeClock::new();
        let mut m = monitor(&mock, &clock);
        let report = m.poll();
        assert_eq!(report.applied, Some(false));
        assert_eq!(mock.writes().len(), 1);
        assert_eq!(m.last_success(), None);
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn status_waits_until_success_is_stale() {
        let mock = MockOpener::always(PRESENT);
        let clock = FakeClock::new();
        let mut m = monitor(&mock, &clock);
        assert_eq!(m.poll().status, None);

        // Keyboard goes quiet: writes keep failing while it stays open.
        let stale = MockOpener::always(MockStep::Present(WriteOutcome::Fail));
        let mut m2 = Monitor::new(Locator::new(stale), clock.clone(), FnKeysMode::On);
        m2.last_success = m.last_success();
        clock.sleep(Duration::from_secs(60));
        assert_eq!(m2.poll().status, None);
        clock.sleep(Duration::from_secs(5));
        assert_eq!(
            m2.poll().status,
            Some(Status::Stale {
                since_success: Some(Duration::from_secs(65))
            })
        );
    }

    #[test]
    fn status_reports_waiting_when_never_connected() {
        let clock = FakeClock::new();
        let mut m = monitor(&MockOpener::always(MockStep::Absent), &clock);
        assert_eq!(m.poll().status, Some(Status::Waiting));
        assert_eq!(m.poll().status, Some(Status::Waiting));
    }

    #[test]
    fn run_does_nothing_when_already_cancelled() {
        let mock = MockOpener::always(PRESENT);
        let clock = FakeClock::new();
        let running = AtomicBool::new(false);
        monitor(&mock, &clock).run(&running);
        assert_eq!(mock.open_calls(), 0);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn cancellation_during_sleep_finishes_cycle_then_stops() {
        let mock = MockOpener::always(PRESENT);
        let clock = FakeClock::new();
        let running = Arc::new(AtomicBool::new(true));
        clock.cancel_during_sleep(3, Arc::clone(&running));

        monitor(&mock, &clock).run(&running);

        assert_eq!(mock.open_calls(), 3);
        assert_eq!(mock.writes().len(), 3);
        assert_eq!(mock.closed(), 3);
        assert_eq!(clock.sleeps(), vec![POLL_INTERVAL; 3]);
    }
}
