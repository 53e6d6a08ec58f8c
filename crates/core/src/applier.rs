//! Applies a function-key mode with bounded retry.
//!
//! Both failure modes (keyboard absent, transient write error) are expected
//! to clear quickly, so retries use a fixed delay with no backoff.

use crate::clock::Clock;
use crate::device::FnKeysMode;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::transport::{HidHandle, HidOpener};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum apply attempts in one-shot mode.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Attempt cap and delay for [`Applier::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Write the report for `mode` once.
///
/// Succeeds only if the device accepted every byte.
pub fn send_configuration<H: HidHandle>(handle: &mut H, mode: FnKeysMode) -> Result<()> {
    let report = mode.report()?;
    let written = handle.write(&report)?;

    if written == report.len() {
        info!(mode = mode.label(), "Configuration sent successfully");
        Ok(())
    } else {
        warn!(
            written,
            expected = report.len(),
            "Partial write to keyboard"
        );
        Err(Error::ShortWrite {
            written,
            expected: report.len(),
        })
    }
}

/// One-shot setting applier.
pub struct Applier<O, C> {
    locator: Locator<O>,
    clock: C,
    policy: RetryPolicy,
}

impl<O: HidOpener, C: Clock> Applier<O, C> {
    pub fn new(locator: Locator<O>, clock: C) -> Self {
        Self::with_policy(locator, clock, RetryPolicy::default())
    }

    pub fn with_policy(locator: Locator<O>, clock: C, policy: RetryPolicy) -> Self {
        Self {
            locator,
            clock,
            policy,
        }
    }

    /// Locate the keyboard and write `mode`, retrying up to the attempt cap.
    ///
    /// The handle from each attempt is closed before the next one starts.
    pub fn apply(&self, mode: FnKeysMode) -> Result<()> {
        let max = self.policy.max_attempts;

        for attempt in 1..=max {
            match self.locator.locate() {
                None => {
                    debug!(attempt, max, "K380 not found or cannot be opened");
                }
                Some(mut handle) => {
                    let result = send_configuration(&mut handle, mode);
                    drop(handle);
                    match result {
                        Ok(()) => {
                            info!(mode = mode.label(), attempt, "Setting applied successfully");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(attempt, max, error = %e, "Failed to apply setting");
                        }
                    }
                }
            }

            if attempt < max {
                debug!(delay_ms = self.policy.delay.as_millis() as u64, "Retrying");
                self.clock.sleep(self.policy.delay);
            }
        }

        warn!(attempts = max, "Giving up on applying setting");
        Err(Error::RetriesExhausted { attempts: max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fake::FakeClock;
    use crate::transport::mock::{MockOpener, MockStep, WriteOutcome};

    fn applier(mock: &MockOpener, clock: &FakeClock) -> Applier<MockOpener, FakeClock> {
        Applier::new(Locator::new(mock.clone()), clock.clone())
    }

    #[test]
    fn send_configuration_full_write() {
        let mock = MockOpener::always(MockStep::Present(WriteOutcome::Full));
        let mut handle = mock.open(0x046D, 0xB342).unwrap();
        assert!(send_configuration(&mut handle, FnKeysMode::On).is_ok());
    }

    #[test]
    fn send_configuration_partial_write_is_error() {
        let mock = MockOpener::always(MockStep::Present(WriteOutcome::Partial(3)));
        let mut handle = mock.open(0x046D, 0xB342).unwrap();
        let err = send_configuration(&mut handle, FnKeysMode::On).unwrap_err();
        assert!(matches!(
            err,
            Error::ShortWrite {
                written: 3,
                expected: 7
            }
        ));
    }

    #[test]
    fn send_configuration_write_error_propagates() {
        let mock = MockOpener::always(MockStep::Present(WriteOutcome::Fail));
        let mut handle = mock.open(0x046D, 0xB342).unwrap();
        assert!(matches!(
            send_configuration(&mut handle, FnKeysMode::Off),
            Err(Error::Hid(_))
        ));
    }

    #[test]
    fn apply_sends_exact_report_for_each_mode() {
        for mode in [FnKeysMode::On, FnKeysMode::Off] {
            let mock = MockOpener::always(MockStep::Present(WriteOutcome::Full));
            let clock = FakeClock::new();
            assert!(applier(&mock, &clock).apply(mode).is_ok());
            assert_eq!(mock.writes(), vec![mode.report().unwrap().to_vec()]);
        }
    }

    #[test]
    fn apply_success_releases_handle_once() {
        let mock = MockOpener::new([MockStep::Present(WriteOutcome::Full)]);
        let clock = FakeClock::new();
        applier(&mock, &clock).apply(FnKeysMode::On).unwrap();
        assert_eq!(mock.opened(), 1);
        assert_eq!(mock.closed(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn apply_retries_after_partial_write() {
        let mock = MockOpener::new([
            MockStep::Present(WriteOutcome::Partial(3)),
            MockStep::Present(WriteOutcome::Full),
        ]);
        let clock = FakeClock::new();
        applier(&mock, &clock).apply(FnKeysMode::On).unwrap();
        assert_eq!(mock.opened(), 2);
        assert_eq!(mock.closed(), 2);
        assert_eq!(mock.writes().len(), 2);
        assert_eq!(clock.sleeps(), vec![RETRY_DELAY]);
    }

    #[test]
    fn apply_fails_after_three_absent_attempts() {
        let mock = MockOpener::always(MockStep::Absent);
        let clock = FakeClock::new();
        let err = applier(&mock, &clock).apply(FnKeysMode::Off).unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3 }));
        assert_eq!(mock.open_calls(), 3);
        assert_eq!(mock.opened(), 0);
        assert!(mock.writes().is_empty());
        // No delay after the final attempt.
        assert_eq!(clock.sleeps(), vec![RETRY_DELAY, RETRY_DELAY]);
    }

    #[test]
    fn apply_fails_after_repeated_write_errors() {
        let mock = MockOpener::always(MockStep::Present(WriteOutcome::Fail));
        let clock = FakeClock::new();
        assert!(applier(&mock, &clock).apply(FnKeysMode::On).is_err());
        assert_eq!(mock.opened(), 3);
        assert_eq!(mock.closed(), 3);
    }

    #[test]
    fn apply_recovers_when_device_appears() {
        let mock = MockOpener::new([
            MockStep::Absent,
            MockStep::Absent,
            MockStep::Present(WriteOutcome::Full),
        ]);
        let clock = FakeClock::new();
        assert!(applier(&mock, &clock).apply(FnKeysMode::On).is_ok());
        assert_eq!(mock.open_calls(), 3);
    }

    #[test]
    fn custom_policy_caps_attempts() {
        let mock = MockOpener::always(MockStep::Absent);
        let clock = FakeClock::new();
        let policy = RetryPolicy {
            max_attempts: 1,
            delay: Duration::from_millis(10),
        };
        let applier = Applier::with_policy(Locator::new(mock.clone()), clock.clone(), policy);
        assert!(applier.apply(FnKeysMode::On).is_err());
        assert_eq!(mock.open_calls(), 1);
        assert!(clock.sleeps().is_empty());
    }
}
