use log::{debug, info, warn};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::assets::Pattern;
use crate::error::BotResult;
use crate::matcher::find_matches;
use crate::screen::{ScreenCapturer, Screenshot};
use crate::ui::SearchResult;

/// What one `wait_until` call ended with.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub result: SearchResult,
    /// The screenshot the result was matched against, if any capture succeeded.
    pub screenshot: Option<Screenshot>,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl PollOutcome {
    pub fn found(&self) -> bool {
        self.result.is_valid()
    }
}

/// Capture+match until the pattern shows up or the time budget runs out.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    timeout: Duration,
    poll_interval: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Always makes at least one attempt, even with a zero timeout.
    ///
    /// Returns as soon as an attempt finds the pattern. Otherwise keeps going
    /// until `timeout` has elapsed, sleeping at most `poll_interval` between
    /// attempts. Misconfiguration (bad monitor index, pattern larger than the
    /// screen) is returned as an error; any other capture failure counts as an
    /// attempt that found nothing.
    pub fn wait_until(
        &self,
        capturer: &mut dyn ScreenCapturer,
        pattern: &Pattern,
        threshold: f32,
    ) -> BotResult<PollOutcome> {
        debug!("Wait [{}]", pattern.path.display());
        let start = Instant::now();
        let mut attempts = 0;
        let mut screenshot = None;

        loop {
            attempts += 1;
            let result = match capturer.capture() {
                Ok(shot) => {
                    let result = find_matches(&shot, pattern, threshold)?;
                    screenshot = Some(shot);
                    result
                }
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!("Capture failed while waiting for '{}': {}", pattern.name, err);
                    SearchResult::empty()
                }
            };

            let elapsed = start.elapsed();
            if result.is_valid() {
                info!("Found [{}] after {} attempt(s)", pattern.name, attempts);
                return Ok(PollOutcome {
                    result,
                    screenshot,
                    attempts,
                    elapsed,
                });
            }
            if elapsed >= self.timeout {
                info!(
                    "Timeout [{}] after {:?} ({} attempts)",
                    pattern.name, elapsed, attempts
                );
                return Ok(PollOutcome {
                    result,
                    screenshot,
                    attempts,
                    elapsed,
                });
            }

            debug!("Waiting count: {}", attempts);
            sleep(self.poll_interval.min(self.timeout - elapsed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BotError, CaptureError, PatternError};
    use crate::testutil::{Frame, ScriptedScreen, blank, noise, paste, pattern};

    fn button() -> Pattern {
        pattern("home-before", noise(8, 6, 42))
    }

    fn screen_with_button() -> image::GrayImage {
        let mut screen = noise(64, 48, 1);
        paste(&mut screen, &button().image, 20, 10);
        screen
    }

    fn poller(timeout_ms: u64) -> Poller {
        Poller::new(Duration::from_millis(timeout_ms), Duration::from_millis(5))
    }

    #[test]
    fn test_zero_timeout_makes_exactly_one_attempt() {
        let mut screen = ScriptedScreen::new(vec![]);
        let outcome = poller(0).wait_until(&mut screen, &button(), 0.7).unwrap();

        assert!(!outcome.found());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(screen.calls, 1);
    }

    #[test]
    fn test_found_on_first_attempt() {
        let mut screen = ScriptedScreen::still(screen_with_button());
        let outcome = poller(3000).wait_until(&mut screen, &button(), 0.7).unwrap();

        assert!(outcome.found());
        assert_eq!(outcome.attempts, 1);
        let first = outcome.result.first().unwrap();
        assert_eq!((first.x1, first.y1, first.x2, first.y2), (20, 10, 28, 16));
        assert!(outcome.screenshot.is_some());
    }

    #[test]
    fn test_found_once_button_appears() {
        let mut screen = ScriptedScreen::new(vec![
            Frame::Image(blank(64, 48, 10)),
            Frame::Image(blank(64, 48, 200)),
            Frame::Image(screen_with_button()),
        ]);
        let outcome = poller(3000).wait_until(&mut screen, &button(), 0.7).unwrap();

        assert!(outcome.found());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(screen.calls, 3);
    }

    #[test]
    fn test_absent_pattern_waits_out_the_timeout() {
        let mut screen = ScriptedScreen::new(vec![]);
        let timeout = Duration::from_millis(60);
        let outcome = poller(60).wait_until(&mut screen, &button(), 0.7).unwrap();

        assert!(!outcome.found());
        assert!(outcome.elapsed >= timeout);
        assert!(outcome.elapsed < timeout + Duration::from_secs(1));
        assert!(outcome.attempts > 1);
    }

    #[test]
    fn test_transient_capture_failure_counts_as_empty_attempt() {
        let err = xcap::XCapError::new("display busy");
        let mut screen = ScriptedScreen::new(vec![
            Frame::Fail(CaptureError::Backend(err)),
            Frame::Image(screen_with_button()),
        ]);
        let outcome = poller(3000).wait_until(&mut screen, &button(), 0.7).unwrap();

        assert!(outcome.found());
        assert_eq!(outcome.attempts, 2);
    }

    #[test]
    fn test_bad_monitor_index_propagates() {
        let mut screen = ScriptedScreen::new(vec![Frame::Fail(CaptureError::MonitorOutOfRange {
            index: 4,
            available: 2,
        })]);
        let err = poller(3000)
            .wait_until(&mut screen, &button(), 0.7)
            .unwrap_err();

        assert!(matches!(
            err,
            BotError::Capture(CaptureError::MonitorOutOfRange { index: 4, .. })
        ));
        assert_eq!(screen.calls, 1);
    }

    #[test]
    fn test_oversized_pattern_propagates() {
        let mut screen = ScriptedScreen::still(noise(4, 4, 1));
        let err = poller(3000)
            .wait_until(&mut screen, &button(), 0.7)
            .unwrap_err();
        assert!(matches!(err, BotError::Pattern(PatternError::TooLarge { .. })));
    }
}
