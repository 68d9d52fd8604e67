//! Visibility oracle - Rate-limited "is the main window on screen" cache
//!
//! Asking the windowing system whether a window is actually visible costs a
//! real platform query per sample point. Periodic display timers call
//! [`VisibilityOracle::record_visibility`] every tick; at most one probe per
//! debounce window reaches the platform and everybody else reads the cached
//! answer through [`VisibilityOracle::is_visible`].
//!
//! On platforms without a point query primitive the oracle always reports
//! visible and recording is a no-op.

use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::error::VisibilityError;
use crate::platform;

/// Minimum interval between two real platform probes
pub const VISIBILITY_DEBOUNCE: Duration = Duration::from_millis(5000);

/// Platform identity of a top-level window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

/// Window rectangle in physical screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The four corners followed by the centre, in probing order
    pub fn sample_points(&self) -> [(i32, i32); 5] {
        let right = self.x + (self.width - 1).max(0);
        let bottom = self.y + (self.height - 1).max(0);
        [
            (self.x, self.y),
            (right, self.y),
            (self.x, bottom),
            (right, bottom),
            (self.x + self.width / 2, self.y + self.height / 2),
        ]
    }
}

/// "Which window, if any, occupies this screen coordinate"
pub trait WindowProbe: Send + Sync {
    fn window_at(&self, x: i32, y: i32) -> Option<WindowId>;
}

#[derive(Debug)]
struct VisibilityState {
    last_checked: Option<Instant>,
    is_visible: bool,
}

pub struct VisibilityOracle {
    probe: Option<Box<dyn WindowProbe>>,
    debounce: Duration,
    state: Mutex<VisibilityState>,
}

static GLOBAL: LazyLock<VisibilityOracle> = LazyLock::new(VisibilityOracle::from_platform);

impl VisibilityOracle {
    pub fn new(probe: Box<dyn WindowProbe>) -> Self {
        Self::with_debounce(probe, VISIBILITY_DEBOUNCE)
    }

    pub fn with_debounce(probe: Box<dyn WindowProbe>, debounce: Duration) -> Self {
        Self {
            probe: Some(probe),
            debounce,
            state: Mutex::new(VisibilityState {
                last_checked: None,
                is_visible: true,
            }),
        }
    }

    /// Oracle for platforms that cannot probe: always visible
    pub fn unsupported() -> Self {
        Self {
            probe: None,
            debounce: VISIBILITY_DEBOUNCE,
            state: Mutex::new(VisibilityState {
                last_checked: None,
                is_visible: true,
            }),
        }
    }

    /// Build an oracle around the current platform's point query
    pub fn from_platform() -> Self {
        match platform::window_probe() {
            Ok(probe) => Self::new(probe),
            Err(VisibilityError::PlatformProbeUnavailable) => {
                debug!("Window point query unavailable, treating main window as always visible");
                Self::unsupported()
            }
        }
    }

    /// Process-wide instance, created on first use and alive until exit
    pub fn global() -> &'static VisibilityOracle {
        &GLOBAL
    }

    pub fn is_supported(&self) -> bool {
        self.probe.is_some()
    }

    /// Re-probe the window unless the last probe is younger than the debounce
    /// window. `force` skips the debounce check.
    pub fn record_visibility(&self, rect: ScreenRect, window: WindowId, force: bool) {
        let Some(probe) = self.probe.as_deref() else {
            return;
        };

        let mut state = self.lock_state();

        if !force {
            if let Some(last) = state.last_checked {
                if last.elapsed() < self.debounce {
                    return;
                }
            }
        }

        state.last_checked = Some(Instant::now());

        let visible = rect
            .sample_points()
            .into_iter()
            .any(|(x, y)| probe.window_at(x, y) == Some(window));

        trace!("Visibility probe for {:?} at {:?}: {}", window, rect, visible);
        if visible != state.is_visible {
            debug!("Main window visibility changed to {}", visible);
        }
        state.is_visible = visible;
    }

    /// Last recorded answer
    pub fn is_visible(&self) -> bool {
        self.lock_state().is_visible
    }

    /// When the platform was last probed
    pub fn last_checked(&self) -> Option<Instant> {
        self.lock_state().last_checked
    }

    fn lock_state(&self) -> MutexGuard<'_, VisibilityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const ME: WindowId = WindowId(42);
    const OTHER: WindowId = WindowId(7);

    /// Answers `ME` only for the listed points and records every query
    struct ScriptedProbe {
        hits: Mutex<Vec<(i32, i32)>>,
        calls: Arc<Mutex<Vec<(i32, i32)>>>,
    }

    impl ScriptedProbe {
        fn new(hits: Vec<(i32, i32)>) -> (Self, Arc<Mutex<Vec<(i32, i32)>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    hits: Mutex::new(hits),
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl WindowProbe for ScriptedProbe {
        fn window_at(&self, x: i32, y: i32) -> Option<WindowId> {
            self.calls.lock().unwrap().push((x, y));
            if self.hits.lock().unwrap().contains(&(x, y)) {
                Some(ME)
            } else {
                Some(OTHER)
            }
        }
    }

    fn rect() -> ScreenRect {
        ScreenRect::new(100, 200, 640, 480)
    }

    #[test]
    fn test_sample_points_are_corners_then_centre() {
        assert_eq!(
            rect().sample_points(),
            [
                (100, 200),
                (739, 200),
                (100, 679),
                (739, 679),
                (420, 440),
            ]
        );
    }

    #[test]
    fn test_sample_points_of_empty_rect_stay_inside() {
        let points = ScreenRect::new(5, 5, 0, 0).sample_points();
        assert!(points.iter().all(|&p| p == (5, 5)));
    }

    #[test]
    fn test_centre_only_match_probes_every_corner_first() {
        let centre = rect().sample_points()[4];
        let (probe, calls) = ScriptedProbe::new(vec![centre]);
        let oracle = VisibilityOracle::new(Box::new(probe));

        oracle.record_visibility(rect(), ME, true);

        assert!(oracle.is_visible());
        assert_eq!(*calls.lock().unwrap(), rect().sample_points().to_vec());
    }

    #[test]
    fn test_probe_stops_at_first_match() {
        let (probe, calls) = ScriptedProbe::new(vec![(100, 200)]);
        let oracle = VisibilityOracle::new(Box::new(probe));

        oracle.record_visibility(rect(), ME, true);

        assert!(oracle.is_visible());
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_no_match_records_hidden() {
        let (probe, calls) = ScriptedProbe::new(vec![]);
        let oracle = VisibilityOracle::new(Box::new(probe));
        assert!(oracle.is_visible());

        oracle.record_visibility(rect(), ME, false);

        assert!(!oracle.is_visible());
        assert_eq!(calls.lock().unwrap().len(), 5);
        assert!(oracle.last_checked().is_some());
    }

    #[test]
    fn test_unforced_calls_inside_window_are_ignored() {
        let (probe, calls) = ScriptedProbe::new(vec![]);
        let oracle = VisibilityOracle::new(Box::new(probe));

        oracle.record_visibility(rect(), ME, false);
        assert!(!oracle.is_visible());
        let first = oracle.last_checked();

        // Different identity would match now, but the call is debounced
        for _ in 0..10 {
            oracle.record_visibility(rect(), OTHER, false);
        }

        assert!(!oracle.is_visible());
        assert_eq!(oracle.last_checked(), first);
        assert_eq!(calls.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_forced_call_bypasses_debounce_and_resets_timer() {
        let (probe, calls) = ScriptedProbe::new(vec![]);
        let oracle = VisibilityOracle::new(Box::new(probe));

        oracle.record_visibility(rect(), ME, false);
        let first = oracle.last_checked().unwrap();

        oracle.record_visibility(rect(), OTHER, true);
        let second = oracle.last_checked().unwrap();

        assert!(oracle.is_visible());
        assert!(second >= first);
        assert_eq!(calls.lock().unwrap().len(), 6);

        // The forced probe restarted the window
        oracle.record_visibility(rect(), ME, false);
        assert!(oracle.is_visible());
        assert_eq!(calls.lock().unwrap().len(), 6);
    }

    #[test]
    fn test_probe_resumes_after_window_elapses() {
        let (probe, calls) = ScriptedProbe::new(vec![]);
        let oracle = VisibilityOracle::with_debounce(Box::new(probe), Duration::from_millis(20));

        oracle.record_visibility(rect(), OTHER, false);
        assert!(oracle.is_visible());

        thread::sleep(Duration::from_millis(40));
        oracle.record_visibility(rect(), ME, false);

        assert!(!oracle.is_visible());
        assert_eq!(calls.lock().unwrap().len(), 6);
    }

    #[test]
    fn test_unsupported_platform_is_always_visible() {
        let oracle = VisibilityOracle::unsupported();
        assert!(!oracle.is_supported());

        oracle.record_visibility(rect(), ME, true);

        assert!(oracle.is_visible());
        assert!(oracle.last_checked().is_none());
    }

    #[test]
    fn test_concurrent_callers_probe_once_per_window() {
        let (probe, calls) = ScriptedProbe::new(vec![(100, 200)]);
        let oracle = Arc::new(VisibilityOracle::new(Box::new(probe)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let oracle = Arc::clone(&oracle);
                thread::spawn(move || {
                    for _ in 0..50 {
                        oracle.record_visibility(rect(), ME, false);
                        assert!(oracle.is_visible());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_default_debounce_is_five_seconds() {
        assert_eq!(VISIBILITY_DEBOUNCE, Duration::from_millis(5000));
    }
}
