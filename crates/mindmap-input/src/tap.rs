//! Single-pointer gesture state machine.
//!
//! ```text
//! Idle --down--> Pressed --moved past threshold--> Dragging --up--> Idle (DragEnd)
//!                   |  \--held past long press--> LongPressed --up--> Idle
//!                   \--up (short)--> Idle (Tap or DoubleTap)
//! ```
//!
//! Time is passed in explicitly so every transition is testable without
//! sleeping. Callers replace the long-press timer with periodic [`TapRecognizer::poll`]
//! calls.

use crate::config::GestureConfig;
use mindmap_core::Vec2;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// Provisional single tap. A following tap may still complete a double tap.
    Tap { point: Vec2 },
    DoubleTap { point: Vec2 },
    LongPress { point: Vec2 },
    DragStart { origin: Vec2, point: Vec2 },
    DragMove { point: Vec2, delta: Vec2 },
    DragEnd { point: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapPhase {
    Idle,
    Pressed { origin: Vec2, at: Instant },
    LongPressed { origin: Vec2 },
    Dragging { origin: Vec2, last: Vec2 },
}

#[derive(Debug, Clone)]
pub struct TapRecognizer {
    config: GestureConfig,
    phase: TapPhase,
    last_tap: Option<(Instant, Vec2)>,
}

impl TapRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: TapPhase::Idle,
            last_tap: None,
        }
    }

    pub fn phase(&self) -> TapPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, TapPhase::Dragging { .. })
    }

    pub fn pointer_down(&mut self, point: Vec2, now: Instant) {
        self.phase = TapPhase::Pressed {
            origin: point,
            at: now,
        };
    }

    pub fn pointer_move(&mut self, point: Vec2, now: Instant) -> Option<TapOutcome> {
        if let Some(outcome) = self.poll(now) {
            return Some(outcome);
        }
        match self.phase {
            TapPhase::Pressed { origin, .. } => {
                if origin.distance(point) <= self.config.drag_threshold {
                    return None;
                }
                self.phase = TapPhase::Dragging {
                    origin,
                    last: point,
                };
                self.last_tap = None;
                Some(TapOutcome::DragStart { origin, point })
            }
            TapPhase::Dragging { origin, last } => {
                self.phase = TapPhase::Dragging {
                    origin,
                    last: point,
                };
                Some(TapOutcome::DragMove {
                    point,
                    delta: point - last,
                })
            }
            TapPhase::Idle | TapPhase::LongPressed { .. } => None,
        }
    }

    /// Fires the long press once the pointer has been held still long enough.
    pub fn poll(&mut self, now: Instant) -> Option<TapOutcome> {
        if let TapPhase::Pressed { origin, at } = self.phase
            && now.saturating_duration_since(at) >= self.config.long_press()
        {
            self.phase = TapPhase::LongPressed { origin };
            self.last_tap = None;
            return Some(TapOutcome::LongPress { point: origin });
        }
        None
    }

    pub fn pointer_up(&mut self, point: Vec2, now: Instant) -> Option<TapOutcome> {
        if let Some(outcome) = self.poll(now) {
            self.phase = TapPhase::Idle;
            return Some(outcome);
        }
        let phase = std::mem::replace(&mut self.phase, TapPhase::Idle);
        match phase {
            TapPhase::Pressed { at, .. } => {
                if now.saturating_duration_since(at) > self.config.tap_max() {
                    self.last_tap = None;
                    return None;
                }
                if let Some((last_at, last_point)) = self.last_tap
                    && now.saturating_duration_since(last_at) <= self.config.double_tap_window()
                    && last_point.distance(point) <= self.config.double_tap_slop
                {
                    self.last_tap = None;
                    return Some(TapOutcome::DoubleTap { point });
                }
                self.last_tap = Some((now, point));
                Some(TapOutcome::Tap { point })
            }
            TapPhase::Dragging { .. } => Some(TapOutcome::DragEnd { point }),
            TapPhase::LongPressed { .. } | TapPhase::Idle => None,
        }
    }

    /// Treats the tap that just ended at `point` as the first of a new pair.
    pub fn restart_pair(&mut self, point: Vec2, now: Instant) {
        self.last_tap = Some((now, point));
    }

    /// Abandons the current interaction without an outcome, e.g. when a
    /// second finger turns it into a pinch.
    pub fn cancel(&mut self) {
        self.phase = TapPhase::Idle;
        self.last_tap = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn recognizer() -> TapRecognizer {
        TapRecognizer::new(GestureConfig::default())
    }

    #[test]
    fn test_quick_release_is_tap() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let p = Vec2::new(10.0, 10.0);
        r.pointer_down(p, t0);
        assert_eq!(r.pointer_up(p, t0 + ms(100)), Some(TapOutcome::Tap { point: p }));
        assert_eq!(r.phase(), TapPhase::Idle);
    }

    #[test]
    fn test_second_tap_inside_window_is_double_tap() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let p = Vec2::new(10.0, 10.0);
        let q = Vec2::new(14.0, 12.0);

        r.pointer_down(p, t0);
        assert!(matches!(r.pointer_up(p, t0 + ms(80)), Some(TapOutcome::Tap { .. })));
        r.pointer_down(q, t0 + ms(200));
        assert_eq!(
            r.pointer_up(q, t0 + ms(260)),
            Some(TapOutcome::DoubleTap { point: q })
        );

        // A third tap starts a new pair.
        r.pointer_down(q, t0 + ms(300));
        assert!(matches!(r.pointer_up(q, t0 + ms(340)), Some(TapOutcome::Tap { .. })));
    }

    #[test]
    fn test_slow_or_distant_second_tap_is_single() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let p = Vec2::new(0.0, 0.0);
        r.pointer_down(p, t0);
        r.pointer_up(p, t0 + ms(50));
        r.pointer_down(p, t0 + ms(500));
        assert!(matches!(r.pointer_up(p, t0 + ms(550)), Some(TapOutcome::Tap { .. })));

        let far = Vec2::new(200.0, 0.0);
        r.pointer_down(far, t0 + ms(600));
        assert!(matches!(r.pointer_up(far, t0 + ms(650)), Some(TapOutcome::Tap { .. })));
    }

    #[test]
    fn test_hold_fires_long_press_once() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let p = Vec2::new(5.0, 5.0);
        r.pointer_down(p, t0);
        assert_eq!(r.poll(t0 + ms(300)), None);
        assert_eq!(r.poll(t0 + ms(460)), Some(TapOutcome::LongPress { point: p }));
        assert_eq!(r.poll(t0 + ms(600)), None);
        assert_eq!(r.pointer_up(p, t0 + ms(700)), None);
    }

    #[test]
    fn test_release_after_long_press_without_poll_reports_long_press() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let p = Vec2::new(5.0, 5.0);
        r.pointer_down(p, t0);
        assert_eq!(
            r.pointer_up(p, t0 + ms(500)),
            Some(TapOutcome::LongPress { point: p })
        );
    }

    #[test]
    fn test_release_between_tap_and_long_press_is_nothing() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let p = Vec2::ZERO;
        r.pointer_down(p, t0);
        assert_eq!(r.pointer_up(p, t0 + ms(350)), None);
    }

    #[test]
    fn test_movement_past_threshold_suppresses_tap() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let origin = Vec2::ZERO;
        r.pointer_down(origin, t0);
        assert_eq!(r.pointer_move(Vec2::new(3.0, 0.0), t0 + ms(10)), None);

        let p = Vec2::new(20.0, 0.0);
        assert_eq!(
            r.pointer_move(p, t0 + ms(20)),
            Some(TapOutcome::DragStart { origin, point: p })
        );
        assert_eq!(
            r.pointer_move(Vec2::new(25.0, 5.0), t0 + ms(30)),
            Some(TapOutcome::DragMove {
                point: Vec2::new(25.0, 5.0),
                delta: Vec2::new(5.0, 5.0)
            })
        );
        // Held long while dragging: still a drag, never a long press.
        assert_eq!(r.poll(t0 + ms(1000)), None);
        assert!(matches!(
            r.pointer_up(Vec2::new(25.0, 5.0), t0 + ms(1000)),
            Some(TapOutcome::DragEnd { .. })
        ));
    }

    #[test]
    fn test_cancel_forgets_pending_tap() {
        let mut r = recognizer();
        let t0 = Instant::now();
        let p = Vec2::ZERO;
        r.pointer_down(p, t0);
        r.pointer_up(p, t0 + ms(50));
        r.pointer_down(p, t0 + ms(100));
        r.cancel();
        assert_eq!(r.pointer_up(p, t0 + ms(150)), None);
        r.pointer_down(p, t0 + ms(160));
        assert!(matches!(r.pointer_up(p, t0 + ms(200)), Some(TapOutcome::Tap { .. })));
    }
}
