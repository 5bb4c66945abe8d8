use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Upper bound on a single frame's dt (seconds).
pub const MAX_FRAME_DT: f32 = 0.1;
/// dt substituted after a stall (backgrounded tab, debugger pause).
pub const FALLBACK_FRAME_DT: f32 = 1.0 / 60.0;
/// Wall-clock gap (seconds) beyond which a frame is treated as a stall.
pub const STALL_THRESHOLD: f32 = 1.0;

/// Source of monotonic timestamps in seconds.
pub trait Clock {
    fn now_secs(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually driven clock for tests and headless replays.
///
/// Clones share the same timeline, so a test can keep a handle while the
/// game owns another.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<f64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }
}

impl Clock for VirtualClock {
    fn now_secs(&self) -> f64 {
        self.now.get()
    }
}

/// Limits applied when converting timestamps into frame deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub max_dt: f32,
    pub fallback_dt: f32,
    pub stall_threshold: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_dt: MAX_FRAME_DT,
            fallback_dt: FALLBACK_FRAME_DT,
            stall_threshold: STALL_THRESHOLD,
        }
    }
}

/// Turns successive timestamps into capped frame deltas.
#[derive(Debug, Clone)]
pub struct FrameClock {
    config: FrameConfig,
    last: Option<f64>,
}

impl FrameClock {
    pub fn new(config: FrameConfig) -> Self {
        Self { config, last: None }
    }

    /// Seconds elapsed since the previous call, capped.
    ///
    /// The first call after construction or [`FrameClock::resync`] yields 0.
    pub fn delta(&mut self, now: f64) -> f32 {
        let Some(last) = self.last.replace(now) else {
            return 0.0;
        };
        let raw = (now - last) as f32;
        if !raw.is_finite() || raw <= 0.0 {
            0.0
        } else if raw > self.config.stall_threshold {
            self.config.fallback_dt
        } else {
            raw.min(self.config.max_dt)
        }
    }

    /// Forget the previous timestamp so the next frame starts from `now`.
    pub fn resync(&mut self, now: f64) {
        self.last = Some(now);
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}
