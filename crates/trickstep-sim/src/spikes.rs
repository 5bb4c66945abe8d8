use serde::{Deserialize, Serialize};

use trickstep_core::events::SimEvent;

use crate::collision::Rect;
use crate::physics::Actor;

/// Animation progress gained per second; a triggered spike settles after 0.2s.
pub const MOVE_RATE: f32 = 5.0;

/// Lifecycle of a spike within one level instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpikeState {
    /// Waiting for the actor to cross its trigger line.
    Idle,
    /// Fired this frame; the slide starts on the next advance.
    Triggered,
    /// Sliding, `timer` in `[0, 1)`.
    Moving { timer: f32 },
    /// Reached its destination. Never fires again until reset.
    Settled,
}

impl SpikeState {
    /// State after `dt` seconds of animation.
    pub fn advance(self, dt: f32) -> Self {
        let timer = match self {
            SpikeState::Idle | SpikeState::Settled => return self,
            SpikeState::Triggered => 0.0,
            SpikeState::Moving { timer } => timer,
        };
        let timer = timer + MOVE_RATE * dt;
        if timer >= 1.0 {
            SpikeState::Settled
        } else {
            SpikeState::Moving { timer }
        }
    }

    /// Fraction of the slide completed.
    pub fn progress(&self) -> f32 {
        match self {
            SpikeState::Idle | SpikeState::Triggered => 0.0,
            SpikeState::Moving { timer } => *timer,
            SpikeState::Settled => 1.0,
        }
    }
}

/// A spike and its invisible trigger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    /// Current left edge.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub original_x: f32,
    /// Signed horizontal travel in pixels.
    pub move_distance: f32,
    pub trigger_x: f32,
    pub trigger_y: f32,
    pub trigger_height: f32,
    pub state: SpikeState,
}

impl Spike {
    pub fn new(
        rect: Rect,
        move_distance: f32,
        trigger_x: f32,
        trigger_y: f32,
        trigger_height: f32,
    ) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.w,
            height: rect.h,
            original_x: rect.x,
            move_distance,
            trigger_x,
            trigger_y,
            trigger_height,
            state: SpikeState::Idle,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn triggered(&self) -> bool {
        !matches!(self.state, SpikeState::Idle)
    }

    pub fn moving(&self) -> bool {
        matches!(self.state, SpikeState::Triggered | SpikeState::Moving { .. })
    }

    pub fn moved(&self) -> bool {
        matches!(self.state, SpikeState::Settled)
    }

    pub fn move_timer(&self) -> f32 {
        self.state.progress()
    }

    /// Whether the actor's leading edge crossed the trigger line this frame
    /// inside the vertical window.
    ///
    /// Crossing is measured between the actor's previous and current
    /// position, so standing on or oscillating around the line is not a
    /// fresh crossing.
    pub fn crossed_by(&self, actor: &Actor) -> bool {
        if !actor.rect().spans_vertically(self.trigger_y, self.trigger_height) {
            return false;
        }
        let line = self.trigger_x;
        let prev_right = actor.prev_x + actor.width;
        let right = actor.x + actor.width;
        let from_left = prev_right < line && right >= line;
        let from_right = actor.prev_x > line && actor.x <= line;
        from_left || from_right
    }

    fn advance(&mut self, dt: f32) {
        self.state = self.state.advance(dt);
        self.x = self.original_x + self.move_distance * self.state.progress();
    }

    pub fn reset(&mut self) {
        self.x = self.original_x;
        self.state = SpikeState::Idle;
    }
}

/// Fire every idle spike whose trigger line the actor crossed this frame.
/// Returns the indices that fired.
pub fn check_triggers(
    actor: &Actor,
    spikes: &mut [Spike],
    events: &mut Vec<SimEvent>,
) -> Vec<usize> {
    let mut fired = Vec::new();
    for (index, spike) in spikes.iter_mut().enumerate() {
        if spike.state != SpikeState::Idle || !spike.crossed_by(actor) {
            continue;
        }
        spike.state = SpikeState::Triggered;
        tracing::debug!("Spike {index} triggered at x={}", spike.trigger_x);
        events.push(SimEvent::HazardActivated { spike: index });
        fired.push(index);
    }
    fired
}

/// Animate triggered spikes toward their destination.
pub fn advance(spikes: &mut [Spike], dt: f32) {
    for spike in spikes.iter_mut().filter(|s| s.moving()) {
        spike.advance(dt);
    }
}

/// Index of the first spike the actor overlaps, in any state.
pub fn touching(actor: &Actor, spikes: &[Spike]) -> Option<usize> {
    let body = actor.rect();
    spikes.iter().position(|s| s.rect().overlaps(&body))
}

pub fn reset(spikes: &mut [Spike]) {
    for spike in spikes {
        spike.reset();
    }
}
