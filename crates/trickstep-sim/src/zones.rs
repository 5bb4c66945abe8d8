use serde::{Deserialize, Serialize};

use trickstep_core::events::SimEvent;

use crate::collision::Rect;
use crate::level::ZoneOverride;
use crate::physics::Actor;

/// Seconds before a zone can fire again when no override sets one.
pub const DEFAULT_ZONE_COOLDOWN: f32 = 1.0;

/// What a zone does to gravity when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Invert gravity.
    Flip,
    /// Invert gravity; authored as a switch the actor flips back and forth.
    Toggle,
    /// Force inverted gravity while inside, restore it on exit.
    Momentary,
}

/// When a zone fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneTrigger {
    /// Once, on the frame the actor starts overlapping.
    Enter,
    /// Every frame the actor overlaps, subject to cooldown.
    Contact,
}

/// Fully resolved zone parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub kind: ZoneKind,
    pub trigger: ZoneTrigger,
    /// Seconds before gravity reverts on its own; `None` is permanent.
    pub duration: Option<f32>,
    pub cooldown: f32,
    pub one_shot: bool,
    /// Renderer hint.
    pub visual: Option<String>,
    /// Sound cue override.
    pub sound: Option<String>,
}

impl ZoneConfig {
    pub fn defaults(kind: ZoneKind) -> Self {
        Self {
            kind,
            trigger: ZoneTrigger::Enter,
            duration: None,
            cooldown: DEFAULT_ZONE_COOLDOWN,
            one_shot: false,
            visual: None,
            sound: None,
        }
    }

    /// Apply override layers in order; later layers win field by field.
    pub fn merged(kind: ZoneKind, layers: &[Option<&ZoneOverride>]) -> Self {
        let mut config = Self::defaults(kind);
        for layer in layers.iter().flatten() {
            config.apply(layer);
        }
        config
    }

    fn apply(&mut self, layer: &ZoneOverride) {
        if let Some(kind) = layer.kind {
            self.kind = kind;
        }
        if let Some(trigger) = layer.trigger {
            self.trigger = trigger;
        }
        if let Some(duration) = layer.duration {
            // Zero or negative durations mean "no auto-revert"
            self.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
        }
        if let Some(cooldown) = layer.cooldown.filter(|c| c.is_finite()) {
            self.cooldown = cooldown.max(0.0);
        }
        if let Some(one_shot) = layer.one_shot {
            self.one_shot = one_shot;
        }
        if let Some(visual) = &layer.visual {
            self.visual = Some(visual.clone());
        }
        if let Some(sound) = &layer.sound {
            self.sound = Some(sound.clone());
        }
    }
}

/// Readiness of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoneState {
    Idle,
    Cooldown { remaining: f32 },
    /// One-shot zone that already fired.
    Spent,
}

impl ZoneState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ZoneState::Idle)
    }

    pub fn tick(self, dt: f32) -> Self {
        match self {
            ZoneState::Cooldown { remaining } if remaining - dt > 0.0 => ZoneState::Cooldown {
                remaining: remaining - dt,
            },
            ZoneState::Cooldown { .. } => ZoneState::Idle,
            other => other,
        }
    }

    /// State right after a successful activation.
    pub fn after_activation(config: &ZoneConfig) -> Self {
        if config.one_shot {
            ZoneState::Spent
        } else if config.cooldown > 0.0 {
            ZoneState::Cooldown {
                remaining: config.cooldown,
            }
        } else {
            ZoneState::Idle
        }
    }
}

/// A flood-filled gravity zone and its runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityZone {
    /// Discovery index, row-major by first cell.
    pub id: usize,
    pub rect: Rect,
    pub config: ZoneConfig,
    pub state: ZoneState,
    /// Successful activations this level instance.
    pub activations: u32,
}

impl GravityZone {
    pub fn new(id: usize, rect: Rect, config: ZoneConfig) -> Self {
        Self {
            id,
            rect,
            config,
            state: ZoneState::Idle,
            activations: 0,
        }
    }

    pub fn has_activated(&self) -> bool {
        self.activations > 0
    }

    /// Seconds left before the zone can fire again.
    pub fn cooldown_timer(&self) -> f32 {
        match self.state {
            ZoneState::Cooldown { remaining } => remaining,
            ZoneState::Idle | ZoneState::Spent => 0.0,
        }
    }

    /// Apply the zone to the actor. Returns whether gravity changed.
    fn activate(&mut self, actor: &mut Actor, events: &mut Vec<SimEvent>) -> bool {
        if actor.gravity_locked || !self.state.is_ready() {
            return false;
        }
        let target = match self.config.kind {
            ZoneKind::Flip | ZoneKind::Toggle => -actor.gravity_scale,
            ZoneKind::Momentary => -1.0,
        };
        if target == actor.gravity_scale {
            return false;
        }

        actor.gravity_scale = target;
        actor.vy *= 0.5;
        actor.gravity_flip_timer = self.config.duration.unwrap_or(0.0);
        actor.gravity_flip_cooldown = self.config.cooldown;
        self.state = ZoneState::after_activation(&self.config);
        self.activations += 1;

        tracing::debug!(
            "Zone {} ({:?}) set gravity to {}",
            self.id,
            self.config.kind,
            target
        );
        events.push(SimEvent::GravityFlipped {
            zone: self.id,
            gravity_scale: target,
            sound: self.config.sound.clone(),
        });
        true
    }
}

/// Advance zone timers and apply membership changes for this frame.
pub fn update_zones(
    actor: &mut Actor,
    zones: &mut [GravityZone],
    dt: f32,
    events: &mut Vec<SimEvent>,
) {
    tick_flip_timer(actor, dt, events);
    actor.gravity_flip_cooldown = (actor.gravity_flip_cooldown - dt).max(0.0);
    for zone in zones.iter_mut() {
        zone.state = zone.state.tick(dt);
    }

    let body = actor.rect();
    let mut exited_momentary = Vec::new();
    for zone in zones.iter_mut() {
        let inside = zone.rect.overlaps(&body);
        let was_inside = actor.current_zones.contains(&zone.id);

        match (was_inside, inside) {
            (false, true) => {
                actor.current_zones.insert(zone.id);
                zone.activate(actor, events);
            },
            (true, true) if zone.config.trigger == ZoneTrigger::Contact => {
                zone.activate(actor, events);
            },
            (true, false) => {
                actor.current_zones.remove(&zone.id);
                if zone.config.kind == ZoneKind::Momentary {
                    exited_momentary.push(zone.id);
                }
            },
            _ => {},
        }
    }

    // Exits resolve after every entry so a hand-off between adjacent
    // momentary zones keeps gravity inverted.
    let still_momentary = zones
        .iter()
        .any(|z| z.config.kind == ZoneKind::Momentary && actor.current_zones.contains(&z.id));
    for id in exited_momentary {
        if still_momentary || actor.gravity_scale == 1.0 {
            continue;
        }
        actor.gravity_scale = 1.0;
        actor.gravity_flip_timer = 0.0;
        tracing::debug!("Left momentary zone {id}, gravity restored");
        events.push(SimEvent::GravityRestored { zone: Some(id) });
    }
}

fn tick_flip_timer(actor: &mut Actor, dt: f32, events: &mut Vec<SimEvent>) {
    if actor.gravity_flip_timer <= 0.0 {
        return;
    }
    actor.gravity_flip_timer -= dt;
    if actor.gravity_flip_timer > 0.0 {
        return;
    }
    actor.gravity_flip_timer = 0.0;
    if actor.gravity_scale != 1.0 {
        actor.gravity_scale = 1.0;
        tracing::debug!("Timed gravity flip expired");
        events.push(SimEvent::GravityRestored { zone: None });
    }
}

/// Return every zone to its freshly parsed state.
pub fn reset(zones: &mut [GravityZone]) {
    for zone in zones {
        zone.state = ZoneState::Idle;
        zone.activations = 0;
    }
}
