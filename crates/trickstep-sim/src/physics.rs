use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::collision::{Rect, resolve_x, resolve_y};
use crate::parser::LevelGeometry;

/// Gravity acceleration (px/s^2, downward under normal gravity).
pub const GRAVITY: f32 = 1800.0;
/// Horizontal move speed (px/s).
pub const MOVE_SPEED: f32 = 300.0;
/// Jump impulse (px/s); negative is up under normal gravity.
pub const JUMP_FORCE: f32 = -720.0;
/// Actor width for AABB collision.
pub const ACTOR_WIDTH: f32 = 45.0;
/// Actor height for AABB collision.
pub const ACTOR_HEIGHT: f32 = 45.0;
/// Distance past the world edge at which a falling actor dies.
pub const FALL_MARGIN: f32 = 100.0;

/// Configurable physics parameters, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_force: f32,
    pub actor_width: f32,
    pub actor_height: f32,
    pub fall_margin: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            move_speed: MOVE_SPEED,
            jump_force: JUMP_FORCE,
            actor_width: ACTOR_WIDTH,
            actor_height: ACTOR_HEIGHT,
            fall_margin: FALL_MARGIN,
        }
    }
}

/// The controllable entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub width: f32,
    pub height: f32,
    pub on_ground: bool,
    /// Set when a jump fires; cleared only once the jump key is released.
    pub has_jumped: bool,
    /// +1 normal, -1 inverted.
    pub gravity_scale: f32,
    /// Seconds until gravity is forced back to normal; 0 = no pending revert.
    pub gravity_flip_timer: f32,
    /// Display-only countdown of the last zone's cooldown.
    pub gravity_flip_cooldown: f32,
    pub gravity_locked: bool,
    /// Zone ids the actor currently overlaps.
    pub current_zones: BTreeSet<usize>,
    /// Position at the start of the current frame.
    pub prev_x: f32,
    pub prev_y: f32,
}

impl Actor {
    pub fn new(x: f32, y: f32, config: &PhysicsConfig) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            width: config.actor_width,
            height: config.actor_height,
            on_ground: false,
            has_jumped: false,
            gravity_scale: 1.0,
            gravity_flip_timer: 0.0,
            gravity_flip_cooldown: 0.0,
            gravity_locked: false,
            current_zones: BTreeSet::new(),
            prev_x: x,
            prev_y: y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn prev_rect(&self) -> Rect {
        Rect::new(self.prev_x, self.prev_y, self.width, self.height)
    }

    pub fn is_inverted(&self) -> bool {
        self.gravity_scale < 0.0
    }
}

/// Movement intent sampled once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInput {
    pub move_left: bool,
    pub move_right: bool,
    pub jump_held: bool,
    pub restart: bool,
}

impl FrameInput {
    /// -1, 0, or +1. Opposing keys cancel.
    pub fn move_dir(&self) -> f32 {
        match (self.move_left, self.move_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Advance the actor one frame against the level's solid geometry.
pub fn step(
    actor: &mut Actor,
    input: &FrameInput,
    world: &LevelGeometry,
    config: &PhysicsConfig,
    dt: f32,
) {
    actor.prev_x = actor.x;
    actor.prev_y = actor.y;

    // Velocity is set, not accumulated
    actor.vx = input.move_dir() * config.move_speed;

    if !input.jump_held {
        actor.has_jumped = false;
    } else if actor.on_ground && !actor.has_jumped {
        actor.vy = config.jump_force * actor.gravity_scale;
        actor.on_ground = false;
        actor.has_jumped = true;
    }

    actor.vy += config.gravity * actor.gravity_scale * dt;

    move_horizontal(actor, world, dt);
    move_vertical(actor, world, dt);
}

fn move_horizontal(actor: &mut Actor, world: &LevelGeometry, dt: f32) {
    actor.x += actor.vx * dt;
    let max_x = (world.width - actor.width).max(0.0);
    actor.x = actor.x.clamp(0.0, max_x);

    for solid in world.solids() {
        if let Some(x) = resolve_x(&actor.rect(), actor.vx, solid) {
            actor.x = x;
        }
    }
}

fn move_vertical(actor: &mut Actor, world: &LevelGeometry, dt: f32) {
    actor.y += actor.vy * dt;
    actor.on_ground = false;

    for solid in world.solids() {
        if let Some(contact) = resolve_y(&actor.rect(), actor.vy, actor.gravity_scale, solid) {
            actor.y = contact.y;
            actor.vy = 0.0;
            if contact.landed {
                actor.on_ground = true;
            }
        }
    }
}

/// Whether the actor has left the world past the fall margin, in the
/// direction gravity pulls.
pub fn has_fallen(actor: &Actor, world: &LevelGeometry, config: &PhysicsConfig) -> bool {
    if actor.is_inverted() {
        actor.y + actor.height < -config.fall_margin
    } else {
        actor.y > world.height + config.fall_margin
    }
}
