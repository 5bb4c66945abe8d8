use serde::Serialize;

use trickstep_core::events::{DeathCause, SimEvent};

use crate::error::LevelError;
use crate::level::LevelPack;
use crate::parser::{LevelGeometry, TILE_SIZE, parse};
use crate::physics::{self, Actor, FrameInput, PhysicsConfig};
use crate::spikes;
use crate::zones;

/// Result of one simulation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    Died(DeathCause),
    ReachedDoor,
}

/// Read-only view of a frame for renderers.
#[derive(Debug, Serialize)]
pub struct RenderSnapshot<'a> {
    pub level_index: usize,
    pub name: &'a str,
    pub actor: &'a Actor,
    pub world: &'a LevelGeometry,
}

/// Everything one level instance mutates while it is played.
///
/// `template` keeps the freshly parsed geometry so a respawn can restore spikes
/// and zones wholesale instead of resetting them field by field.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub level_index: usize,
    pub name: String,
    template: LevelGeometry,
    pub world: LevelGeometry,
    pub actor: Actor,
    pub physics: PhysicsConfig,
}

impl SimulationState {
    pub fn new(
        level_index: usize,
        name: impl Into<String>,
        geometry: LevelGeometry,
        physics: PhysicsConfig,
    ) -> Self {
        let actor = spawn_actor(&geometry, &physics);
        Self {
            level_index,
            name: name.into(),
            world: geometry.clone(),
            template: geometry,
            actor,
            physics,
        }
    }

    /// Parse level `index` of `pack` into a fresh instance.
    pub fn load(
        pack: &LevelPack,
        index: usize,
        physics: PhysicsConfig,
    ) -> Result<Self, LevelError> {
        let cursor = pack.locate(index)?;
        let level = pack.level(cursor);
        let geometry = parse(level, &pack.chapter(cursor).gravity_zones)?;
        tracing::info!(
            "Loaded level {index} '{}' ({} spikes, {} zones)",
            level.name,
            geometry.spikes.len(),
            geometry.gravity_zones.len()
        );
        Ok(Self::new(index, level.name.clone(), geometry, physics))
    }

    /// Restore the pristine level and put a new actor at the spawn point.
    pub fn respawn(&mut self) {
        self.world = self.template.clone();
        self.actor = spawn_actor(&self.world, &self.physics);
    }

    /// Run one frame: physics, spike triggers, spike animation, zones, then
    /// death and door checks.
    pub fn step(
        &mut self,
        input: &FrameInput,
        dt: f32,
        events: &mut Vec<SimEvent>,
    ) -> StepOutcome {
        physics::step(&mut self.actor, input, &self.world, &self.physics, dt);
        spikes::check_triggers(&self.actor, &mut self.world.spikes, events);
        spikes::advance(&mut self.world.spikes, dt);
        zones::update_zones(&mut self.actor, &mut self.world.gravity_zones, dt, events);

        let cause = if let Some(spike) = spikes::touching(&self.actor, &self.world.spikes) {
            Some(DeathCause::Spike { spike })
        } else if physics::has_fallen(&self.actor, &self.world, &self.physics) {
            Some(DeathCause::Fell)
        } else {
            None
        };
        if let Some(cause) = cause {
            tracing::debug!("Actor died in level {}: {cause:?}", self.level_index);
            events.push(SimEvent::ActorDied { cause });
            return StepOutcome::Died(cause);
        }

        let body = self.actor.rect();
        if self.world.door.is_some_and(|door| door.overlaps(&body)) {
            events.push(SimEvent::DoorReached {
                level: self.level_index,
            });
            return StepOutcome::ReachedDoor;
        }
        StepOutcome::Running
    }

    pub fn snapshot(&self) -> RenderSnapshot<'_> {
        RenderSnapshot {
            level_index: self.level_index,
            name: &self.name,
            actor: &self.actor,
            world: &self.world,
        }
    }

    /// MessagePack encoding of [`Self::snapshot`].
    pub fn encode_snapshot(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(&self.snapshot())
    }
}

/// Where a new actor appears: centred in the spawn cell and standing on its
/// floor, or one tile in from the top-left corner when there is no spawn.
pub fn spawn_position(world: &LevelGeometry, physics: &PhysicsConfig) -> (f32, f32) {
    match world.spawn {
        Some(cell) => (
            cell.x + (cell.w - physics.actor_width) / 2.0,
            cell.bottom() - physics.actor_height,
        ),
        None => (TILE_SIZE, TILE_SIZE),
    }
}

fn spawn_actor(world: &LevelGeometry, physics: &PhysicsConfig) -> Actor {
    let (x, y) = spawn_position(world, physics);
    let mut actor = Actor::new(x, y, physics);
    actor.gravity_locked = world.gravity_locked;
    actor
}
