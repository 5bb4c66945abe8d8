use serde::Serialize;

use trickstep_core::clock::{Clock, FrameClock};
use trickstep_core::events::{DeathCause, SimEvent};
use trickstep_core::progress::{KeyValueStore, ProgressSnapshot, stars_for_deaths};

use crate::config::SimConfig;
use crate::error::LevelError;
use crate::flow::{FadeStep, Flow, GameState};
use crate::level::LevelPack;
use crate::physics::FrameInput;
use crate::simulation::{SimulationState, StepOutcome};

/// One row of the level-select screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    pub index: usize,
    pub chapter: usize,
    pub name: String,
    pub unlocked: bool,
    pub completed: bool,
    pub stars: u8,
}

/// Owns the flow machine, the active level instance and player progress.
pub struct Game {
    pack: LevelPack,
    config: SimConfig,
    flow: Flow,
    sim: Option<SimulationState>,
    /// Parsed level waiting for the fade midpoint.
    pending: Option<SimulationState>,
    deaths: u32,
    progress: ProgressSnapshot,
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    frame_clock: FrameClock,
    restart_latched: bool,
}

impl Game {
    pub fn new(
        pack: LevelPack,
        config: SimConfig,
        store: Box<dyn KeyValueStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let progress = ProgressSnapshot::load(&*store);
        tracing::info!(
            "Game ready: {} levels, {} completed, {} stars",
            pack.level_count(),
            progress.completed.len(),
            progress.total_stars()
        );
        Self {
            flow: Flow::new(config.flow.clone()),
            frame_clock: FrameClock::new(config.frame.clone()),
            pack,
            config,
            sim: None,
            pending: None,
            deaths: 0,
            progress,
            store,
            clock,
            restart_latched: false,
        }
    }

    pub fn state(&self) -> GameState {
        self.flow.state()
    }

    pub fn fade_alpha(&self) -> f32 {
        self.flow.fade_alpha()
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// The level being played, if any.
    pub fn sim(&self) -> Option<&SimulationState> {
        self.sim.as_ref()
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        &self.progress
    }

    pub fn pack(&self) -> &LevelPack {
        &self.pack
    }

    /// Deaths in the current attempt.
    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Parse level `index` and fade into it.
    ///
    /// Returns `Ok(false)` when a fade is already running and the request was
    /// dropped.
    pub fn select_level(&mut self, index: usize) -> Result<bool, LevelError> {
        self.pack.locate(index)?;
        if !self.progress.is_unlocked(index) {
            return Err(LevelError::Locked(index));
        }
        if self.flow.is_fading() {
            tracing::debug!("Ignoring level {index} during a fade");
            return Ok(false);
        }
        let sim = SimulationState::load(&self.pack, index, self.config.physics.clone())?;
        if !self.flow.request(GameState::Playing) {
            return Ok(false);
        }
        self.pending = Some(sim);
        Ok(true)
    }

    /// Navigate to a menu screen. Play states are only reachable through
    /// [`Game::select_level`] and pausing.
    pub fn open(&mut self, state: GameState) -> bool {
        match state {
            GameState::Playing | GameState::Paused | GameState::LevelComplete => false,
            _ => self.flow.request(state),
        }
    }

    /// Read the clock and run one frame with a capped delta.
    pub fn advance(&mut self, input: &FrameInput) -> Vec<SimEvent> {
        let dt = self.frame_clock.delta(self.clock.now_secs());
        self.frame(input, dt)
    }

    /// Run one frame with an explicit delta.
    pub fn frame(&mut self, input: &FrameInput, dt: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        match self.flow.tick_fade(dt) {
            FadeStep::Fading => return events,
            FadeStep::Switched(state) => {
                self.on_enter(state, &mut events);
                return events;
            },
            FadeStep::Idle => {},
        }

        match self.flow.state() {
            GameState::Playing => self.update_playing(input, dt, &mut events),
            GameState::LevelComplete => self.update_level_complete(dt, &mut events),
            _ => {},
        }
        events
    }

    pub fn blur(&mut self) {
        self.flow.blur();
    }

    pub fn focus(&mut self) {
        if self.flow.focus() {
            tracing::debug!("Resumed on focus");
        }
        self.frame_clock.resync(self.clock.now_secs());
    }

    pub fn toggle_pause(&mut self) -> GameState {
        let state = self.flow.toggle_pause();
        if state == GameState::Playing {
            self.frame_clock.resync(self.clock.now_secs());
        }
        state
    }

    pub fn set_cosmetic(&mut self, key: &str, value: &str) {
        self.progress.set_cosmetic(key, value);
        self.persist();
    }

    pub fn level_summaries(&self) -> Vec<LevelSummary> {
        self.pack
            .chapters
            .iter()
            .enumerate()
            .flat_map(|(chapter, c)| c.levels.iter().map(move |l| (chapter, l)))
            .enumerate()
            .map(|(index, (chapter, level))| LevelSummary {
                index,
                chapter,
                name: level.name.clone(),
                unlocked: self.progress.is_unlocked(index),
                completed: self.progress.is_completed(index),
                stars: self.progress.stars(index),
            })
            .collect()
    }

    fn on_enter(&mut self, state: GameState, events: &mut Vec<SimEvent>) {
        match state {
            GameState::Playing => {
                if let Some(sim) = self.pending.take() {
                    events.push(SimEvent::LevelLoaded {
                        level: sim.level_index,
                    });
                    self.sim = Some(sim);
                    self.deaths = 0;
                    self.restart_latched = false;
                }
            },
            GameState::Paused | GameState::LevelComplete => {},
            _ => {
                self.sim = None;
                self.pending = None;
            },
        }
    }

    fn update_playing(&mut self, input: &FrameInput, dt: f32, events: &mut Vec<SimEvent>) {
        let restart = input.restart && !self.restart_latched;
        self.restart_latched = input.restart;
        let Some(sim) = self.sim.as_mut() else {
            return;
        };

        if self.flow.is_death_flashing() {
            if self.flow.tick_death_flash(dt) {
                sim.respawn();
                events.push(SimEvent::Respawned);
            }
            return;
        }
        if restart {
            sim.respawn();
            events.push(SimEvent::Respawned);
            return;
        }

        let level = sim.level_index;
        match sim.step(input, dt, events) {
            StepOutcome::Running => {},
            StepOutcome::Died(cause) => self.on_death(cause),
            StepOutcome::ReachedDoor => self.complete_level(level, events),
        }
    }

    fn on_death(&mut self, cause: DeathCause) {
        self.deaths += 1;
        self.flow.start_death_flash();
        tracing::debug!("Death #{} ({cause:?})", self.deaths);
    }

    fn complete_level(&mut self, level: usize, events: &mut Vec<SimEvent>) {
        if !self.flow.enter_level_complete() {
            return;
        }
        let stars = stars_for_deaths(self.deaths);
        self.progress.record_completion(level, stars);
        self.persist();
        tracing::info!(
            "Level {level} complete: {} deaths, {stars} stars",
            self.deaths
        );
        events.push(SimEvent::LevelCompleted {
            level,
            deaths: self.deaths,
            stars,
        });
    }

    fn update_level_complete(&mut self, dt: f32, events: &mut Vec<SimEvent>) {
        if !self.flow.tick_level_complete(dt) {
            return;
        }
        let Some(level) = self.sim.as_ref().map(|s| s.level_index) else {
            return;
        };
        let Ok(cursor) = self.pack.locate(level) else {
            self.flow.request(GameState::Menu);
            return;
        };

        let chapter_len = self.pack.chapter(cursor).levels.len();
        if cursor.level + 1 < chapter_len {
            match SimulationState::load(&self.pack, level + 1, self.config.physics.clone()) {
                Ok(next) => {
                    self.pending = Some(next);
                    self.flow.request(GameState::Playing);
                },
                Err(e) => {
                    tracing::warn!("Failed to load level {}: {e}", level + 1);
                    self.flow.request(GameState::ChapterSelect);
                },
            }
            return;
        }

        events.push(SimEvent::ChapterCompleted {
            chapter: cursor.chapter,
        });
        let last_chapter = cursor.chapter + 1 >= self.pack.chapters.len();
        tracing::info!(
            "Chapter {} '{}' complete",
            cursor.chapter,
            self.pack.chapter(cursor).name
        );
        self.flow.request(if last_chapter {
            GameState::Menu
        } else {
            GameState::ChapterSelect
        });
    }

    /// Write progress; failures are logged and never reach the frame loop.
    fn persist(&mut self) {
        if let Err(e) = self.progress.save(&mut *self.store) {
            tracing::warn!("Failed to save progress: {e}");
        }
    }
}
