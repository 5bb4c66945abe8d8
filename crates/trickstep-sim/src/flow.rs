use serde::{Deserialize, Serialize};

/// Top-level mode of the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    #[default]
    Menu,
    Settings,
    ChapterSelect,
    LevelSelect,
    Customize,
    Playing,
    Paused,
    LevelComplete,
}

/// Screen fade between two states. The state switch happens when the
/// fade-out finishes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Transition {
    #[default]
    None,
    FadeOut { elapsed: f32 },
    FadeIn { elapsed: f32 },
}

/// What [`Flow::tick_fade`] did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStep {
    /// No fade in progress; per-state logic may run.
    Idle,
    Fading,
    /// The fade reached its midpoint and the state changed.
    Switched(GameState),
}

/// Timings for the flow machine, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Length of each fade half, in seconds.
    pub fade_duration: f32,
    /// Time spent on the level-complete screen before moving on.
    pub level_complete_delay: f32,
    /// Death flash shown before respawning.
    pub death_flash_duration: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            fade_duration: 0.3,
            level_complete_delay: 1.5,
            death_flash_duration: 0.4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Flow {
    config: FlowConfig,
    state: GameState,
    transition: Transition,
    pending: Option<GameState>,
    level_complete_timer: Option<f32>,
    death_flash: Option<f32>,
    paused_by_blur: bool,
    /// Focus lost mid-fade, applied when the fade ends.
    blur_pending: bool,
}

impl Flow {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// State the current fade will switch to.
    pub fn pending(&self) -> Option<GameState> {
        self.pending
    }

    pub fn is_fading(&self) -> bool {
        self.transition != Transition::None
    }

    /// Start a fade to `target`. Refused while another fade is running.
    pub fn request(&mut self, target: GameState) -> bool {
        if self.is_fading() {
            tracing::debug!("Ignoring transition to {target:?} during a fade");
            return false;
        }
        self.pending = Some(target);
        self.transition = Transition::FadeOut { elapsed: 0.0 };
        true
    }

    pub fn tick_fade(&mut self, dt: f32) -> FadeStep {
        let duration = self.config.fade_duration;
        match self.transition {
            Transition::None => FadeStep::Idle,
            Transition::FadeOut { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed < duration {
                    self.transition = Transition::FadeOut { elapsed };
                    return FadeStep::Fading;
                }
                let target = self.pending.take().unwrap_or(self.state);
                self.enter(target);
                self.transition = Transition::FadeIn { elapsed: 0.0 };
                FadeStep::Switched(target)
            },
            Transition::FadeIn { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed < duration {
                    self.transition = Transition::FadeIn { elapsed };
                } else {
                    self.transition = Transition::None;
                    if std::mem::take(&mut self.blur_pending) {
                        self.blur();
                    }
                }
                FadeStep::Fading
            },
        }
    }

    /// Opacity of the fade overlay, 0 (clear) to 1 (black).
    pub fn fade_alpha(&self) -> f32 {
        let duration = self.config.fade_duration;
        let progress = |elapsed: f32| {
            if duration > 0.0 {
                (elapsed / duration).clamp(0.0, 1.0)
            } else {
                1.0
            }
        };
        match self.transition {
            Transition::None => 0.0,
            Transition::FadeOut { elapsed } => progress(elapsed),
            Transition::FadeIn { elapsed } => 1.0 - progress(elapsed),
        }
    }

    fn enter(&mut self, state: GameState) {
        tracing::debug!("Game state {:?} -> {state:?}", self.state);
        self.state = state;
        self.level_complete_timer = None;
        self.death_flash = None;
        self.paused_by_blur = false;
    }

    /// Switch to `LevelComplete` and start its timer. Only the first call
    /// while playing has any effect.
    pub fn enter_level_complete(&mut self) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        self.enter(GameState::LevelComplete);
        self.level_complete_timer = Some(self.config.level_complete_delay);
        true
    }

    /// Count down the level-complete screen. Returns true once, when it ends.
    pub fn tick_level_complete(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.level_complete_timer else {
            return false;
        };
        let remaining = remaining - dt;
        if remaining > 0.0 {
            self.level_complete_timer = Some(remaining);
            false
        } else {
            self.level_complete_timer = None;
            true
        }
    }

    pub fn level_complete_remaining(&self) -> Option<f32> {
        self.level_complete_timer
    }

    pub fn start_death_flash(&mut self) {
        if self.death_flash.is_none() {
            self.death_flash = Some(self.config.death_flash_duration);
        }
    }

    pub fn is_death_flashing(&self) -> bool {
        self.death_flash.is_some()
    }

    /// Count down the death flash. Returns true once, when it ends.
    pub fn tick_death_flash(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.death_flash else {
            return false;
        };
        let remaining = remaining - dt;
        if remaining > 0.0 {
            self.death_flash = Some(remaining);
            false
        } else {
            self.death_flash = None;
            true
        }
    }

    /// Window lost focus: pause if playing. During a fade the pause is
    /// deferred until the fade ends.
    pub fn blur(&mut self) {
        if self.is_fading() {
            self.blur_pending = true;
            return;
        }
        if self.state == GameState::Playing {
            self.state = GameState::Paused;
            self.paused_by_blur = true;
            tracing::debug!("Paused on blur");
        }
    }

    /// Window regained focus: resume a pause that blur caused. Returns whether
    /// play resumed.
    pub fn focus(&mut self) -> bool {
        self.blur_pending = false;
        if self.state == GameState::Paused && self.paused_by_blur {
            self.state = GameState::Playing;
            self.paused_by_blur = false;
            return true;
        }
        false
    }

    /// Explicit pause key. Returns the resulting state.
    pub fn toggle_pause(&mut self) -> GameState {
        if !self.is_fading() {
            match self.state {
                GameState::Playing => self.state = GameState::Paused,
                GameState::Paused => {
                    self.state = GameState::Playing;
                    self.paused_by_blur = false;
                },
                _ => {},
            }
        }
        self.state
    }
}
