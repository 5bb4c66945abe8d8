pub mod config;
pub mod script;
pub mod store;

use serde::Serialize;

use trickstep_core::clock::VirtualClock;
use trickstep_core::events::{CueError, CueSink, SimEvent, dispatch_cues};
use trickstep_core::progress::KeyValueStore;
use trickstep_sim::{Game, GameState, LevelError, LevelPack, SimConfig};

use config::RunnerConfig;
use script::input_at;

/// Outcome of a headless run, printed as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub level: usize,
    pub name: String,
    /// Frames simulated, fades included.
    pub frames: usize,
    /// Frames in which the level was actually being played.
    pub play_frames: usize,
    pub deaths: u32,
    pub hazards_triggered: usize,
    pub gravity_flips: usize,
    pub completed: bool,
    pub stars: u8,
    pub total_stars: u32,
}

/// Sends cues to the log instead of a speaker.
#[derive(Debug, Default)]
pub struct LogCueSink {
    pub played: usize,
}

impl CueSink for LogCueSink {
    fn play(&mut self, cue: &str) -> Result<(), CueError> {
        self.played += 1;
        tracing::debug!("cue: {cue}");
        Ok(())
    }
}

/// Play `config.level` with the scripted input until it is completed or the
/// frame budget runs out.
pub fn run(
    config: &RunnerConfig,
    sim_config: SimConfig,
    pack: LevelPack,
    store: Box<dyn KeyValueStore>,
) -> Result<RunSummary, LevelError> {
    let clock = VirtualClock::new();
    let mut game = Game::new(pack, sim_config, store, Box::new(clock.clone()));
    game.select_level(config.level)?;

    let name = game
        .pack()
        .locate(config.level)
        .map(|cursor| game.pack().level(cursor).name.clone())?;
    let mut summary = RunSummary {
        level: config.level,
        name,
        frames: 0,
        play_frames: 0,
        deaths: 0,
        hazards_triggered: 0,
        gravity_flips: 0,
        completed: false,
        stars: 0,
        total_stars: 0,
    };
    let mut cues = LogCueSink::default();

    while summary.frames < config.max_frames {
        let playing = game.state() == GameState::Playing && !game.flow().is_fading();
        let input = if playing {
            input_at(&config.script, summary.play_frames)
        } else {
            Default::default()
        };

        let events = game.advance(&input);
        clock.advance(f64::from(config.fixed_step));
        summary.frames += 1;
        if playing {
            summary.play_frames += 1;
        }
        dispatch_cues(&events, &mut cues);

        for event in &events {
            match event {
                SimEvent::HazardActivated { .. } => summary.hazards_triggered += 1,
                SimEvent::GravityFlipped { .. } => summary.gravity_flips += 1,
                SimEvent::ActorDied { cause } => {
                    summary.deaths += 1;
                    tracing::info!("Died at frame {}: {cause:?}", summary.frames);
                },
                SimEvent::LevelCompleted { stars, .. } => {
                    summary.completed = true;
                    summary.stars = *stars;
                },
                _ => {},
            }
        }
        if summary.completed {
            break;
        }
    }

    if !summary.completed {
        tracing::warn!(
            "Level {} not completed within {} frames",
            config.level,
            config.max_frames
        );
    }
    summary.total_stars = game.progress().total_stars();
    tracing::info!("Run finished after {} frames, {} cues", summary.frames, cues.played);
    Ok(summary)
}
