use std::cell::RefCell;
use std::rc::Rc;

use trickstep_core::clock::VirtualClock;
use trickstep_core::events::{DeathCause, SimEvent, dispatch_cues};
use trickstep_core::progress::{KeyValueStore, MemoryStore, ProgressSnapshot, StoreError};
use trickstep_core::test_helpers::CueRecorder;
use trickstep_sim::flow::FlowConfig;
use trickstep_sim::level::{LevelDef, ZoneOverride};
use trickstep_sim::parser::parse;
use trickstep_sim::physics::PhysicsConfig;
use trickstep_sim::{FrameInput, Game, GameState, LevelPack, SimConfig, SimulationState};

/// Exact in binary floating point, so timer arithmetic has no drift.
const DT: f32 = 1.0 / 16.0;

/// Store handle that outlives a `Game`, to check what was persisted.
#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0.borrow_mut().set(key, value)
    }
}

const PACK: &str = r########"
[[chapter]]
name = "One"

[[chapter.level]]
name = "walk"
grid = ["S.D", "###"]

[[chapter.level]]
name = "ledge"
grid = ["..S.D", "..###"]

[[chapter]]
name = "Two"

[[chapter.level]]
name = "last"
grid = ["S.D", "###"]
"########;

fn config() -> SimConfig {
    SimConfig {
        flow: FlowConfig {
            fade_duration: 0.125,
            level_complete_delay: 0.5,
            death_flash_duration: 0.25,
        },
        ..Default::default()
    }
}

fn new_game(store: SharedStore) -> Game {
    let pack = LevelPack::from_toml_str(PACK).unwrap();
    Game::new(pack, config(), Box::new(store), Box::new(VirtualClock::new()))
}

fn left() -> FrameInput {
    FrameInput {
        move_left: true,
        ..Default::default()
    }
}

fn right() -> FrameInput {
    FrameInput {
        move_right: true,
        ..Default::default()
    }
}

/// Run frames until an event matches, returning everything emitted.
fn run_until(
    game: &mut Game,
    input: FrameInput,
    max_frames: usize,
    done: impl Fn(&SimEvent) -> bool,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    for _ in 0..max_frames {
        let frame = game.frame(&input, DT);
        let finished = frame.iter().any(&done);
        events.extend(frame);
        if finished {
            return events;
        }
    }
    panic!("no matching event after {max_frames} frames: {events:?}");
}

fn start(game: &mut Game, level: usize) {
    assert_eq!(game.select_level(level), Ok(true));
    run_until(game, FrameInput::default(), 10, |e| {
        *e == SimEvent::LevelLoaded { level }
    });
    while game.flow().is_fading() {
        game.frame(&FrameInput::default(), DT);
    }
    assert_eq!(game.state(), GameState::Playing);
}

#[test]
fn completing_a_level_advances_within_the_chapter() {
    let store = SharedStore::default();
    let mut game = new_game(store.clone());
    start(&mut game, 0);

    let events = run_until(&mut game, right(), 20, |e| {
        matches!(e, SimEvent::LevelCompleted { .. })
    });
    assert!(events.contains(&SimEvent::DoorReached { level: 0 }));
    assert_eq!(
        events.last(),
        Some(&SimEvent::LevelCompleted {
            level: 0,
            deaths: 0,
            stars: 3
        })
    );
    assert_eq!(game.state(), GameState::LevelComplete);

    let events = run_until(&mut game, FrameInput::default(), 30, |e| {
        matches!(e, SimEvent::LevelLoaded { .. })
    });
    assert_eq!(events, vec![SimEvent::LevelLoaded { level: 1 }]);
    assert_eq!(game.state(), GameState::Playing);
    assert_eq!(game.sim().map(|s| s.name.as_str()), Some("ledge"));

    // Progress was written through to the store
    let reloaded = new_game(store);
    assert!(reloaded.progress().is_completed(0));
    assert_eq!(reloaded.progress().stars(0), 3);
    assert!(reloaded.progress().is_unlocked(1));
}

#[test]
fn door_completion_happens_once_and_timer_runs_to_the_end() {
    let mut game = new_game(SharedStore::default());
    start(&mut game, 0);
    run_until(&mut game, right(), 20, |e| {
        matches!(e, SimEvent::LevelCompleted { .. })
    });

    // Keep pushing into the door for the whole delay
    let mut frames = 0;
    while !game.flow().is_fading() {
        let events = game.frame(&right(), DT);
        let repeated = events.iter().any(|e| {
            matches!(
                e,
                SimEvent::LevelCompleted { .. } | SimEvent::DoorReached { .. }
            )
        });
        assert!(!repeated);
        frames += 1;
        assert!(frames <= 8, "level complete timer was restarted");
    }
    assert_eq!(frames, 8);
}

#[test]
fn falling_death_flashes_then_respawns_and_costs_a_star() {
    let store = SharedStore::default();
    {
        let mut progress = ProgressSnapshot::default();
        progress.record_completion(0, 3);
        let mut handle = store.clone();
        progress.save(&mut handle).unwrap();
    }
    let mut game = new_game(store.clone());
    start(&mut game, 1);
    let spawn = game.sim().map(|s| (s.actor.x, s.actor.y));

    let events = run_until(&mut game, left(), 40, |e| {
        matches!(e, SimEvent::ActorDied { .. })
    });
    assert_eq!(
        events.last(),
        Some(&SimEvent::ActorDied {
            cause: DeathCause::Fell
        })
    );
    assert_eq!(game.deaths(), 1);
    assert!(game.flow().is_death_flashing());

    // Four idle frames of flash, the last one respawns
    for _ in 0..3 {
        assert!(game.frame(&FrameInput::default(), DT).is_empty());
    }
    assert_eq!(
        game.frame(&FrameInput::default(), DT),
        vec![SimEvent::Respawned]
    );
    assert_eq!(game.sim().map(|s| (s.actor.x, s.actor.y)), spawn);

    let events = run_until(&mut game, right(), 20, |e| {
        matches!(e, SimEvent::LevelCompleted { .. })
    });
    assert_eq!(
        events.last(),
        Some(&SimEvent::LevelCompleted {
            level: 1,
            deaths: 1,
            stars: 2
        })
    );
    assert_eq!(game.progress().stars(1), 2);
}

#[test]
fn finishing_chapters_returns_to_select_then_menu() {
    let store = SharedStore::default();
    {
        let mut progress = ProgressSnapshot::default();
        progress.record_completion(0, 3);
        let mut handle = store.clone();
        progress.save(&mut handle).unwrap();
    }
    let mut game = new_game(store);

    start(&mut game, 1);
    run_until(&mut game, right(), 20, |e| {
        matches!(e, SimEvent::LevelCompleted { .. })
    });
    let events = run_until(&mut game, FrameInput::default(), 20, |e| {
        matches!(e, SimEvent::ChapterCompleted { .. })
    });
    assert_eq!(events, vec![SimEvent::ChapterCompleted { chapter: 0 }]);
    while game.flow().is_fading() {
        game.frame(&FrameInput::default(), DT);
    }
    assert_eq!(game.state(), GameState::ChapterSelect);
    assert!(game.sim().is_none());

    start(&mut game, 2);
    run_until(&mut game, right(), 20, |e| {
        matches!(e, SimEvent::LevelCompleted { .. })
    });
    let events = run_until(&mut game, FrameInput::default(), 20, |e| {
        matches!(e, SimEvent::ChapterCompleted { .. })
    });
    assert_eq!(events, vec![SimEvent::ChapterCompleted { chapter: 1 }]);
    while game.flow().is_fading() {
        game.frame(&FrameInput::default(), DT);
    }
    assert_eq!(game.state(), GameState::Menu);
    assert_eq!(game.progress().total_stars(), 9);
}

#[test]
fn events_map_to_cues() {
    let mut game = new_game(SharedStore::default());
    start(&mut game, 0);
    let events = run_until(&mut game, right(), 20, |e| {
        matches!(e, SimEvent::LevelCompleted { .. })
    });
    let mut recorder = CueRecorder::default();
    dispatch_cues(&events, &mut recorder);
    assert_eq!(recorder.played, vec!["door"]);
}

/// Walk right across a zone next to the spawn and collect the cues it plays.
fn cues_walking_right(sim: &mut SimulationState) -> Vec<String> {
    let mut events = Vec::new();
    for _ in 0..10 {
        sim.step(&right(), 1.0 / 60.0, &mut events);
    }
    let mut recorder = CueRecorder::default();
    dispatch_cues(&events, &mut recorder);
    recorder.played
}

#[test]
fn zone_sound_override_is_played() {
    let mut def = LevelDef::from_rows("whoosh", &["SG..", "####"]);
    def.gravity_zones = vec![ZoneOverride {
        sound: Some("whoosh".to_string()),
        ..Default::default()
    }];
    let geometry = parse(&def, &[]).unwrap();
    let mut sim = SimulationState::new(0, "whoosh", geometry, PhysicsConfig::default());

    let played = cues_walking_right(&mut sim);
    assert!(played.iter().any(|c| c == "whoosh"), "played={played:?}");
    assert!(!played.iter().any(|c| c == "gravity_flip"), "played={played:?}");
}

#[test]
fn chapter_zone_sound_reaches_its_levels() {
    let pack = LevelPack::from_toml_str(
        r########"
        [[chapter]]
        name = "Loud"
        gravity_zones = [{ sound = "boing" }]

        [[chapter.level]]
        name = "inherits"
        grid = ["SG..", "####"]

        [[chapter.level]]
        name = "replaces"
        grid = ["SG..", "####"]
        gravity_zones = [{ sound = "whoosh" }]
        "########,
    )
    .unwrap();

    let mut sim = SimulationState::load(&pack, 0, PhysicsConfig::default()).unwrap();
    assert!(cues_walking_right(&mut sim).contains(&"boing".to_string()));
    let mut sim = SimulationState::load(&pack, 1, PhysicsConfig::default()).unwrap();
    let played = cues_walking_right(&mut sim);
    assert!(played.contains(&"whoosh".to_string()), "played={played:?}");
    assert!(!played.contains(&"boing".to_string()));
}

#[test]
fn momentary_zone_inverts_only_while_inside() {
    let mut def = LevelDef::from_rows("momentary", &["........", "S.gg....", "########"]);
    // No cooldown, so bobbing across the zone edge re-enters immediately
    def.gravity_zones = vec![ZoneOverride {
        cooldown: Some(0.0),
        ..Default::default()
    }];
    let geometry = parse(&def, &[]).unwrap();
    let mut sim = SimulationState::new(0, "momentary", geometry, PhysicsConfig::default());
    let zone = sim.world.gravity_zones[0].rect;
    let mut events = Vec::new();

    let input = right();
    for _ in 0..40 {
        sim.step(&input, 1.0 / 60.0, &mut events);
        let inside = zone.overlaps(&sim.actor.rect());
        let expected = if inside { -1.0 } else { 1.0 };
        assert_eq!(sim.actor.gravity_scale, expected, "x={}", sim.actor.x);
    }
}

#[test]
fn builtin_levels_all_parse() {
    let pack = LevelPack::builtin().unwrap();
    for index in 0..pack.level_count() {
        let sim = SimulationState::load(&pack, index, PhysicsConfig::default()).unwrap();
        assert!(sim.world.door.is_some(), "level {index} has no door");
        assert!(sim.world.spawn.is_some(), "level {index} has no spawn");
    }
}
