use serde::{Deserialize, Serialize};

/// Why the actor died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Touched a spike (moving or not).
    Spike { spike: usize },
    /// Left the world past the fall margin.
    Fell,
}

/// Events emitted by the simulation during a frame.
///
/// Renderers and audio consume these; the simulation never reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    LevelLoaded { level: usize },
    HazardActivated { spike: usize },
    GravityFlipped {
        zone: usize,
        gravity_scale: f32,
        /// Cue configured on the zone, replacing the stock flip sound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sound: Option<String>,
    },
    GravityRestored { zone: Option<usize> },
    ActorDied { cause: DeathCause },
    Respawned,
    DoorReached { level: usize },
    LevelCompleted { level: usize, deaths: u32, stars: u8 },
    ChapterCompleted { chapter: usize },
}

impl SimEvent {
    /// Name of the sound cue for this event, if it has one.
    pub fn cue(&self) -> Option<&str> {
        match self {
            SimEvent::HazardActivated { .. } => Some("spike"),
            SimEvent::GravityFlipped { sound, .. } => {
                Some(sound.as_deref().unwrap_or("gravity_flip"))
            },
            SimEvent::GravityRestored { .. } => Some("gravity_restore"),
            SimEvent::ActorDied { .. } => Some("death"),
            SimEvent::DoorReached { .. } => Some("door"),
            SimEvent::ChapterCompleted { .. } => Some("chapter_complete"),
            SimEvent::LevelLoaded { .. }
            | SimEvent::Respawned
            | SimEvent::LevelCompleted { .. } => None,
        }
    }
}

/// Failure reported by a [`CueSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueError(pub String);

impl std::fmt::Display for CueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cue playback failed: {}", self.0)
    }
}

impl std::error::Error for CueError {}

/// Fire-and-forget consumer of sound cues (audio backends, test recorders).
pub trait CueSink {
    fn play(&mut self, cue: &str) -> Result<(), CueError>;
}

/// Forward every cue in `events` to `sink`. Playback failures are logged and
/// otherwise ignored so they can never stall a frame.
pub fn dispatch_cues(events: &[SimEvent], sink: &mut dyn CueSink) {
    for cue in events.iter().filter_map(SimEvent::cue) {
        if let Err(e) = sink.play(cue) {
            tracing::debug!("Dropping cue {cue}: {e}");
        }
    }
}
