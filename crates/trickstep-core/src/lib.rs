pub mod clock;
pub mod events;
pub mod progress;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::events::{CueError, CueSink};
    use crate::progress::{KeyValueStore, StoreError};

    /// A store whose every operation fails, for exercising recovery paths.
    #[derive(Debug, Default)]
    pub struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io("disk on fire".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io("disk on fire".to_string()))
        }
    }

    /// Records every cue it is asked to play.
    #[derive(Debug, Default)]
    pub struct CueRecorder {
        pub played: Vec<String>,
    }

    impl CueSink for CueRecorder {
        fn play(&mut self, cue: &str) -> Result<(), CueError> {
            self.played.push(cue.to_string());
            Ok(())
        }
    }

    /// Assert two floats agree within `eps`, with a readable failure message.
    pub fn assert_close(actual: f32, expected: f32, eps: f32) {
        assert!(
            (actual - expected).abs() <= eps,
            "expected {expected} ± {eps}, got {actual}"
        );
    }
}
