use serde::{Deserialize, Serialize};

use trickstep_sim::FrameInput;

/// Hold a set of keys for a number of frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptStep {
    pub frames: usize,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub restart: bool,
}

impl ScriptStep {
    pub fn input(&self) -> FrameInput {
        FrameInput {
            move_left: self.left,
            move_right: self.right,
            jump_held: self.jump,
            restart: self.restart,
        }
    }
}

/// Input for play frame `frame` of `script`. Past the end the final step is
/// held; an empty script means no input.
pub fn input_at(script: &[ScriptStep], frame: usize) -> FrameInput {
    let mut start = 0;
    for step in script {
        if frame < start + step.frames {
            return step.input();
        }
        start += step.frames;
    }
    script.last().map(ScriptStep::input).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(frames: usize, right: bool, jump: bool) -> ScriptStep {
        ScriptStep {
            frames,
            right,
            jump,
            ..Default::default()
        }
    }

    #[test]
    fn steps_cover_their_frame_ranges() {
        let script = vec![step(2, true, false), step(3, true, true)];
        assert!(!input_at(&script, 1).jump_held);
        assert!(input_at(&script, 2).jump_held);
        assert!(input_at(&script, 4).jump_held);
    }

    #[test]
    fn last_step_repeats() {
        let script = vec![step(1, false, false), step(1, true, false)];
        assert!(input_at(&script, 100).move_right);
    }

    #[test]
    fn empty_script_is_idle() {
        assert_eq!(input_at(&[], 0), FrameInput::default());
    }
}
