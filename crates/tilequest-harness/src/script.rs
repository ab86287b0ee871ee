//! Scripted input timelines.
//!
//! A script is a RON list of steps. Each step holds a movement intent for a
//! number of frames; its actions fire on the first of those frames.
//!
//! ```ron
//! [
//!     (frames: 30, intent: (x: 1.0, y: 0.0)),
//!     (frames: 20, actions: [BasicAttack]),
//!     (frames: 1, actions: [SwapWeapon, RangedShot]),
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tilequest_common::{ConfigError, ConfigResult};
use tilequest_sim::{MoveIntent, PlayerAction};
use tracing::info;

fn one() -> u32 {
    1
}

/// A stretch of frames with the same intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Frames this step lasts
    #[serde(default = "one")]
    pub frames: u32,
    /// Movement held for the whole step
    #[serde(default)]
    pub intent: MoveIntent,
    /// Actions issued on the step's first frame
    #[serde(default)]
    pub actions: Vec<PlayerAction>,
}

/// Input for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    /// Movement
    pub intent: MoveIntent,
    /// Actions
    pub actions: Vec<PlayerAction>,
}

/// A parsed input timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputScript {
    steps: Vec<ScriptStep>,
}

impl InputScript {
    /// Parses a RON document.
    pub fn from_ron_str(source: &str) -> ConfigResult<Self> {
        let steps: Vec<ScriptStep> =
            ron::from_str(source).map_err(|e| ConfigError::Script(e.to_string()))?;
        Ok(Self { steps })
    }

    /// Reads and parses a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let script = Self::from_ron_str(&source)?;
        info!(
            "Loaded input script {} ({} steps, {} frames)",
            path.display(),
            script.steps.len(),
            script.total_frames()
        );
        Ok(script)
    }

    /// Steps in order.
    #[must_use]
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Frames covered by all steps.
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.frames)).sum()
    }

    /// Per-frame input, idle once the script runs out.
    pub fn frames(&self) -> impl Iterator<Item = FrameInput> + '_ {
        let scripted = self.steps.iter().flat_map(|step| {
            (0..step.frames).map(move |i| FrameInput {
                intent: step.intent,
                actions: if i == 0 {
                    step.actions.clone()
                } else {
                    Vec::new()
                },
            })
        });
        scripted.chain(std::iter::repeat_with(|| FrameInput {
            intent: MoveIntent::NONE,
            actions: Vec::new(),
        }))
    }
}
