//! Facial animation produced from speech audio

use serde::{Deserialize, Serialize};

/// ARKit blendshape count; every frame carries this many weights
pub const BLENDSHAPE_COUNT: usize = 52;

/// Indices of the blendshapes the procedural animator drives
pub mod blendshape {
    pub const JAW_OPEN: usize = 0;
    pub const MOUTH_SMILE: usize = 1;
    pub const EYE_BLINK: usize = 25;
}

/// Per-frame blendshape weights in 0-1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAnimation {
    /// Provider or model that produced the frames
    pub model: String,
    pub fps: u32,
    pub duration_seconds: f64,
    pub frames: Vec<Vec<f32>>,
}

impl FaceAnimation {
    /// Duration derived from the frame count when the provider omits it
    pub fn from_frames(model: impl Into<String>, fps: u32, frames: Vec<Vec<f32>>) -> Self {
        let duration_seconds = if fps == 0 {
            0.0
        } else {
            frames.len() as f64 / fps as f64
        };
        Self {
            model: model.into(),
            fps,
            duration_seconds,
            frames,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
