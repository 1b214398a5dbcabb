//! Body landmarks reported by pose estimators
//!
//! Coordinates are normalized to the frame (0-1, origin top-left), matching
//! what MediaPipe-style estimators emit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Landmarks the aggregator reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Nose,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
}

/// Position and visibility of one landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_visibility")]
    pub visibility: f64,
}

fn default_visibility() -> f64 {
    1.0
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            visibility: 1.0,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = visibility;
        self
    }
}

/// One sampled video frame
///
/// `landmarks` is empty when no body was detected in the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub landmarks: HashMap<Landmark, LandmarkPoint>,
}

impl PoseFrame {
    pub fn detected(&self) -> bool {
        !self.landmarks.is_empty()
    }

    pub fn get(&self, landmark: Landmark) -> Option<&LandmarkPoint> {
        self.landmarks.get(&landmark)
    }
}
