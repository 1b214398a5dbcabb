//! Avatar animation adapters
//!
//! Hosted Audio2Face models answer with ARKit blendshape frames; the
//! procedural animator derives them locally from the speech envelope.

mod huggingface;
mod nvidia;
mod procedural;

pub use huggingface::{HuggingFaceAvatar, HuggingFaceConfig};
pub use nvidia::{NvidiaAvatar, NvidiaConfig};
pub use procedural::{ProceduralAvatar, ProceduralConfig};

use serde::Deserialize;

use coach_core::BLENDSHAPE_COUNT;

/// Blendshape payload shared by the hosted providers
#[derive(Debug, Deserialize)]
struct BlendshapeResponse {
    #[serde(default)]
    blendshapes: Vec<Vec<f32>>,
    #[serde(default)]
    fps: Option<u32>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Clamp weights into 0-1 and pad or cut frames to the ARKit layout
fn normalize_frames(frames: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    frames
        .into_iter()
        .map(|mut frame| {
            frame.resize(BLENDSHAPE_COUNT, 0.0);
            for weight in frame.iter_mut() {
                *weight = if weight.is_finite() {
                    weight.clamp(0.0, 1.0)
                } else {
                    0.0
                };
            }
            frame
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_normalized_to_layout() {
        let frames = normalize_frames(vec![vec![1.4, -0.2, f32::NAN], vec![0.5; 60]]);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.len() == BLENDSHAPE_COUNT));
        assert_eq!(&frames[0][..3], &[1.0, 0.0, 0.0]);
        assert_eq!(frames[1][51], 0.5);
    }
}
