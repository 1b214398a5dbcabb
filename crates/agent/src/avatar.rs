//! Avatar animation
//!
//! Turns speech audio into per-frame blendshape weights for a talking
//! head. Audio arrives either as an upload or as the URL of a file this
//! server already stored, such as a synthesized reply.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use coach_core::{AudioClip, AudioFormat, AvatarAnimator, Error, FaceAnimation, Result};
use coach_persistence::{FileKind, SessionStore};

use crate::instrument::timed;

/// Frames for one clip
#[derive(Debug, Clone, Serialize)]
pub struct AnimationReply {
    pub model: String,
    pub fps: u32,
    pub duration_seconds: f64,
    pub frame_count: usize,
    pub blendshapes: Vec<Vec<f32>>,
    /// Where the frames were saved, for stored audio only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blendshapes_url: Option<String>,
}

impl From<FaceAnimation> for AnimationReply {
    fn from(animation: FaceAnimation) -> Self {
        Self {
            model: animation.model,
            fps: animation.fps,
            duration_seconds: animation.duration_seconds,
            frame_count: animation.frames.len(),
            blendshapes: animation.frames,
            blendshapes_url: None,
        }
    }
}

pub struct AvatarService {
    store: Arc<dyn SessionStore>,
    animator: Arc<dyn AvatarAnimator>,
}

impl AvatarService {
    pub fn new(store: Arc<dyn SessionStore>, animator: Arc<dyn AvatarAnimator>) -> Self {
        Self { store, animator }
    }

    pub fn provider_name(&self) -> &str {
        self.animator.provider_name()
    }

    pub async fn animate(&self, clip: &AudioClip) -> Result<AnimationReply> {
        if clip.is_empty() {
            return Err(Error::Validation("audio must not be empty".to_string()));
        }

        let animation = timed("avatar", self.animator.animate(clip)).await?;
        if animation.is_empty() {
            return Err(Error::Animation(format!(
                "{} returned no frames",
                self.animator.provider_name()
            )));
        }

        metrics::counter!("coach_animations_total").increment(1);
        tracing::debug!(
            provider = self.animator.provider_name(),
            frames = animation.frame_count(),
            fps = animation.fps,
            "Animation generated"
        );
        Ok(animation.into())
    }

    /// Animate audio this server already stored and save the frames beside it
    pub async fn animate_stored(&self, audio_url: &str) -> Result<AnimationReply> {
        let (session_id, kind, audio) = self.store.locate_url(audio_url)?;
        if kind != FileKind::Audio {
            return Err(Error::Validation(format!("{} is not an audio file", audio_url)));
        }

        let data = match tokio::fs::read(&audio.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("audio {}", audio_url)));
            },
            Err(e) => return Err(e.into()),
        };

        let file_name = audio
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let clip = AudioClip::new(data, AudioFormat::detect(None, Some(&file_name)));
        let mut reply = self.animate(&clip).await?;

        let stem = Path::new(&file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let body = serde_json::to_vec(&reply)?;
        let stored = self
            .store
            .attach_file(&session_id, FileKind::Animation, &format!("{}.json", stem), &body)
            .await?;

        tracing::info!(session_id = %session_id, url = %stored.url, "Saved animation");
        reply.blendshapes_url = Some(stored.url);
        Ok(reply)
    }
}
