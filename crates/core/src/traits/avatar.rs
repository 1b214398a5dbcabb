//! Avatar animation trait

use async_trait::async_trait;

use crate::animation::FaceAnimation;
use crate::audio::AudioClip;
use crate::Result;

/// Speech audio -> facial animation
///
/// Implementations:
/// - `NvidiaAvatar` - NVIDIA Audio2Face-3D over the NIM API
/// - `HuggingFaceAvatar` - Audio2Face through the HuggingFace inference API
/// - `ProceduralAvatar` - local animation driven by the speech envelope
///
/// Fails with `Error::Animation` when the provider is unreachable or the
/// audio cannot be read.
#[async_trait]
pub trait AvatarAnimator: Send + Sync + 'static {
    async fn animate(&self, audio: &AudioClip) -> Result<FaceAnimation>;

    fn provider_name(&self) -> &str;
}
