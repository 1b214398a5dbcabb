//! Provider traits
//!
//! Every external capability sits behind one trait so backends can be
//! swapped by configuration and replaced with mocks in tests.
//!
//! ```text
//! Speech:
//!   - SpeechToText: audio -> transcript
//!   - TextToSpeech: text -> audio
//!
//! Language models:
//!   - LanguageModel: coaching replies and structured evaluation
//!
//! Vision:
//!   - PoseEstimator: video -> body language metrics
//!
//! Avatar:
//!   - AvatarAnimator: speech audio -> facial blendshapes
//!
//! Media:
//!   - MediaExtractor: video -> mono WAV track
//! ```

mod avatar;
mod llm;
mod media;
mod pose;
mod speech;

pub use avatar::AvatarAnimator;
pub use llm::LanguageModel;
pub use media::MediaExtractor;
pub use pose::{PoseEstimator, VideoInput};
pub use speech::{SpeechToText, TextToSpeech, VoiceStyle};
