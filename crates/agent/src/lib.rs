//! Coaching orchestration
//!
//! Features:
//! - Provider bundle resolved from settings (STT, LLM, TTS, pose, media, avatar)
//! - Conversation turns: transcribe, reply with full history, synthesize
//! - Evaluation pipeline with stage progress recorded on the session
//! - Scheduler running one detached pipeline per session at a time
//! - Avatar blendshape animation from uploaded or stored speech audio

pub mod avatar;
pub mod conversation;
pub mod evaluation;
mod instrument;
pub mod providers;
pub mod scheduler;

pub use avatar::{AnimationReply, AvatarService};
pub use conversation::{ConversationOrchestrator, TurnInput, TurnReply};
pub use evaluation::{EvaluationOrchestrator, EvaluationStatus, VideoUpload};
pub use providers::{retry_policy, ProviderNames, Providers};
pub use scheduler::{EvaluationScheduler, RunSlot};
