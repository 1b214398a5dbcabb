//! Provider endpoints, default models and credential variables
//!
//! Single source for values the provider factories fall back to when the
//! settings leave them empty.

/// Default API endpoints
pub mod endpoints {
    pub const OPENAI: &str = "https://api.openai.com/v1";
    pub const ANTHROPIC: &str = "https://api.anthropic.com";
    /// OpenAI-compatible surface of the Gemini API
    pub const GOOGLE_GEMINI: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
    pub const TYPHOON: &str = "https://api.opentyphoon.ai/v1";
    pub const NVIDIA: &str = "https://integrate.api.nvidia.com/v1";

    pub const DEEPGRAM: &str = "https://api.deepgram.com/v1";
    pub const GOOGLE_SPEECH: &str = "https://speech.googleapis.com/v1";
    pub const WHISPER_SIDECAR: &str = "http://127.0.0.1:8090";

    pub const ELEVENLABS: &str = "https://api.elevenlabs.io/v1";
    pub const GTTS: &str = "https://translate.google.com";
    pub const EDGE_TTS_SIDECAR: &str = "http://127.0.0.1:8091";
    pub const LOCAL_TTS_SIDECAR: &str = "http://127.0.0.1:8092";

    pub const POSE_SIDECAR: &str = "http://127.0.0.1:8093";

    pub const NVIDIA_AUDIO2FACE: &str = "https://integrate.api.nvidia.com/v1/audio2face";
    pub const HUGGINGFACE_INFERENCE: &str = "https://api-inference.huggingface.co";
}

/// Default model identifiers
pub mod models {
    pub const OPENAI: &str = "gpt-4";
    pub const ANTHROPIC: &str = "claude-3-sonnet-20240229";
    pub const GOOGLE: &str = "gemini-2.0-flash-exp";
    pub const TYPHOON: &str = "typhoon-v2.1-12b-instruct";
    pub const NVIDIA: &str = "qwen/qwen3-next-80b-a3b-instruct";

    pub const WHISPER: &str = "base";
    pub const DEEPGRAM: &str = "nova-2";

    pub const ELEVENLABS: &str = "eleven_multilingual_v2";
    pub const ELEVENLABS_VOICE: &str = "TX3LPaxmHKxFdv7VOQHJ";
    pub const ELEVENLABS_OUTPUT_FORMAT: &str = "mp3_44100_128";
    pub const EDGE_VOICE: &str = "en-US-AriaNeural";

    pub const AUDIO2FACE_NVIDIA: &str = "nvidia/audio2face-3d";
    pub const AUDIO2FACE_HUGGINGFACE: &str = "nvidia/Audio2Face-3D-v3.0";
}

/// Environment variables consulted for provider credentials
pub mod env_keys {
    pub const OPENAI: &str = "OPENAI_API_KEY";
    pub const ANTHROPIC: &str = "ANTHROPIC_API_KEY";
    pub const GOOGLE: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];
    pub const TYPHOON: &str = "TYPHOON_API_KEY";
    pub const NVIDIA: &str = "NVIDIA_API_KEY";
    pub const DEEPGRAM: &str = "DEEPGRAM_API_KEY";
    pub const GOOGLE_CLOUD: &str = "GOOGLE_CLOUD_API_KEY";
    pub const ELEVENLABS: &str = "ELEVENLABS_API_KEY";
    pub const HUGGINGFACE: &str = "HUGGINGFACE_API_KEY";
}

/// Resolve a credential: explicit value first, then the first non-empty
/// environment variable among `vars`
pub fn resolve_api_key(explicit: Option<&str>, vars: &[&str]) -> Option<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .map(str::to_string)
        .or_else(|| {
            vars.iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|v| !v.trim().is_empty())
        })
}
