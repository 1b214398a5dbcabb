//! Mock providers shared by the orchestration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio::sync::Semaphore;

use coach_agent::Providers;
use coach_core::{
    AIFeedback, AudioClip, AvatarAnimator, ConversationMessage, Error, EvaluationResult,
    FaceAnimation, LanguageModel, BLENDSHAPE_COUNT,
    LlmErrorKind, MediaExtractor, MetricsSummary, PoseEstimator, PoseMetrics, Result, Session,
    SessionFilter, SessionType, SpeechToText, TextToSpeech, Transcript, VideoInput, VoiceStyle,
    WordTiming,
};
use coach_persistence::{FileKind, FileSessionStore, SessionMutator, SessionStore, StoredFile};

pub const SPOKEN: &str = "Hello everyone um I am excited to talk about our launch today";

/// Transcript with one word per 0.4s and a long gap before "today"
pub fn spoken_transcript() -> Transcript {
    let words: Vec<WordTiming> = SPOKEN
        .split_whitespace()
        .enumerate()
        .map(|(i, w)| {
            let gap = if w == "today" { 1.2 } else { 0.0 };
            let start = i as f64 * 0.4 + gap;
            WordTiming {
                word: w.to_string(),
                start,
                end: start + 0.3,
            }
        })
        .collect();
    Transcript::new(SPOKEN).with_words(words)
}

#[derive(Default)]
pub struct MockStt {
    pub calls: AtomicUsize,
    /// Transient failures before the first success
    pub transient_failures: AtomicUsize,
    pub fail_hard: AtomicBool,
}

#[async_trait]
impl SpeechToText for MockStt {
    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_hard.load(Ordering::SeqCst) {
            return Err(Error::transcription("HTTP 401: bad key"));
        }
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::transient_transcription("HTTP 503"));
        }
        if audio.data.starts_with(b"RIFF") {
            Ok(spoken_transcript())
        } else {
            Ok(Transcript::new(String::from_utf8_lossy(&audio.data)))
        }
    }

    fn provider_name(&self) -> &str {
        "mock-stt"
    }
}

pub struct MockLlm {
    pub fail_evaluate: AtomicBool,
    /// Permits handed out to `evaluate`; starts open
    pub gate: Semaphore,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self {
            fail_evaluate: AtomicBool::new(false),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        }
    }
}

impl MockLlm {
    /// `evaluate` blocks until [`MockLlm::open`]
    pub fn gated() -> Self {
        Self {
            fail_evaluate: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn converse(
        &self,
        history: &[ConversationMessage],
        _system_prompt: &str,
        user_input: &str,
    ) -> Result<String> {
        Ok(format!("reply {}: {}", history.len() / 2 + 1, user_input))
    }

    async fn evaluate(&self, transcript: &str, metrics: &MetricsSummary) -> Result<AIFeedback> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::llm(LlmErrorKind::Other, "gate closed"))?;
        if self.fail_evaluate.load(Ordering::SeqCst) {
            return Err(Error::llm(LlmErrorKind::AuthInvalid, "HTTP 401: invalid key"));
        }
        Ok(AIFeedback {
            overall_score: 8.0,
            strengths: vec!["Clear opening".to_string()],
            areas_for_improvement: vec!["Fewer fillers".to_string()],
            specific_recommendations: vec![format!(
                "Aim for {} words with fewer fillers",
                metrics.speech.total_words
            )],
            detailed_feedback: format!("You said: {}", transcript),
        })
    }

    fn provider_name(&self) -> &str {
        "mock-llm"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[derive(Default)]
pub struct MockTts {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TextToSpeech for MockTts {
    async fn synthesize(&self, text: &str, _style: Option<&VoiceStyle>) -> Result<AudioClip> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Synthesis("HTTP 500".to_string()));
        }
        Ok(AudioClip::mp3(text.as_bytes().to_vec()))
    }

    fn provider_name(&self) -> &str {
        "mock-tts"
    }
}

#[derive(Default)]
pub struct MockPose {
    pub fail: AtomicBool,
}

#[async_trait]
impl PoseEstimator for MockPose {
    async fn analyze(&self, _video: &VideoInput) -> Result<PoseMetrics> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::PoseAnalysis("sidecar unreachable".to_string()));
        }
        Ok(PoseMetrics {
            posture_score: 8.4,
            gesture_count: 3,
            movement_smoothness: 7.2,
            eye_contact_score: 6.5,
            body_openness_score: 9.1,
            frames_analyzed: 60,
            tracking_quality: 0.95,
            low_confidence: false,
        })
    }

    fn provider_name(&self) -> &str {
        "mock-pose"
    }
}

/// One frame per 1000 input bytes, jaw open on odd frames
#[derive(Default)]
pub struct MockAvatar {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl AvatarAnimator for MockAvatar {
    async fn animate(&self, audio: &AudioClip) -> Result<FaceAnimation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Animation("HTTP 503".to_string()));
        }
        let frames = (0..audio.len() / 1000)
            .map(|i| {
                let mut frame = vec![0.0; BLENDSHAPE_COUNT];
                frame[0] = (i % 2) as f32;
                frame
            })
            .collect();
        Ok(FaceAnimation::from_frames("mock-avatar", 30, frames))
    }

    fn provider_name(&self) -> &str {
        "mock-avatar"
    }
}

/// Writes a 2 second tone as the "extracted" audio
#[derive(Default)]
pub struct MockMedia {
    pub fail: AtomicBool,
}

pub fn tone_wav(seconds: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let n = (16_000.0 * seconds) as usize;
        for i in 0..n {
            let t = i as f32 / 16_000.0;
            let sample = 0.4 * (2.0 * std::f32::consts::PI * 180.0 * t).sin();
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[async_trait]
impl MediaExtractor for MockMedia {
    async fn extract_audio(&self, video: &Path, output: &Path) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Media("ffmpeg exited with 1".to_string()));
        }
        assert!(video.exists(), "video should be stored before extraction");
        tokio::fs::write(output, tone_wav(2.0)).await?;
        Ok(())
    }

    async fn read_duration(&self, _video: &Path) -> Result<Option<f64>> {
        Ok(Some(2.0))
    }
}

/// Mocks plus the bundle built from them
pub struct Harness {
    pub stt: Arc<MockStt>,
    pub llm: Arc<MockLlm>,
    pub tts: Arc<MockTts>,
    pub pose: Arc<MockPose>,
    pub media: Arc<MockMedia>,
    pub avatar: Arc<MockAvatar>,
    pub store: Arc<dyn SessionStore>,
    pub dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_llm(MockLlm::default()).await
    }

    pub async fn with_llm(llm: MockLlm) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path(), "/files").await.unwrap();
        Self {
            stt: Arc::new(MockStt::default()),
            llm: Arc::new(llm),
            tts: Arc::new(MockTts::default()),
            pose: Arc::new(MockPose::default()),
            media: Arc::new(MockMedia::default()),
            avatar: Arc::new(MockAvatar::default()),
            store: Arc::new(store),
            dir,
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            stt: self.stt.clone(),
            llm: self.llm.clone(),
            tts: self.tts.clone(),
            pose: self.pose.clone(),
            media: self.media.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Store whose turn writes stall for `delay` before reaching the inner store
pub struct SlowTurnStore {
    pub inner: Arc<dyn SessionStore>,
    pub delay: Duration,
}

#[async_trait]
impl SessionStore for SlowTurnStore {
    async fn create(
        &self,
        session_type: SessionType,
        user_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<Session> {
        self.inner.create(session_type, user_id, metadata).await
    }

    async fn get(&self, id: &str) -> Result<Session> {
        self.inner.get(id).await
    }

    async fn update(&self, id: &str, mutator: SessionMutator<'_>) -> Result<Session> {
        self.inner.update(id, mutator).await
    }

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        self.inner.list(filter).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await
    }

    fn file_location(&self, id: &str, kind: FileKind, name: &str) -> Result<StoredFile> {
        self.inner.file_location(id, kind, name)
    }

    fn locate_url(&self, url: &str) -> Result<(String, FileKind, StoredFile)> {
        self.inner.locate_url(url)
    }

    async fn attach_file(
        &self,
        id: &str,
        kind: FileKind,
        name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile> {
        self.inner.attach_file(id, kind, name, bytes).await
    }

    async fn append_message(&self, id: &str, message: ConversationMessage) -> Result<usize> {
        tokio::time::sleep(self.delay).await;
        self.inner.append_message(id, message).await
    }

    async fn append_turn(
        &self,
        id: &str,
        user: ConversationMessage,
        assistant: ConversationMessage,
    ) -> Result<usize> {
        tokio::time::sleep(self.delay).await;
        self.inner.append_turn(id, user, assistant).await
    }

    async fn history(&self, id: &str) -> Result<Vec<ConversationMessage>> {
        self.inner.history(id).await
    }

    async fn save_results(&self, id: &str, results: &EvaluationResult) -> Result<()> {
        self.inner.save_results(id, results).await
    }

    async fn get_results(&self, id: &str) -> Result<Option<EvaluationResult>> {
        self.inner.get_results(id).await
    }

    async fn sweep_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.inner.sweep_before(cutoff).await
    }
}
