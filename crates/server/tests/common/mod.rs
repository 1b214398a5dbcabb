//! In-process providers and app construction for the API tests

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use coach_agent::Providers;
use coach_config::Settings;
use coach_core::{
    AIFeedback, AudioClip, ConversationMessage, LanguageModel, MediaExtractor, MetricsSummary,
    PoseEstimator, PoseMetrics, Result, SpeechToText, TextToSpeech, Transcript, VideoInput,
    VoiceStyle,
};
use coach_persistence::FileSessionStore;
use coach_pipeline::ProceduralAvatar;
use coach_server::{create_router, AppState};

pub const SPOKEN: &str = "Hello everyone I am excited to present our results";
pub const BOUNDARY: &str = "coach-test-boundary";

pub struct EchoStt;

#[async_trait]
impl SpeechToText for EchoStt {
    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcript> {
        if audio.data.starts_with(b"RIFF") {
            Ok(Transcript::new(SPOKEN))
        } else {
            Ok(Transcript::new(String::from_utf8_lossy(&audio.data)))
        }
    }

    fn provider_name(&self) -> &str {
        "mock-stt"
    }
}

pub struct ScriptedLlm;

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn converse(
        &self,
        history: &[ConversationMessage],
        _system_prompt: &str,
        user_input: &str,
    ) -> Result<String> {
        Ok(format!("reply {}: {}", history.len() / 2 + 1, user_input))
    }

    async fn evaluate(&self, _transcript: &str, metrics: &MetricsSummary) -> Result<AIFeedback> {
        Ok(AIFeedback {
            overall_score: 8.0,
            strengths: vec!["Confident tone".to_string()],
            areas_for_improvement: vec!["Slow down".to_string()],
            specific_recommendations: vec![format!(
                "Keep it to {} words",
                metrics.speech.total_words
            )],
            detailed_feedback: "Solid delivery.".to_string(),
        })
    }

    fn provider_name(&self) -> &str {
        "mock-llm"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

pub struct BytesTts;

#[async_trait]
impl TextToSpeech for BytesTts {
    async fn synthesize(&self, text: &str, _style: Option<&VoiceStyle>) -> Result<AudioClip> {
        Ok(AudioClip::mp3(text.as_bytes().to_vec()))
    }

    fn provider_name(&self) -> &str {
        "mock-tts"
    }
}

pub struct FixedPose;

#[async_trait]
impl PoseEstimator for FixedPose {
    async fn analyze(&self, _video: &VideoInput) -> Result<PoseMetrics> {
        Ok(PoseMetrics {
            posture_score: 7.5,
            gesture_count: 2,
            movement_smoothness: 8.0,
            eye_contact_score: 6.0,
            body_openness_score: 7.0,
            frames_analyzed: 30,
            tracking_quality: 0.9,
            low_confidence: false,
        })
    }

    fn provider_name(&self) -> &str {
        "mock-pose"
    }
}

pub struct ToneMedia;

#[async_trait]
impl MediaExtractor for ToneMedia {
    async fn extract_audio(&self, _video: &Path, output: &Path) -> Result<()> {
        tokio::fs::write(output, tone_wav(1.5)).await?;
        Ok(())
    }

    async fn read_duration(&self, _video: &Path) -> Result<Option<f64>> {
        Ok(Some(1.5))
    }
}

/// 16 kHz mono PCM: `tone` seconds of 220 Hz then `silence` seconds of zeros
pub fn tone_pcm(tone: f32, silence: f32) -> Vec<u8> {
    let mut pcm = Vec::new();
    for i in 0..(16_000.0 * tone) as usize {
        let t = i as f32 / 16_000.0;
        let sample = 0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin();
        pcm.extend_from_slice(&((sample * i16::MAX as f32) as i16).to_le_bytes());
    }
    pcm.resize(pcm.len() + (16_000.0 * silence) as usize * 2, 0);
    pcm
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
            let sample = 0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin();
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Router over a temp-dir store; keep `dir` alive for the test
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.base_dir = dir.path().to_path_buf();
        settings.storage.public_prefix = "/files".to_string();

        let store = FileSessionStore::open(dir.path(), "/files").await.unwrap();
        let providers = Providers {
            stt: Arc::new(EchoStt),
            llm: Arc::new(ScriptedLlm),
            tts: Arc::new(BytesTts),
            pose: Arc::new(FixedPose),
            media: Arc::new(ToneMedia),
            avatar: Arc::new(ProceduralAvatar::default()),
        };
        let state = AppState::new(settings, Arc::new(store), providers);
        let router = create_router(state.clone());

        Self { router, state, dir }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        json_of(response).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        json_of(self.send(request).await).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        parts: &[Part<'_>],
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        json_of(self.send(request).await).await
    }

    pub async fn delete(&self, uri: &str) -> StatusCode {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
            .status()
    }
}

/// One multipart field
pub struct Part<'a> {
    pub name: &'a str,
    pub file: Option<(&'a str, &'a str)>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn field(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file: Some((file_name, content_type)),
            data,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file {
            Some((file_name, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        part.name, file_name, content_type
                    )
                    .as_bytes(),
                );
            },
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            },
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_of(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
