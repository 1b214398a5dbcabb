//! HTTP API against in-process providers

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use coach_pipeline::{VadConfig, VadSegmenter};
use coach_server::{websocket::process_pcm, WsMessage};

use common::{body_bytes, tone_pcm, tone_wav, Part, TestApp, SPOKEN};

#[tokio::test]
async fn test_health_reports_providers() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["providers"]["stt"], "mock-stt");
    assert_eq!(body["providers"]["llm_model"], "mock-model");
    assert_eq!(body["providers"]["avatar"], "procedural");
}

#[tokio::test]
async fn test_conversation_round_trip() {
    let app = TestApp::new().await;

    let (status, session) = app
        .post_json("/api/conversation/start", json!({"user_id": "u-7"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["type"], "conversation");
    assert_eq!(session["user_id"], "u-7");
    let id = session["id"].as_str().unwrap().to_string();

    let (status, reply) = app
        .post_json(
            &format!("/api/conversation/{}/speak", id),
            json!({"text": "How do I open a talk?"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["reply_text"], "reply 1: How do I open a talk?");
    assert_eq!(
        reply["audio_url"],
        format!("/files/{}/audio/response_1.mp3", id)
    );

    // multipart text field
    let (status, reply) = app
        .post_multipart(
            &format!("/api/conversation/{}/speak", id),
            &[Part::field("text", "And close it?")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["transcript"], "And close it?");

    let (status, history) = app
        .get(&format!("/api/conversation/{}/history", id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total_messages"], 4);
    assert_eq!(history["messages"][0]["role"], "user");
    assert_eq!(history["messages"][1]["role"], "assistant");
}

#[tokio::test]
async fn test_audio_turn_and_static_file() {
    let app = TestApp::new().await;
    let (_, session) = app.post_json("/api/conversation/start", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();

    let wav = tone_wav(0.5);
    let (status, reply) = app
        .post_multipart(
            &format!("/api/conversation/{}/speak", id),
            &[Part::file("audio", "take1.wav", "audio/wav", &wav)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["transcript"], SPOKEN);

    let url = format!("/files/{}/audio/input_0.wav", id);
    let response = app
        .send(Request::get(url.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, wav);
}

#[tokio::test]
async fn test_speak_without_input_is_rejected() {
    let app = TestApp::new().await;
    let (_, session) = app.post_json("/api/conversation/start", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();
    let uri = format!("/api/conversation/{}/speak", id);

    let (status, body) = app
        .post_multipart(&uri, &[Part::field("note", "nothing useful")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);

    let (status, body) = app.post_json(&uri, json!({"text": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_unknown_session_returns_json_404() {
    let app = TestApp::new().await;

    let (status, body) = app
        .get("/api/conversation/00000000-0000-4000-8000-000000000000/history")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["status_code"], 404);

    let (status, _) = app.get("/api/sessions/not-a-session").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_end_and_delete_conversation() {
    let app = TestApp::new().await;
    let (_, session) = app.post_json("/api/conversation/start", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();

    let (status, ended) = app
        .post_json(&format!("/api/conversation/{}/end", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["status"], "completed");

    let (status, _) = app
        .post_json(
            &format!("/api/conversation/{}/speak", id),
            json!({"text": "hello?"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post_json(&format!("/api/conversation/{}/end", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    assert_eq!(
        app.delete(&format!("/api/conversation/{}", id)).await,
        StatusCode::NO_CONTENT
    );
    let (status, _) = app.get(&format!("/api/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn upload_video(app: &TestApp) -> String {
    let video = vec![3u8; 2048];
    let (status, session) = app
        .post_multipart(
            "/api/evaluation/upload",
            &[
                Part::file("video", "pitch.mp4", "video/mp4", &video),
                Part::field("user_id", "u-9"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["type"], "evaluation");
    assert_eq!(session["user_id"], "u-9");
    session["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_evaluation_upload_analyze_report() {
    let app = TestApp::new().await;
    let id = upload_video(&app).await;

    let (status, body) = app.get(&format!("/api/evaluation/{}/report", id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_ready");

    let (status, accepted) = app
        .post_json(&format!("/api/evaluation/{}/analyze", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(accepted["session_id"], id.as_str());

    let mut last = serde_json::Value::Null;
    for _ in 0..200 {
        let (status, progress) = app.get(&format!("/api/evaluation/{}/status", id)).await;
        assert_eq!(status, StatusCode::OK);
        if progress["status"] == "completed" || progress["status"] == "failed" {
            last = progress;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last["status"], "completed", "{}", last);
    assert_eq!(last["progress"], 100);

    let (status, report) = app.get(&format!("/api/evaluation/{}/report", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["score"], 8.0);
    assert_eq!(report["transcript"], SPOKEN);
    assert_eq!(report["pose_metrics"]["posture_score"], 7.5);
    assert_eq!(
        report["video_url"],
        format!("/files/{}/video/input.mp4", id)
    );
}

#[tokio::test]
async fn test_upload_rejects_non_video() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post_multipart(
            "/api/evaluation/upload",
            &[Part::file("video", "notes.txt", "text/plain", b"not a video")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = app
        .post_multipart("/api/evaluation/upload", &[Part::field("user_id", "u-1")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_listing_filters_by_type() {
    let app = TestApp::new().await;
    app.post_json("/api/conversation/start", json!({})).await;
    app.post_json("/api/conversation/start", json!({})).await;
    let evaluation_id = upload_video(&app).await;

    let (status, all) = app.get("/api/sessions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, evaluations) = app.get("/api/sessions?type=evaluation").await;
    let evaluations = evaluations.as_array().unwrap();
    assert_eq!(evaluations.len(), 1);
    assert_eq!(evaluations[0]["id"], evaluation_id.as_str());

    let (_, active) = app.get("/api/sessions?type=conversation&status=active").await;
    assert_eq!(active.as_array().unwrap().len(), 2);

    assert_eq!(
        app.delete(&format!("/api/sessions/{}", evaluation_id)).await,
        StatusCode::NO_CONTENT
    );
    assert!(!app.dir.path().join(&evaluation_id).exists());
}

#[tokio::test]
async fn test_delete_waits_for_running_evaluation() {
    let app = TestApp::new().await;
    let id = upload_video(&app).await;

    let slot = app.state.evaluations.scheduler().claim(&id).unwrap();
    assert_eq!(
        app.delete(&format!("/api/sessions/{}", id)).await,
        StatusCode::CONFLICT
    );
    assert!(app.dir.path().join(&id).exists());
    drop(slot);

    assert_eq!(
        app.delete(&format!("/api/sessions/{}", id)).await,
        StatusCode::NO_CONTENT
    );
    // the delete released its own claim
    assert!(!app.state.evaluations.scheduler().is_running(&id));
}

#[tokio::test]
async fn test_session_delete_releases_conversation_state() {
    let app = TestApp::new().await;
    let (_, session) = app.post_json("/api/conversation/start", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();
    app.post_json(
        &format!("/api/conversation/{}/speak", id),
        json!({"text": "hello"}),
    )
    .await;
    assert_eq!(app.state.conversations.tracked_sessions(), 1);

    assert_eq!(
        app.delete(&format!("/api/sessions/{}", id)).await,
        StatusCode::NO_CONTENT
    );
    assert_eq!(app.state.conversations.tracked_sessions(), 0);
}

#[tokio::test]
async fn test_avatar_animates_upload() {
    let app = TestApp::new().await;

    let wav = tone_wav(0.5);
    let (status, body) = app
        .post_multipart(
            "/api/avatar/animate",
            &[Part::file("audio", "line.wav", "audio/wav", &wav)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "procedural");
    assert_eq!(body["fps"], 60);
    assert_eq!(body["frame_count"], 30);
    assert_eq!(body["blendshapes"][0].as_array().unwrap().len(), 52);

    let (status, body) = app
        .post_multipart("/api/avatar/animate", &[Part::field("note", "no audio")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_avatar_from_stored_audio() {
    let app = TestApp::new().await;
    let (_, session) = app.post_json("/api/conversation/start", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();
    app.post_multipart(
        &format!("/api/conversation/{}/speak", id),
        &[Part::file("audio", "take1.wav", "audio/wav", &tone_wav(0.5))],
    )
    .await;

    let (status, body) = app
        .post_json(
            "/api/avatar/from-url",
            json!({"audio_url": format!("/files/{}/audio/input_0.wav", id)}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let url = format!("/files/{}/animation/input_0.json", id);
    assert_eq!(body["blendshapes_url"], url.as_str());

    let (status, saved) = app.get(&url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["frame_count"], body["frame_count"]);

    let (status, _) = app
        .post_json(
            "/api/avatar/from-url",
            json!({"audio_url": "https://elsewhere.example/voice.wav"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_streamed_speech_becomes_a_turn() {
    let app = TestApp::new().await;
    let (_, session) = app.post_json("/api/conversation/start", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();

    let mut segmenter = VadSegmenter::new(VadConfig::from(&app.state.config.conversation.vad));
    let mut replies = Vec::new();
    for chunk in tone_pcm(0.6, 0.5).chunks(3_200) {
        replies.extend(process_pcm(&app.state, &id, &mut segmenter, chunk).await);
    }

    assert_eq!(replies[0], WsMessage::SpeechStarted);
    assert!(matches!(
        replies[1],
        WsMessage::SpeechEnded { accepted: true, .. }
    ));
    assert_eq!(
        replies[2],
        WsMessage::Transcript {
            text: SPOKEN.to_string()
        }
    );
    assert!(matches!(replies[3], WsMessage::Response { .. }));
    assert_eq!(replies.len(), 4);

    let (_, history) = app.get(&format!("/api/conversation/{}/history", id)).await;
    assert_eq!(history["total_messages"], 2);
}

#[tokio::test]
async fn test_stream_drops_short_blips() {
    let app = TestApp::new().await;
    let (_, session) = app.post_json("/api/conversation/start", json!({})).await;
    let id = session["id"].as_str().unwrap().to_string();

    let mut segmenter = VadSegmenter::new(VadConfig::from(&app.state.config.conversation.vad));
    let replies = process_pcm(&app.state, &id, &mut segmenter, &tone_pcm(0.09, 0.5)).await;

    assert_eq!(replies[0], WsMessage::SpeechStarted);
    assert!(matches!(
        replies[1],
        WsMessage::SpeechEnded { accepted: false, .. }
    ));
    assert_eq!(replies.len(), 2);

    let (_, history) = app.get(&format!("/api/conversation/{}/history", id)).await;
    assert_eq!(history["total_messages"], 0);
}
