use crate::conversation::Turn;
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_KEY_ENV: &str = "SKETCH_TUTOR_API_KEY";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageQueryBody<'a> {
    image_data: &'a str,
    question: &'a str,
    history: &'a [Turn],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioQueryBody<'a> {
    audio_data: &'a str,
    mime_type: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    canvas_data: Option<&'a str>,
    history: &'a [Turn],
}

#[derive(Debug, Clone, Serialize)]
struct SpeechBody<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalysisBody {
    analysis: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeechResponseBody {
    audio_data: String,
    format: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Synthesized speech as returned by the text-to-speech endpoint, already
/// base64-decoded.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub format: String,
}

/// Transport seam for the hosted analysis service. The orchestrator and the
/// speech player only see this trait; tests substitute their own
/// implementations for the HTTP one.
pub trait AnalysisClient: Send + Sync {
    fn analyze_image(&self, image_data: &str, question: &str, history: &[Turn]) -> Result<String>;

    fn analyze_audio(
        &self,
        audio_data: &str,
        mime_type: &str,
        prompt: &str,
        canvas_data: Option<&str>,
        history: &[Turn],
    ) -> Result<String>;

    fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio>;
}

/// Blocking HTTP implementation. Only ever called from background threads;
/// the UI thread dispatches work and picks up completions through channels.
pub struct HttpAnalysisClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl HttpAnalysisClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("sketch-tutor")
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// The service API key must be present in the environment at startup;
    /// a missing key is a fatal configuration error, not something to retry.
    pub fn from_env(base_url: String) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .with_context(|| format!("{API_KEY_ENV} must be set"))?;
        Self::new(base_url, api_key)
    }

    fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .with_context(|| format!("POST {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorBody>()
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!(%url, %status, %detail, "analysis service request failed");
            return Err(anyhow!("service error ({status}): {detail}"));
        }
        resp.json::<R>()
            .with_context(|| format!("decode response from {url}"))
    }
}

impl AnalysisClient for HttpAnalysisClient {
    fn analyze_image(&self, image_data: &str, question: &str, history: &[Turn]) -> Result<String> {
        let body: AnalysisBody = self.post_json(
            "/api/analyze-image",
            &ImageQueryBody {
                image_data,
                question,
                history,
            },
        )?;
        Ok(body.analysis)
    }

    fn analyze_audio(
        &self,
        audio_data: &str,
        mime_type: &str,
        prompt: &str,
        canvas_data: Option<&str>,
        history: &[Turn],
    ) -> Result<String> {
        let body: AnalysisBody = self.post_json(
            "/api/analyze-audio",
            &AudioQueryBody {
                audio_data,
                mime_type,
                prompt,
                canvas_data,
                history,
            },
        )?;
        Ok(body.analysis)
    }

    fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio> {
        let body: SpeechResponseBody = self.post_json("/api/speech", &SpeechBody { text })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&body.audio_data)
            .context("decode synthesized audio")?;
        Ok(SpeechAudio {
            bytes,
            format: body.format,
        })
    }
}
