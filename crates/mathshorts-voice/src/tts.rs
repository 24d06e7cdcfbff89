//! TTS client and the `NarrationSource` implementation.
//!
//! Talks to a `text:synthesize`-style endpoint (base64 audio in the
//! JSON response), writes the decoded audio under the configured audio
//! directory, and reports everything — including provider failures —
//! through the returned `NarrationResult`.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{Value, json};
use std::path::PathBuf;

use mathshorts_core::config::{VoiceConfig, expand_tilde};
use mathshorts_core::traits::NarrationSource;
use mathshorts_core::types::{NarrationResult, Problem};

use crate::script::build_script;
use crate::ssml;

/// Voice selection per language tag: (language code, voice name).
pub fn voice_for(language_tag: &str) -> Option<(&'static str, &'static str)> {
    match language_tag {
        "ko" => Some(("ko-KR", "ko-KR-Wavenet-A")),
        "en" => Some(("en-US", "en-US-Wavenet-F")),
        "zh" => Some(("cmn-CN", "cmn-CN-Wavenet-A")),
        "ja" => Some(("ja-JP", "ja-JP-Wavenet-A")),
        "es" => Some(("es-ES", "es-ES-Wavenet-C")),
        _ => None,
    }
}

/// Narration source backed by the hosted TTS provider.
pub struct TtsNarrationSource {
    endpoint: String,
    api_key: String,
    audio_dir: PathBuf,
    timeout_secs: u64,
    speaking_rate: f32,
    client: reqwest::Client,
}

impl TtsNarrationSource {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            audio_dir: expand_tilde(&config.audio_dir),
            timeout_secs: config.timeout_secs,
            speaking_rate: config.speaking_rate,
            client: reqwest::Client::new(),
        }
    }

    async fn synthesize_audio(
        &self,
        ssml_doc: &str,
        language_tag: &str,
    ) -> Result<PathBuf, String> {
        let (language_code, voice_name) = voice_for(language_tag)
            .ok_or_else(|| format!("no voice configured for '{language_tag}'"))?;
        if self.api_key.is_empty() {
            return Err("no TTS API key configured".into());
        }

        let body = json!({
            "input": { "ssml": ssml_doc },
            "voice": {
                "languageCode": language_code,
                "name": voice_name,
                "ssmlGender": "FEMALE",
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "speakingRate": self.speaking_rate,
                "pitch": 0.0,
                "volumeGainDb": 2.0,
            },
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", &self.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| format!("TTS send failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(format!("TTS API error {status}: {detail}"));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| format!("bad TTS payload: {e}"))?;
        let audio_b64 = payload["audioContent"]
            .as_str()
            .ok_or("TTS response missing audioContent")?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(audio_b64)
            .map_err(|e| format!("audio decode failed: {e}"))?;

        std::fs::create_dir_all(&self.audio_dir)
            .map_err(|e| format!("audio dir: {e}"))?;
        let file = self
            .audio_dir
            .join(format!("voice_{language_tag}_{}.mp3", uuid::Uuid::new_v4()));
        std::fs::write(&file, &audio).map_err(|e| format!("audio write: {e}"))?;

        Ok(file)
    }
}

#[async_trait]
impl NarrationSource for TtsNarrationSource {
    async fn synthesize(&self, problem: &Problem, language_tag: &str) -> NarrationResult {
        let script = build_script(problem, language_tag);
        let ssml_doc = ssml::render(&script);

        match self.synthesize_audio(&ssml_doc, language_tag).await {
            Ok(path) => {
                tracing::info!("✅ Narration synthesized: {} → {}", language_tag, path.display());
                NarrationResult {
                    language_tag: language_tag.to_string(),
                    script_text: script.plain_text(),
                    audio_ref: Some(path.display().to_string()),
                    duration_estimate_secs: script.duration_estimate_secs(),
                    succeeded: true,
                    error_detail: None,
                }
            }
            Err(detail) => {
                tracing::warn!("⚠️ Narration failed for '{}': {}", language_tag, detail);
                NarrationResult {
                    language_tag: language_tag.to_string(),
                    script_text: script.plain_text(),
                    audio_ref: None,
                    duration_estimate_secs: 0,
                    succeeded: false,
                    error_detail: Some(detail),
                }
            }
        }
    }
}
