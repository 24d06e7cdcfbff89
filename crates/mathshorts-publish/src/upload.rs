//! Upload client for the video-hosting platform.

use async_trait::async_trait;
use serde_json::{Value, json};

use mathshorts_core::config::PublishConfig;
use mathshorts_core::traits::PublishSink;
use mathshorts_core::types::{ContentBundle, PublishOutcome};

/// Publish sink backed by the hosting platform's upload API.
pub struct VideoUploadSink {
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    channel_tag: String,
    client: reqwest::Client,
}

impl VideoUploadSink {
    pub fn new(config: &PublishConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            channel_tag: config.channel_tag.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Shorts title for one language variant.
    fn title(bundle: &ContentBundle, language_tag: &str) -> String {
        format!(
            "📚 오늘의 수학 ({}) - {} [{}]",
            bundle.time_slot,
            bundle.created_at.format("%Y-%m-%d"),
            language_tag
        )
    }

    fn tags(&self, bundle: &ContentBundle, language_tag: &str) -> Vec<String> {
        let mut tags = vec![
            self.channel_tag.clone(),
            "shorts".into(),
            language_tag.to_string(),
            bundle.time_slot.to_string(),
        ];
        tags.extend(bundle.problem.metadata.tags.iter().cloned());
        tags
    }
}

#[async_trait]
impl PublishSink for VideoUploadSink {
    async fn publish(&self, bundle: &ContentBundle, language_tag: &str) -> PublishOutcome {
        let Some(narration) = bundle.narration_for(language_tag) else {
            return PublishOutcome::failed(format!("no narration artifact for '{language_tag}'"));
        };
        if !narration.succeeded {
            return PublishOutcome::failed(format!("narration for '{language_tag}' failed"));
        }
        if self.api_key.is_empty() {
            return PublishOutcome::failed("no publish API key configured");
        }

        let body = json!({
            "title": Self::title(bundle, language_tag),
            "description": format!(
                "{}\n\n{}\n정답: {}",
                bundle.problem.statement_text,
                bundle.problem.equation_text,
                bundle.problem.final_answer
            ),
            "tags": self.tags(bundle, language_tag),
            "language": language_tag,
            "audio_ref": narration.audio_ref,
            "bundle_id": bundle.id,
        });

        let result = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => return PublishOutcome::failed(format!("upload send failed: {e}")),
        };

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return PublishOutcome::failed(format!("upload error {status}: {detail}"));
        }

        let payload: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => return PublishOutcome::failed(format!("bad upload payload: {e}")),
        };

        let external_ref = payload["url"]
            .as_str()
            .or_else(|| payload["videoId"].as_str())
            .map(str::to_string);

        tracing::info!(
            "📤 Published {} [{}] → {}",
            bundle.id,
            language_tag,
            external_ref.as_deref().unwrap_or("<no ref>")
        );

        PublishOutcome {
            succeeded: true,
            external_ref,
            error_detail: None,
        }
    }
}
