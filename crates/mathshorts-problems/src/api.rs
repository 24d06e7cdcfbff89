//! Generative-API problem source.
//!
//! Talks to an Anthropic-style messages endpoint and asks for one
//! structured problem JSON per request. The provider's answer is free
//! text that should contain a JSON object matching the contract below;
//! anything else is a `Generation` error for the caller to recover from.

use async_trait::async_trait;
use serde_json::{Value, json};

use mathshorts_core::config::GeneratorConfig;
use mathshorts_core::error::{MathShortsError, Result};
use mathshorts_core::traits::ProblemSource;
use mathshorts_core::types::{Problem, ProblemMetadata, ProblemRequest, TimeSlot};

/// Problem source backed by a hosted generative model.
pub struct ApiProblemSource {
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl ApiProblemSource {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            client: reqwest::Client::new(),
        }
    }

    /// Build the generation prompt. Slot mood, region, and the
    /// 15-second-shorts framing steer the model; the JSON contract at
    /// the end is what `parse_problem` expects back.
    fn build_prompt(request: &ProblemRequest) -> String {
        let mood = match request.time_slot {
            TimeSlot::Morning => "활기찬 아침용",
            TimeSlot::Lunch => "점심시간용",
        };
        format!(
            r#"{grade} {topic} 문제를 생성해주세요.

조건:
- 시간대: {slot} ({mood})
- 지역: {region}
- 유튜브 쇼츠용 (15초)
- 실생활 연관
- 중학생 수준

JSON 형식으로 응답:
{{
  "problem": "문제 내용",
  "equation": "핵심 수식",
  "solution": {{
    "steps": ["풀이단계1", "풀이단계2", "풀이단계3"],
    "answer": "최종답"
  }},
  "metadata": {{
    "difficulty": "basic|intermediate|advanced",
    "tags": ["태그1", "태그2"]
  }}
}}"#,
            grade = request.grade,
            topic = request.topic,
            slot = request.time_slot,
            region = request.region,
        )
    }

    /// Pull the problem JSON out of the model's text reply.
    fn parse_problem(text: &str) -> Result<Problem> {
        let payload = extract_json_object(text)
            .ok_or_else(|| MathShortsError::Generation("no JSON object in response".into()))?;
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| MathShortsError::Generation(format!("malformed problem JSON: {e}")))?;

        let statement = value["problem"].as_str().unwrap_or_default().to_string();
        let equation = value["equation"].as_str().unwrap_or_default().to_string();
        let steps: Vec<String> = value["solution"]["steps"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|s| s.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let answer = value["solution"]["answer"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let problem = Problem {
            statement_text: statement,
            equation_text: equation,
            solution_steps: steps,
            final_answer: answer,
            metadata: ProblemMetadata {
                difficulty: value["metadata"]["difficulty"]
                    .as_str()
                    .unwrap_or("basic")
                    .to_string(),
                tags: value["metadata"]["tags"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|t| t.as_str())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        };

        if !problem.is_well_formed() {
            return Err(MathShortsError::Generation(
                "provider returned an empty or partial problem".into(),
            ));
        }
        Ok(problem)
    }
}

#[async_trait]
impl ProblemSource for ApiProblemSource {
    async fn generate(&self, request: &ProblemRequest) -> Result<Problem> {
        if self.api_key.is_empty() {
            return Err(MathShortsError::Generation(
                "no generator API key configured".into(),
            ));
        }

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": Self::build_prompt(request) }],
        });

        tracing::debug!(
            "🎯 Generating problem: {} {} ({}, {})",
            request.grade,
            request.topic,
            request.time_slot,
            request.region
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| MathShortsError::Generation(format!("provider unreachable: {e}")))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.as_u16() == 529 {
            let detail = resp.text().await.unwrap_or_default();
            return Err(MathShortsError::ProviderOverloaded(format!(
                "{status}: {detail}"
            )));
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(MathShortsError::Generation(format!("{status}: {detail}")));
        }

        let reply: Value = resp
            .json()
            .await
            .map_err(|e| MathShortsError::Generation(format!("bad provider payload: {e}")))?;
        let text = reply["content"][0]["text"]
            .as_str()
            .ok_or_else(|| MathShortsError::Generation("empty provider reply".into()))?;

        Self::parse_problem(text)
    }
}

/// Slice out the outermost `{...}` of a text reply. Models wrap the JSON
/// in prose or code fences often enough that a plain parse would fail.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathshorts_core::types::Grade;

    fn sample_request() -> ProblemRequest {
        ProblemRequest {
            grade: Grade::Grade1,
            topic: "일차방정식".into(),
            time_slot: TimeSlot::Morning,
            region: "asia".into(),
        }
    }

    #[test]
    fn test_prompt_carries_request_fields() {
        let prompt = ApiProblemSource::build_prompt(&sample_request());
        assert!(prompt.contains("grade1"));
        assert!(prompt.contains("일차방정식"));
        assert!(prompt.contains("morning"));
        assert!(prompt.contains("활기찬 아침용"));
    }

    #[test]
    fn test_parse_problem_from_fenced_reply() {
        let reply = r#"Here is the problem you asked for:
```json
{
  "problem": "철수가 연필 3자루를 샀습니다. 500원을 더해 2000원을 냈다면 연필 하나는?",
  "equation": "3x + 500 = 2000",
  "solution": { "steps": ["3x = 1500", "x = 500"], "answer": "x = 500원" },
  "metadata": { "difficulty": "basic", "tags": ["일차방정식"] }
}
```"#;
        let problem = ApiProblemSource::parse_problem(reply).unwrap();
        assert_eq!(problem.equation_text, "3x + 500 = 2000");
        assert_eq!(problem.solution_steps.len(), 2);
        assert_eq!(problem.metadata.tags, vec!["일차방정식"]);
    }

    #[test]
    fn test_parse_rejects_partial_problem() {
        let reply = r#"{"problem": "", "equation": "x = 1", "solution": {"steps": [], "answer": ""}}"#;
        let err = ApiProblemSource::parse_problem(reply).unwrap_err();
        assert!(matches!(err, MathShortsError::Generation(_)));
    }

    #[test]
    fn test_parse_rejects_prose_only_reply() {
        let err = ApiProblemSource::parse_problem("I could not produce a problem.").unwrap_err();
        assert!(matches!(err, MathShortsError::Generation(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_generation_failure() {
        let source = ApiProblemSource::new(&Default::default());
        let err = source.generate(&sample_request()).await.unwrap_err();
        assert!(matches!(err, MathShortsError::Generation(_)));
        assert!(!err.is_retryable());
    }
}
