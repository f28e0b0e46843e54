use crate::config::Config;
use crate::error::{ClipError, Result};
use crate::moments::{self, Moment};
use crate::transcript::Chunk;
use crate::{logi, logok, logw};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT_SECS: u64 = 600;

/// Explicitly constructed gateway to the text-generation service. Holds the
/// API key and the minimum spacing between requests derived from the
/// configured requests-per-minute ceiling; nothing here is process-global.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    min_interval: Duration,
}

pub(crate) fn build_moment_prompt(
    chunk_json: &str,
    moment_count: usize,
    min_time: f64,
    max_time: f64,
) -> String {
    format!(
        "You will receive a JSON transcript excerpt of a video.\n\n\
         TASK:\n\
         Extract {count} viral moments that are either funny, shocking, or informative.\n\
         Each selected moment must be between {min:.0} and {max:.0} seconds long and must combine\n\
         consecutive transcript entries into one coherent segment.\n\n\
         STRICT RULES:\n\
         - Use only the provided timestamps. Do NOT invent new timestamps.\n\
         - Each moment must span multiple transcript entries to form a coherent {min:.0}-{max:.0} second clip.\n\
         - Ensure logical continuity so the moment makes sense as a standalone clip.\n\
         - Include the transcript excerpt from the selected range.\n\
         - Every video_title must be unique.\n\
         - Return ONLY valid JSON, formatted like this:\n\n\
         [\n    {{\n        \"start\": 0.00,\n        \"end\": 30.00,\n        \"transcript\": \"I'm gonna give my honest humble opinion...\",\n        \"caption\": \"This celebrity just exposed the truth!\",\n        \"video_title\": \"celebrity_exposed\"\n    }}\n]\n\n\
         TRANSCRIPT JSON:\n{transcript}\n",
        count = moment_count,
        min = min_time,
        max = max_time,
        transcript = chunk_json,
    )
}

/// Pulls the reply text out of a generateContent response body, logging any
/// service-reported error details on the way.
pub(crate) fn extract_reply_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("Gemini error message: {}", msg));
        }
        if let Some(status) = err.get("status").and_then(|v| v.as_str()) {
            logw(format!("Gemini error status: {}", status));
        }
        return None;
    }

    let parts = root
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let mut out = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            out.push_str(text);
        }
    }

    if out.is_empty() { None } else { Some(out) }
}

impl GeminiClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        let rpm = cfg.requests_per_minute.max(1);
        Self {
            client,
            api_key: cfg.gemini_key.clone(),
            model: cfg.gemini_model.clone(),
            min_interval: Duration::from_secs_f64(60.0 / rpm as f64),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// One request for one chunk: prompt embeds the chunk transcript, its
    /// allocated moment count, and the duration window.
    pub async fn find_moments(
        &self,
        chunk: &Chunk,
        chunk_index: usize,
        moment_count: usize,
        cfg: &Config,
    ) -> Result<String> {
        let chunk_json = chunk
            .to_prompt_json()
            .map_err(|err| ClipError::ModelCall {
                chunk: chunk_index,
                reason: format!("failed to serialize chunk transcript: {}", err),
            })?;
        let prompt = build_moment_prompt(
            &chunk_json,
            moment_count,
            cfg.min_moment_time,
            cfg.max_moment_time,
        );

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE, self.model, self.api_key
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            if !raw.is_empty() {
                let snippet = raw.chars().take(800).collect::<String>();
                logw(format!("Gemini raw body: {}", snippet));
            }
            return Err(ClipError::ModelCall {
                chunk: chunk_index,
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        extract_reply_text(&raw).ok_or_else(|| ClipError::ModelCall {
            chunk: chunk_index,
            reason: "no reply text in response".to_string(),
        })
    }

    /// Runs the extraction stage: one sequential call per chunk with the
    /// minimum inter-call spacing after every call except the last. A
    /// failed call or a rejected reply costs only that chunk's moments.
    pub async fn extract_moments(
        &self,
        chunks: &[Chunk],
        allocations: &[usize],
        cfg: &Config,
    ) -> Vec<Vec<Moment>> {
        let mut per_chunk: Vec<Vec<Moment>> = Vec::with_capacity(chunks.len());

        for (index, (chunk, &count)) in chunks.iter().zip(allocations).enumerate() {
            if count == 0 {
                per_chunk.push(Vec::new());
                continue;
            }

            logi(format!(
                "Requesting {} moment(s) for chunk {}/{} ({:.0}s of transcript)...",
                count,
                index + 1,
                chunks.len(),
                chunk.duration()
            ));

            let extracted = match self.find_moments(chunk, index, count, cfg).await {
                Ok(raw) => match moments::sanitize_chunk_reply(&raw, index) {
                    Ok(parsed) => {
                        logok(format!(
                            "Chunk {}/{}: {} validated moment(s)",
                            index + 1,
                            chunks.len(),
                            parsed.len()
                        ));
                        parsed
                    }
                    Err(err) => {
                        logw(err.to_string());
                        Vec::new()
                    }
                },
                Err(err) => {
                    logw(err.to_string());
                    Vec::new()
                }
            };
            per_chunk.push(extracted);

            let more_calls_ahead = allocations[index + 1..].iter().any(|&c| c > 0);
            if more_calls_ahead {
                logi(format!(
                    "Rate limit pacing: sleeping {:.1}s before next chunk",
                    self.min_interval.as_secs_f64()
                ));
                tokio::time::sleep(self.min_interval).await;
            }
        }

        per_chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_count_bounds_and_transcript() {
        let prompt = build_moment_prompt("[{\"start\":0.0}]", 3, 20.0, 60.0);
        assert!(prompt.contains("Extract 3 viral moments"));
        assert!(prompt.contains("between 20 and 60 seconds"));
        assert!(prompt.contains("[{\"start\":0.0}]"));
        assert!(prompt.contains("video_title"));
    }

    #[test]
    fn reply_text_is_extracted_from_candidates() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "[{\"start\": 1}"}, {"text": "]"}]}
            }]
        }"#;
        assert_eq!(extract_reply_text(body).unwrap(), "[{\"start\": 1}]");
    }

    #[test]
    fn service_error_yields_no_text() {
        let body = r#"{"error": {"message": "quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(extract_reply_text(body).is_none());
    }

    #[test]
    fn malformed_body_yields_no_text() {
        assert!(extract_reply_text("not json at all").is_none());
        assert!(extract_reply_text("{\"candidates\": []}").is_none());
    }
}
