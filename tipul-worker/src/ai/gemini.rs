//! Google Gemini transcription over the `generateContent` REST endpoint

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{parse_json_reply, AiError, AiResult, Segment, TranscriptOutput, Transcriber};
use crate::config::IntegrationsConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct GeminiTranscriber {
    client: Client,
    api_key: Option<String>,
    model: String,
    language: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SegmentedReply {
    text: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

impl GeminiTranscriber {
    /// Builds the client; a missing key is reported on first use
    pub fn from_config(config: &IntegrationsConfig) -> AiResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key: config.google_ai_api_key.clone(),
            model: config.gemini_model.clone(),
            language: config.transcription_language.clone(),
            base_url: config.gemini_base_url.clone(),
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn prompt(&self, with_segments: bool) -> String {
        if with_segments {
            format!(
                "Transcribe this recording in language \"{lang}\" with timestamps. \
                 Label speakers as \"therapist\" and \"client\". \
                 Reply with JSON only, shaped as \
                 {{\"text\": \"full transcript\", \"segments\": \
                 [{{\"start\": 0, \"end\": 5, \"text\": \"segment text\", \"speaker\": \"therapist\"}}]}}",
                lang = self.language
            )
        } else {
            format!(
                "Transcribe this recording in language \"{lang}\". \
                 If there is more than one speaker, prefix their lines with \
                 \"Therapist:\" and \"Client:\". Reply with the transcript only.",
                lang = self.language
            )
        }
    }

    async fn generate(&self, audio: &[u8], mime_type: &str, prompt: String) -> AiResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AiError::NotConfigured("GOOGLE_AI_API_KEY"))?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": mime_type, "data": BASE64.encode(audio) } },
                    { "text": prompt }
                ]
            }]
        });

        tracing::debug!(model = %self.model, mime_type, size = audio.len(), "Sending audio to Gemini");

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: "Gemini",
                status,
                body,
            });
        }

        let reply: GenerateResponse = response.json().await?;
        let text: String = reply
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(AiError::InvalidResponse("empty transcript".to_string()));
        }

        Ok(text)
    }
}

#[async_trait]
impl Transcriber for GeminiTranscriber {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        with_segments: bool,
    ) -> AiResult<TranscriptOutput> {
        let text = self.generate(audio, mime_type, self.prompt(with_segments)).await?;

        if !with_segments {
            return Ok(TranscriptOutput {
                text: text.trim().to_string(),
                confidence: None,
                segments: None,
            });
        }

        // Fall back to the raw text when the model ignores the JSON format
        match parse_json_reply::<SegmentedReply>(&text) {
            Ok(reply) => Ok(TranscriptOutput {
                text: reply.text,
                confidence: None,
                segments: Some(reply.segments),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Segmented transcript was not JSON");
                Ok(TranscriptOutput {
                    text: text.trim().to_string(),
                    confidence: None,
                    segments: Some(Vec::new()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcriber(key: Option<&str>) -> GeminiTranscriber {
        let config = IntegrationsConfig {
            google_ai_api_key: key.map(String::from),
            ..Default::default()
        };
        GeminiTranscriber::from_config(&config).unwrap()
    }

    #[test]
    fn test_api_url() {
        let config = IntegrationsConfig {
            gemini_base_url: "http://localhost:9999/".to_string(),
            ..Default::default()
        };
        let t = GeminiTranscriber::from_config(&config).unwrap();
        assert_eq!(
            t.api_url(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_prompt_mentions_language() {
        let t = transcriber(Some("k"));
        assert!(t.prompt(false).contains("\"he\""));
        assert!(t.prompt(true).contains("segments"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let err = transcriber(None).transcribe(b"audio", "audio/webm", false).await.unwrap_err();
        assert!(matches!(err, AiError::NotConfigured("GOOGLE_AI_API_KEY")));
    }

    #[test]
    fn test_response_text_is_concatenated() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();

        let text: String = reply
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        assert_eq!(text, "Hello world");
    }
}
