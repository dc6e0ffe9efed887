//! Anthropic Claude analysis over the Messages API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{parse_json_reply, AiError, AiResult, Analyzer, IntakeAnalysis, SessionAnalysis};
use crate::config::IntegrationsConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const ANALYSIS_MAX_TOKENS: u32 = 2048;
const SUMMARY_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct ClaudeAnalyzer {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

fn session_prompt(transcript: &str) -> String {
    format!(
        "You are an experienced clinical psychologist. Analyze the following therapy \
         session transcript and return a structured analysis. Write the values in the \
         language of the transcript.\n\n\
         Transcript:\n{transcript}\n\n\
         Reply with JSON only, shaped as:\n\
         {{\n  \"summary\": \"2-3 sentence summary\",\n  \
         \"keyTopics\": [\"topic\"],\n  \
         \"emotionalMarkers\": [{{\"emotion\": \"name\", \"intensity\": \"low|medium|high\", \"context\": \"where it appeared\"}}],\n  \
         \"recommendations\": [\"recommendation\"],\n  \
         \"nextSessionNotes\": \"points for the next session\"\n}}"
    )
}

fn intake_prompt(transcript: &str) -> String {
    format!(
        "You are an experienced clinical psychologist. Analyze the following intake \
         conversation and build an initial client profile. Write the values in the \
         language of the transcript.\n\n\
         Transcript:\n{transcript}\n\n\
         Reply with JSON only, shaped as:\n\
         {{\n  \"clientProfile\": {{\"presentingIssues\": [\"issue\"], \"background\": \"short background\", \"goals\": [\"goal\"]}},\n  \
         \"recommendations\": [\"treatment recommendation\"],\n  \
         \"riskFactors\": [\"risk factor\"]\n}}\n\
         Use an empty list when there are no risk factors."
    )
}

fn summary_prompt(transcript: &str) -> String {
    format!(
        "You are an experienced clinical psychologist. Write a short professional summary \
         of the following therapy session, in the third person, suitable for clinical \
         records. Use 3-5 sentences in the language of the transcript.\n\n\
         Transcript:\n{transcript}"
    )
}

impl ClaudeAnalyzer {
    pub fn from_config(config: &IntegrationsConfig) -> AiResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key: config.anthropic_api_key.clone(),
            model: config.anthropic_model.clone(),
            base_url: config.anthropic_base_url.clone(),
        })
    }

    fn api_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    /// Sends one user message and returns the text of the first text block
    async fn complete(&self, prompt: String, max_tokens: u32) -> AiResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AiError::NotConfigured("ANTHROPIC_API_KEY"))?;

        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }]
        });

        let response = self
            .client
            .post(self.api_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: "Anthropic",
                status,
                body,
            });
        }

        let reply: MessagesResponse = response.json().await?;
        first_text(reply)
    }
}

fn first_text(reply: MessagesResponse) -> AiResult<String> {
    reply
        .content
        .into_iter()
        .next()
        .filter(|block| block.block_type == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| AiError::InvalidResponse("unexpected response type".to_string()))
}

#[async_trait]
impl Analyzer for ClaudeAnalyzer {
    fn name(&self) -> &str {
        "claude"
    }

    async fn analyze_session(&self, transcript: &str) -> AiResult<SessionAnalysis> {
        let text = self.complete(session_prompt(transcript), ANALYSIS_MAX_TOKENS).await?;
        parse_json_reply(&text)
    }

    async fn analyze_intake(&self, transcript: &str) -> AiResult<IntakeAnalysis> {
        let text = self.complete(intake_prompt(transcript), ANALYSIS_MAX_TOKENS).await?;
        parse_json_reply(&text)
    }

    async fn summarize(&self, transcript: &str) -> AiResult<String> {
        let text = self.complete(summary_prompt(transcript), SUMMARY_MAX_TOKENS).await?;
        Ok(text.trim().to_string())
    }
}
