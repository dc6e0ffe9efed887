/// AI integrations: audio transcription and transcript analysis
///
/// Two traits sit at the seam between the pipeline and the vendors:
///
/// - [`Transcriber`]: audio bytes in, transcript out ([`GeminiTranscriber`])
/// - [`Analyzer`]: transcript in, structured analysis out ([`ClaudeAnalyzer`])
///
/// Both are object safe and used as `Arc<dyn ...>` so tests can swap in
/// [`MockTranscriber`] and [`MockAnalyzer`].
///
/// # Example
///
/// ```no_run
/// use tipul_worker::ai::{Analyzer, ClaudeAnalyzer};
/// use tipul_worker::config::IntegrationsConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let analyzer = ClaudeAnalyzer::from_config(&IntegrationsConfig::from_env())?;
/// let analysis = analyzer.analyze_session("Therapist: How was your week? ...").await?;
/// println!("{}", analysis.summary);
/// # Ok(())
/// # }
/// ```

pub mod claude;
pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tipul_shared::models::analysis::{AnalysisKind, EmotionalMarker, NewAnalysis};
use uuid::Uuid;

pub use claude::ClaudeAnalyzer;
pub use gemini::GeminiTranscriber;
pub use mock::{MockAnalyzer, MockTranscriber};

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

pub type AiResult<T> = Result<T, AiError>;

/// A timed slice of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Seconds from the start of the recording
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptOutput {
    pub text: String,

    /// Provider confidence, when the provider reports one
    pub confidence: Option<f64>,

    pub segments: Option<Vec<Segment>>,
}

/// Structured session analysis as returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalysis {
    pub summary: String,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub emotional_markers: Vec<EmotionalMarker>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub next_session_notes: String,
}

impl SessionAnalysis {
    pub fn into_new_analysis(self, transcription_id: Uuid) -> NewAnalysis {
        NewAnalysis {
            transcription_id,
            kind: AnalysisKind::Session,
            summary: self.summary,
            key_topics: self.key_topics,
            emotional_markers: self.emotional_markers,
            recommendations: self.recommendations,
            risk_factors: Vec::new(),
            next_session_notes: Some(self.next_session_notes).filter(|n| !n.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    #[serde(default)]
    pub presenting_issues: Vec<String>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub goals: Vec<String>,
}

/// Initial client profile built from an intake conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeAnalysis {
    pub client_profile: ClientProfile,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl IntakeAnalysis {
    /// Folds the profile into the shared analysis columns
    pub fn into_new_analysis(self, transcription_id: Uuid) -> NewAnalysis {
        let goals = self.client_profile.goals.join("\n");

        NewAnalysis {
            transcription_id,
            kind: AnalysisKind::Intake,
            summary: self.client_profile.background,
            key_topics: self.client_profile.presenting_issues,
            emotional_markers: Vec::new(),
            recommendations: self.recommendations,
            risk_factors: self.risk_factors,
            next_session_notes: Some(goals).filter(|g| !g.is_empty()),
        }
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribes one recording
    ///
    /// With `with_segments` the provider is asked for timestamped segments;
    /// if it returns none, `segments` is an empty list rather than `None`.
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        with_segments: bool,
    ) -> AiResult<TranscriptOutput>;
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze_session(&self, transcript: &str) -> AiResult<SessionAnalysis>;

    async fn analyze_intake(&self, transcript: &str) -> AiResult<IntakeAnalysis>;

    /// Short third-person clinical summary, free text
    async fn summarize(&self, transcript: &str) -> AiResult<String>;
}

/// The outermost `{...}` span of a model reply
///
/// Models often wrap JSON in prose or code fences.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parses the JSON object embedded in a model reply
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> AiResult<T> {
    let json = extract_json(text)
        .ok_or_else(|| AiError::InvalidResponse("no JSON object in reply".to_string()))?;

    serde_json::from_str(json).map_err(|e| AiError::InvalidResponse(e.to_string()))
}
