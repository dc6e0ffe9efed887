//! Deterministic AI stand-ins for tests and local development
//!
//! Each mock either returns a fixed result or fails with
//! [`AiError::InvalidResponse`], and counts how often it was called.
//!
//! # Example
//!
//! ```
//! use tipul_worker::ai::{MockTranscriber, Transcriber};
//!
//! # async fn example() {
//! let transcriber = MockTranscriber::new("Therapist: Hello");
//! let out = transcriber.transcribe(b"audio", "audio/webm", false).await.unwrap();
//! assert_eq!(out.text, "Therapist: Hello");
//! assert_eq!(transcriber.calls(), 1);
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{
    AiError, AiResult, Analyzer, ClientProfile, IntakeAnalysis, Segment, SessionAnalysis,
    TranscriptOutput, Transcriber,
};

#[derive(Debug, Default)]
pub struct MockTranscriber {
    text: String,
    fail: bool,
    calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        _mime_type: &str,
        with_segments: bool,
    ) -> AiResult<TranscriptOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail || audio.is_empty() {
            return Err(AiError::InvalidResponse("mock transcription failure".to_string()));
        }

        let segments = with_segments.then(|| {
            vec![Segment {
                start: 0.0,
                end: 5.0,
                text: self.text.clone(),
                speaker: Some("therapist".to_string()),
            }]
        });

        Ok(TranscriptOutput {
            text: self.text.clone(),
            confidence: Some(1.0),
            segments,
        })
    }
}

#[derive(Debug, Default)]
pub struct MockAnalyzer {
    fail: bool,
    calls: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> AiResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AiError::InvalidResponse("mock analysis failure".to_string()));
        }
        Ok(())
    }
}

fn first_line(transcript: &str) -> String {
    transcript.lines().next().unwrap_or_default().trim().to_string()
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze_session(&self, transcript: &str) -> AiResult<SessionAnalysis> {
        self.check()?;

        Ok(SessionAnalysis {
            summary: format!("Session summary: {}", first_line(transcript)),
            key_topics: vec!["mock topic".to_string()],
            emotional_markers: Vec::new(),
            recommendations: vec!["continue weekly sessions".to_string()],
            next_session_notes: "review progress".to_string(),
        })
    }

    async fn analyze_intake(&self, transcript: &str) -> AiResult<IntakeAnalysis> {
        self.check()?;

        Ok(IntakeAnalysis {
            client_profile: ClientProfile {
                presenting_issues: vec!["mock issue".to_string()],
                background: first_line(transcript),
                goals: vec!["mock goal".to_string()],
            },
            recommendations: Vec::new(),
            risk_factors: Vec::new(),
        })
    }

    async fn summarize(&self, transcript: &str) -> AiResult<String> {
        self.check()?;
        Ok(format!("Summary: {}", first_line(transcript)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transcriber_segments() {
        let t = MockTranscriber::new("hello");

        let plain = t.transcribe(b"a", "audio/webm", false).await.unwrap();
        assert!(plain.segments.is_none());

        let segmented = t.transcribe(b"a", "audio/webm", true).await.unwrap();
        assert_eq!(segmented.segments.map(|s| s.len()), Some(1));
        assert_eq!(t.calls(), 2);
    }

    #[tokio::test]
    async fn test_failing_mocks() {
        assert!(MockTranscriber::failing().transcribe(b"a", "audio/webm", false).await.is_err());

        let analyzer = MockAnalyzer::failing();
        assert!(analyzer.analyze_session("x").await.is_err());
        assert!(analyzer.summarize("x").await.is_err());
        assert_eq!(analyzer.calls(), 2);
    }
}
