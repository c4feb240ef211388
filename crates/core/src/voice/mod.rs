mod analyzer;
mod recognizer;

use crate::emotion::Decision;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use analyzer::{AnalyzeError, KeywordMoodAnalyzer, MoodAnalyzer, KEYWORD_CONFIDENCE};
pub use recognizer::{RecognizeError, ScriptedRecognizer, SpeechRecognizer, Transcript};

const LOG_TARGET: &str = "voice";

/// A classified utterance.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoiceReading {
    pub transcript: String,
    pub decision: Decision,
}

/// Listens for one utterance and classifies it.
///
/// The whole session, recognition included, is bounded by `timeout`.
pub async fn listen<R, A>(
    recognizer: &R,
    analyzer: &A,
    timeout: Duration,
) -> Result<VoiceReading, RecognizeError>
where
    R: SpeechRecognizer + ?Sized,
    A: MoodAnalyzer + ?Sized,
{
    let transcript = tokio::time::timeout(timeout, recognizer.listen())
        .await
        .map_err(|_| RecognizeError::Timeout(timeout))??;

    let text = transcript.text.trim().to_owned();
    if text.is_empty() {
        return Err(RecognizeError::Unintelligible);
    }

    let decision = analyzer
        .analyze_text(text.clone())
        .await
        .map_err(|e| RecognizeError::Service(e.to_string()))?;

    tracing::info!(
        target: LOG_TARGET,
        transcript = %text,
        emotion = %decision.emotion(),
        confidence = decision.confidence(),
        "voice mood classified"
    );

    Ok(VoiceReading {
        transcript: text,
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    struct SlowRecognizer;

    impl SpeechRecognizer for SlowRecognizer {
        fn listen(&self) -> BoxFuture<'_, Result<Transcript, RecognizeError>> {
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Transcript::new("too late"))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn classifies_recognized_speech() {
        let recognizer = ScriptedRecognizer::said("I feel so tired today");
        let reading = listen(&recognizer, &KeywordMoodAnalyzer::new(), Duration::from_secs(1))
            .await
            .expect("reading");
        assert_eq!(reading.transcript, "I feel so tired today");
        assert_eq!(reading.decision.emotion(), Emotion::Neutral);
        assert_eq!(reading.decision.confidence(), KEYWORD_CONFIDENCE);
    }

    #[tokio::test]
    async fn silence_is_reported_as_no_speech() {
        let err = listen(
            &ScriptedRecognizer::silent(),
            &KeywordMoodAnalyzer::new(),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecognizeError::NoSpeech));
    }

    #[tokio::test]
    async fn blank_transcript_is_unintelligible() {
        let err = listen(
            &ScriptedRecognizer::said("   "),
            &KeywordMoodAnalyzer::new(),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecognizeError::Unintelligible));
    }

    #[tokio::test(start_paused = true)]
    async fn listening_is_bounded_by_timeout() {
        let err = listen(&SlowRecognizer, &KeywordMoodAnalyzer::new(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RecognizeError::Timeout(_)));
    }
}
