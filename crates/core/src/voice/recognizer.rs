use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    pub text: String,
}

impl Transcript {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognizeError {
    #[error("no speech detected")]
    NoSpeech,
    #[error("could not understand audio")]
    Unintelligible,
    #[error("no speech within {0:?}")]
    Timeout(Duration),
    #[error("speech recognition error: {0}")]
    Service(String),
}

/// Speech-to-text for a single listening session.
pub trait SpeechRecognizer: Send + Sync {
    fn listen(&self) -> BoxFuture<'_, Result<Transcript, RecognizeError>>;
}

/// Returns a fixed transcript, or silence.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRecognizer {
    text: Option<String>,
}

impl ScriptedRecognizer {
    pub fn said<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn silent() -> Self {
        Self { text: None }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn listen(&self) -> BoxFuture<'_, Result<Transcript, RecognizeError>> {
        async move {
            match &self.text {
                Some(text) => Ok(Transcript::new(text.clone())),
                None => Err(RecognizeError::NoSpeech),
            }
        }
        .boxed()
    }
}
