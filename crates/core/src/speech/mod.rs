mod console;

use futures::future::BoxFuture;

pub use console::ConsoleSpeaker;

#[derive(thiserror::Error, Debug)]
pub enum SpeakError {
    #[error("speech output unavailable: {details}")]
    OutputUnavailable { details: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text-to-speech output.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: String) -> BoxFuture<'_, Result<(), SpeakError>>;
}
