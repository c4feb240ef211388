use crate::config::SpeechSettings;
use crate::speech::{SpeakError, Speaker};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io::Write;
use std::sync::{Arc, Mutex};

const LOG_TARGET: &str = "speech::console";

/// Writes each utterance as a `System:` line instead of audio.
#[derive(Clone)]
pub struct ConsoleSpeaker {
    settings: SpeechSettings,
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ConsoleSpeaker {
    pub fn new(settings: SpeechSettings) -> Self {
        Self::with_writer(settings, std::io::stdout())
    }

    pub fn with_writer<W: Write + Send + 'static>(settings: SpeechSettings, out: W) -> Self {
        Self {
            settings,
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }
}

impl Speaker for ConsoleSpeaker {
    fn speak(&self, text: String) -> BoxFuture<'_, Result<(), SpeakError>> {
        async move {
            tracing::debug!(
                target: LOG_TARGET,
                rate = self.settings.rate,
                volume = self.settings.volume,
                %text,
                "speaking"
            );
            let mut out = self
                .out
                .lock()
                .map_err(|_| SpeakError::OutputUnavailable {
                    details: "output lock poisoned".to_owned(),
                })?;
            writeln!(out, "System: {text}")?;
            out.flush()?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_system_lines() {
        let buf = SharedBuf::default();
        let speaker = ConsoleSpeaker::with_writer(SpeechSettings::default(), buf.clone());
        speaker.speak("Hello there.".into()).await.unwrap();
        speaker.speak("Take care.".into()).await.unwrap();

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "System: Hello there.\nSystem: Take care.\n");
    }
}
