use crate::capture::{FrameReading, FrameSource};
use crate::config::{AppConfig, ScanWindow};
use crate::emotion::{collect_scan, fuse, Decision, ScanOutcome, VOICE_ACCEPT_THRESHOLD};
use crate::history::{HistoryError, Method, MoodLogger};
use crate::motivation::{announcement, MotivationTable, REFERRAL};
use crate::speech::Speaker;
use crate::state::MoodBoard;
use crate::voice::{self, MoodAnalyzer, RecognizeError, SpeechRecognizer, VoiceReading};
use futures::future::OptionFuture;
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "session";

/// Frames below this score do not replace the message in live mode.
pub const LIVE_MESSAGE_MIN_CONFIDENCE: f32 = 0.3;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("{0} task failed: {1}")]
    Task(&'static str, String),
    #[error(transparent)]
    History(#[from] HistoryError),
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub scan: ScanWindow,
    pub frame_interval: Duration,
    pub listen_timeout: Duration,
    /// Also offer a song and the counselor referral.
    pub support: bool,
}

impl SessionConfig {
    pub fn from_app(app: &AppConfig) -> Self {
        Self {
            scan: app.scan,
            frame_interval: app.frame_interval,
            listen_timeout: app.listen_timeout,
            support: false,
        }
    }

    pub fn channel_capacity(&self) -> usize {
        self.scan.frames().clamp(2, 64)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    pub scan: ScanOutcome,
    pub voice: Option<VoiceReading>,
    pub decision: Decision,
    pub method: Method,
    pub message: String,
    pub song: Option<String>,
    pub logged: bool,
}

/// One check-in: scan the face while listening, fuse, respond, log.
pub struct MoodSession<F, R, A, S> {
    pub frames: F,
    pub recognizer: Option<R>,
    pub analyzer: A,
    pub speaker: S,
    pub motivations: MotivationTable,
    pub logger: Option<MoodLogger>,
    pub config: SessionConfig,
}

impl<F, R, A, S> MoodSession<F, R, A, S>
where
    F: FrameSource,
    R: SpeechRecognizer + Clone + 'static,
    A: MoodAnalyzer + Clone + 'static,
    S: Speaker,
{
    pub async fn run<G: Rng + ?Sized>(&mut self, rng: &mut G) -> Result<SessionReport, SessionError> {
        self.say("Scanning your face. Please look at the camera.").await;

        let voice_task = self.spawn_listen();

        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity());
        let capture_task = tokio::spawn(self.frames.start(tx));
        let scan = collect_scan(&mut rx, self.config.scan).await;
        drop(rx);

        match capture_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "frame capture failed");
                if scan.frames == 0 {
                    self.say("Sorry, I couldn't access your camera.").await;
                }
            }
            Err(e) => return Err(SessionError::Task("capture", e.to_string())),
        }

        let voice = match voice_task {
            Some(handle) => match handle.await {
                Ok(Ok(reading)) => Some(reading),
                Ok(Err(e)) => {
                    tracing::warn!(target: LOG_TARGET, error = %e, "no voice reading");
                    None
                }
                Err(e) => return Err(SessionError::Task("listen", e.to_string())),
            },
            None => None,
        };

        let decision = fuse(scan.decision, voice.as_ref().map(|v| v.decision));
        let method = match &voice {
            Some(v) if v.decision.confidence() > VOICE_ACCEPT_THRESHOLD => {
                if scan.samples == 0 {
                    Method::Voice
                } else {
                    Method::FacialVoice
                }
            }
            _ => Method::Facial,
        };

        tracing::info!(
            target: LOG_TARGET,
            emotion = %decision.emotion(),
            confidence = decision.confidence(),
            %method,
            frames = scan.frames,
            samples = scan.samples,
            "mood decided"
        );

        self.say(&announcement(&decision)).await;
        let message = self.motivations.pick(decision.emotion(), rng).to_owned();
        self.say(&message).await;

        let song = if self.config.support {
            let song = self
                .motivations
                .pick_song(decision.emotion(), rng)
                .map(str::to_owned);
            self.say(REFERRAL).await;
            if let Some(song) = &song {
                self.say(&format!("Here is a song that might help: {song}")).await;
            }
            song
        } else {
            None
        };

        let logged = match self.logger.as_mut() {
            Some(logger) => {
                let notes = voice
                    .as_ref()
                    .map(|v| format!("said: {}", v.transcript))
                    .unwrap_or_default();
                logger.log_mood(&decision, method, notes)?;
                true
            }
            None => false,
        };

        Ok(SessionReport {
            scan,
            voice,
            decision,
            method,
            message,
            song,
            logged,
        })
    }

    fn spawn_listen(&self) -> Option<JoinHandle<Result<VoiceReading, RecognizeError>>> {
        let recognizer = self.recognizer.clone()?;
        let analyzer = self.analyzer.clone();
        let timeout = self.config.listen_timeout;
        Some(tokio::spawn(async move {
            voice::listen(&recognizer, &analyzer, timeout).await
        }))
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.speaker.speak(text.to_owned()).await {
            tracing::warn!(target: LOG_TARGET, error = %e, "speech output failed");
        }
    }
}

/// Live mode: publishes every frame's top emotion to `board` until the frame
/// source ends, folding in a voice reading whenever `voice` completes.
pub async fn monitor<G: Rng + ?Sized>(
    rx: &mut mpsc::Receiver<FrameReading>,
    voice: Option<JoinHandle<Result<VoiceReading, RecognizeError>>>,
    board: &MoodBoard,
    motivations: &MotivationTable,
    rng: &mut G,
) -> Result<(), SessionError> {
    let mut voice = voice;
    let mut voice_pending = voice.is_some();
    if voice_pending {
        board.begin_listening();
    }

    loop {
        tokio::select! {
            reading = rx.recv() => {
                let Some(reading) = reading else { break };
                let Some(sample) = reading.sample else { continue };
                board.publish_face(Decision::new(sample.label(), sample.score()));
                if sample.score() > LIVE_MESSAGE_MIN_CONFIDENCE {
                    board.set_message(motivations.pick(sample.label(), rng));
                }
            }
            Some(joined) = OptionFuture::from(voice.as_mut()), if voice_pending => {
                voice_pending = false;
                let outcome = joined.map_err(|e| SessionError::Task("listen", e.to_string()))?;
                fold_voice(outcome, board, motivations, rng);
            }
        }
    }

    // The frame branch can win the race against a listen task that has
    // already completed; its reading still belongs on the board.
    if voice_pending {
        match voice {
            Some(handle) if handle.is_finished() => {
                let outcome = handle
                    .await
                    .map_err(|e| SessionError::Task("listen", e.to_string()))?;
                fold_voice(outcome, board, motivations, rng);
            }
            Some(handle) => {
                handle.abort();
                board.stop_listening();
            }
            None => board.stop_listening(),
        }
    }
    tracing::debug!(target: LOG_TARGET, "frame source ended, monitor stopping");
    Ok(())
}

fn fold_voice<G: Rng + ?Sized>(
    outcome: Result<VoiceReading, RecognizeError>,
    board: &MoodBoard,
    motivations: &MotivationTable,
    rng: &mut G,
) {
    if let Ok(reading) = &outcome {
        board.set_message(motivations.pick(reading.decision.emotion(), rng));
    }
    board.finish_listening(outcome);
}
