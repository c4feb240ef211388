use crate::emotion::{fuse, Decision, Emotion};
use crate::voice::{RecognizeError, VoiceReading};
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::watch;

pub const WELCOME_MESSAGE: &str = "Welcome! Look at the camera to detect your mood.";

/// Everything known about the user's mood at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct MoodSnapshot {
    pub face: Decision,
    pub voice: Option<VoiceReading>,
    /// What to show in place of a transcript, e.g. why listening failed.
    pub voice_text: String,
    pub message: String,
    pub is_listening: bool,
    pub updated_at: DateTime<Local>,
}

impl MoodSnapshot {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            face: Decision::fallback(),
            voice: None,
            voice_text: String::new(),
            message: message.into(),
            is_listening: false,
            updated_at: Local::now(),
        }
    }

    /// Face and voice fused into the mood to report.
    pub fn combined(&self) -> Decision {
        fuse(self.face, self.voice.as_ref().map(|v| v.decision))
    }

    pub fn report(&self) -> MoodReport {
        let combined = self.combined();
        MoodReport {
            emotion: combined.emotion(),
            confidence: round2(combined.confidence()),
            message: self.message.clone(),
            voice_text: self.voice_text.clone(),
            voice_emotion: self.voice.as_ref().map(|v| v.decision.emotion()),
            is_listening: self.is_listening,
            timestamp: Local::now(),
        }
    }
}

impl Default for MoodSnapshot {
    fn default() -> Self {
        Self::new(WELCOME_MESSAGE)
    }
}

/// Status document handed to clients polling for the current mood.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MoodReport {
    pub emotion: Emotion,
    pub confidence: f32,
    pub message: String,
    pub voice_text: String,
    pub voice_emotion: Option<Emotion>,
    pub is_listening: bool,
    pub timestamp: DateTime<Local>,
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// Latest-value cell for the mood. The owner is the only writer; any number
/// of [`MoodReader`]s observe it.
#[derive(Debug)]
pub struct MoodBoard {
    tx: watch::Sender<MoodSnapshot>,
}

impl MoodBoard {
    pub fn new(initial: MoodSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn reader(&self) -> MoodReader {
        MoodReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn publish_face(&self, face: Decision) {
        self.tx.send_modify(|s| {
            s.face = face;
            s.updated_at = Local::now();
        });
    }

    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|s| {
            s.message = message;
            s.updated_at = Local::now();
        });
    }

    pub fn begin_listening(&self) {
        self.tx.send_modify(|s| {
            s.is_listening = true;
            s.updated_at = Local::now();
        });
    }

    pub fn stop_listening(&self) {
        if self.tx.borrow().is_listening {
            self.tx.send_modify(|s| {
                s.is_listening = false;
                s.updated_at = Local::now();
            });
        }
    }

    /// Records the outcome of a listening session. A failure keeps the
    /// previous voice reading and shows the reason instead.
    pub fn finish_listening(&self, outcome: Result<VoiceReading, RecognizeError>) {
        self.tx.send_modify(|s| {
            match outcome {
                Ok(reading) => {
                    s.voice_text = reading.transcript.clone();
                    s.voice = Some(reading);
                }
                Err(e) => s.voice_text = e.to_string(),
            }
            s.is_listening = false;
            s.updated_at = Local::now();
        });
    }

    pub fn snapshot(&self) -> MoodSnapshot {
        self.tx.borrow().clone()
    }
}

impl Default for MoodBoard {
    fn default() -> Self {
        Self::new(MoodSnapshot::default())
    }
}

#[derive(Clone, Debug)]
pub struct MoodReader {
    rx: watch::Receiver<MoodSnapshot>,
}

impl MoodReader {
    pub fn snapshot(&self) -> MoodSnapshot {
        self.rx.borrow().clone()
    }

    pub fn report(&self) -> MoodReport {
        self.rx.borrow().report()
    }

    /// Waits for the next update. Returns `false` once the board is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(emotion: Emotion, confidence: f32) -> VoiceReading {
        VoiceReading {
            transcript: "words".to_owned(),
            decision: Decision::new(emotion, confidence),
        }
    }

    #[test]
    fn readers_see_published_face() {
        let board = MoodBoard::default();
        let reader = board.reader();
        board.publish_face(Decision::new(Emotion::Happy, 0.83));

        let report = reader.report();
        assert_eq!(report.emotion, Emotion::Happy);
        assert_eq!(report.confidence, 0.83);
        assert_eq!(report.message, WELCOME_MESSAGE);
        assert_eq!(report.voice_emotion, None);
    }

    #[test]
    fn confident_voice_is_fused_into_report() {
        let board = MoodBoard::default();
        board.publish_face(Decision::new(Emotion::Happy, 0.9));
        board.begin_listening();
        assert!(board.snapshot().is_listening);

        board.finish_listening(Ok(reading(Emotion::Sad, 0.8)));
        let report = board.reader().report();
        assert_eq!(report.emotion, Emotion::Sad);
        assert_eq!(report.confidence, 0.85);
        assert_eq!(report.voice_emotion, Some(Emotion::Sad));
        assert_eq!(report.voice_text, "words");
        assert!(!report.is_listening);
    }

    #[test]
    fn failed_listening_keeps_face_and_explains() {
        let board = MoodBoard::default();
        board.publish_face(Decision::new(Emotion::Angry, 0.7));
        board.begin_listening();
        board.finish_listening(Err(RecognizeError::Unintelligible));

        let snap = board.snapshot();
        assert_eq!(snap.combined(), Decision::new(Emotion::Angry, 0.7));
        assert_eq!(snap.voice_text, "could not understand audio");
        assert!(!snap.is_listening);
    }

    #[test]
    fn report_serializes_expected_fields() {
        let board = MoodBoard::default();
        let value = serde_json::to_value(board.reader().report()).unwrap();
        for key in [
            "emotion",
            "confidence",
            "message",
            "voice_text",
            "voice_emotion",
            "is_listening",
            "timestamp",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["emotion"], "neutral");
    }

    #[tokio::test]
    async fn reader_wakes_on_change_and_ends_with_board() {
        let board = MoodBoard::default();
        let mut reader = board.reader();
        board.set_message("Stay positive!");
        assert!(reader.changed().await);
        assert_eq!(reader.snapshot().message, "Stay positive!");

        drop(board);
        assert!(!reader.changed().await);
    }
}
