mod fusion;
mod scan;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use fusion::{fuse, VOICE_ACCEPT_THRESHOLD};
pub use scan::{aggregate, collect_scan, EmotionTally, ScanAggregator, ScanOutcome};

/// Label set emitted by the facial-emotion detector.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    #[default]
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "angry" => Ok(Emotion::Angry),
            "disgust" | "disgusted" => Ok(Emotion::Disgust),
            "fear" | "fearful" | "scared" => Ok(Emotion::Fear),
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "surprise" | "surprised" => Ok(Emotion::Surprise),
            "neutral" => Ok(Emotion::Neutral),
            _ => Err(UnknownEmotion(s.to_owned())),
        }
    }
}

/// One frame's top emotion as reported by the detector.
///
/// Built through [`Sample::new`] (or deserialized), so the score is always in
/// `[0, 1]`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawSample")]
pub struct Sample {
    label: Emotion,
    score: f32,
}

impl Sample {
    /// Scores outside `[0, 1]` are clamped; NaN becomes 0.
    pub fn new(label: Emotion, score: f32) -> Self {
        Self {
            label,
            score: clamp_unit(score),
        }
    }

    pub fn label(&self) -> Emotion {
        self.label
    }

    pub fn score(&self) -> f32 {
        self.score
    }
}

#[derive(Deserialize)]
struct RawSample {
    label: Emotion,
    score: f32,
}

impl From<RawSample> for Sample {
    fn from(raw: RawSample) -> Self {
        Sample::new(raw.label, raw.score)
    }
}

/// A finalized mood with its confidence in `[0, 1]`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawDecision")]
pub struct Decision {
    emotion: Emotion,
    confidence: f32,
}

impl Decision {
    pub fn new(emotion: Emotion, confidence: f32) -> Self {
        Self {
            emotion,
            confidence: clamp_unit(confidence),
        }
    }

    /// Result of a window in which nothing was observed.
    pub fn fallback() -> Self {
        Self {
            emotion: Emotion::Neutral,
            confidence: 0.0,
        }
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn percent(&self) -> u32 {
        (self.confidence * 100.0) as u32
    }
}

#[derive(Deserialize)]
struct RawDecision {
    emotion: Emotion,
    confidence: f32,
}

impl From<RawDecision> for Decision {
    fn from(raw: RawDecision) -> Self {
        Decision::new(raw.emotion, raw.confidence)
    }
}

pub(crate) fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detector_labels_and_aliases() {
        assert_eq!("happy".parse::<Emotion>().unwrap(), Emotion::Happy);
        assert_eq!(" Surprised ".parse::<Emotion>().unwrap(), Emotion::Surprise);
        assert_eq!("FEAR".parse::<Emotion>().unwrap(), Emotion::Fear);
        assert!("bored".parse::<Emotion>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Decision::new(Emotion::Sad, 0.5)).unwrap();
        assert_eq!(json, r#"{"emotion":"sad","confidence":0.5}"#);
    }

    #[test]
    fn scores_are_clamped_into_unit_range() {
        assert_eq!(Sample::new(Emotion::Happy, 1.7).score(), 1.0);
        assert_eq!(Sample::new(Emotion::Happy, -0.2).score(), 0.0);
        assert_eq!(Sample::new(Emotion::Happy, f32::NAN).score(), 0.0);
    }

    #[test]
    fn deserialized_values_are_clamped_too() {
        let sample: Sample = serde_json::from_str(r#"{"label":"happy","score":3.5}"#).unwrap();
        assert_eq!(sample, Sample::new(Emotion::Happy, 1.0));

        let decision: Decision =
            serde_json::from_str(r#"{"emotion":"sad","confidence":-0.4}"#).unwrap();
        assert_eq!(decision.emotion(), Emotion::Sad);
        assert_eq!(decision.confidence(), 0.0);
    }

    #[test]
    fn display_matches_wire_label() {
        for e in Emotion::ALL {
            assert_eq!(e.to_string().parse::<Emotion>().unwrap(), e);
        }
    }
}
