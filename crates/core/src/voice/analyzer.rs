use crate::emotion::{Decision, Emotion};
use futures::future::BoxFuture;
use futures::FutureExt;

/// Confidence reported when a transcript hits the keyword table.
pub const KEYWORD_CONFIDENCE: f32 = 0.8;
const POLARITY_THRESHOLD: f32 = 0.3;
const UNDECIDED_CONFIDENCE: f32 = 0.5;
const NEGATION_FACTOR: f32 = -0.5;

#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error("mood analysis failed: {0}")]
    Failed(String),
}

/// Turns what the user said into a mood.
pub trait MoodAnalyzer: Send + Sync {
    fn analyze_text(&self, text: String) -> BoxFuture<'_, Result<Decision, AnalyzeError>>;
}

const KEYWORDS: &[(&str, Emotion)] = &[
    ("angry", Emotion::Angry),
    ("hate", Emotion::Angry),
    ("irritated", Emotion::Angry),
    ("mad", Emotion::Angry),
    ("furious", Emotion::Angry),
    ("sad", Emotion::Sad),
    ("depressed", Emotion::Sad),
    ("cry", Emotion::Sad),
    ("unhappy", Emotion::Sad),
    ("miserable", Emotion::Sad),
    ("happy", Emotion::Happy),
    ("joy", Emotion::Happy),
    ("excited", Emotion::Happy),
    ("love", Emotion::Happy),
    ("great", Emotion::Happy),
    ("wonderful", Emotion::Happy),
    ("bored", Emotion::Neutral),
    ("tired", Emotion::Neutral),
    ("exhausted", Emotion::Neutral),
    ("anxious", Emotion::Fear),
    ("worried", Emotion::Fear),
    ("nervous", Emotion::Fear),
    ("stressed", Emotion::Fear),
];

// Word valences in [-1, 1] for the polarity fallback.
const LEXICON: &[(&str, f32)] = &[
    ("good", 0.7),
    ("nice", 0.6),
    ("fine", 0.4),
    ("awesome", 1.0),
    ("amazing", 0.6),
    ("fantastic", 0.4),
    ("glad", 0.5),
    ("fun", 0.3),
    ("best", 1.0),
    ("better", 0.5),
    ("beautiful", 0.85),
    ("perfect", 1.0),
    ("bad", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("lonely", -0.5),
    ("upset", -0.6),
    ("hurt", -0.6),
    ("pain", -0.5),
    ("sick", -0.7),
    ("boring", -1.0),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "don't", "isn't", "wasn't", "can't"];

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(|w| {
        w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
            .to_lowercase()
    })
}

/// First word found in the keyword table, in utterance order.
pub fn match_keyword(text: &str) -> Option<Emotion> {
    words(text).find_map(|w| {
        KEYWORDS
            .iter()
            .find(|(k, _)| *k == w)
            .map(|(_, emotion)| *emotion)
    })
}

/// Mean valence of the lexicon words in `text`, or 0 when none match.
/// A negation directly before a word flips and damps it.
pub fn polarity(text: &str) -> f32 {
    let mut total = 0.0;
    let mut hits = 0u32;
    let mut negated = false;
    for w in words(text) {
        if NEGATIONS.contains(&w.as_str()) {
            negated = true;
            continue;
        }
        if let Some((_, valence)) = LEXICON.iter().find(|(k, _)| *k == w) {
            total += if negated {
                valence * NEGATION_FACTOR
            } else {
                *valence
            };
            hits += 1;
        }
        negated = false;
    }
    if hits == 0 {
        0.0
    } else {
        (total / hits as f32).clamp(-1.0, 1.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct KeywordMoodAnalyzer;

impl KeywordMoodAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Decision {
        if let Some(emotion) = match_keyword(text) {
            return Decision::new(emotion, KEYWORD_CONFIDENCE);
        }
        let p = polarity(text);
        if p > POLARITY_THRESHOLD {
            Decision::new(Emotion::Happy, p.abs())
        } else if p < -POLARITY_THRESHOLD {
            Decision::new(Emotion::Sad, p.abs())
        } else {
            Decision::new(Emotion::Neutral, UNDECIDED_CONFIDENCE)
        }
    }
}

impl MoodAnalyzer for KeywordMoodAnalyzer {
    fn analyze_text(&self, text: String) -> BoxFuture<'_, Result<Decision, AnalyzeError>> {
        async move { Ok(self.classify(&text)) }.boxed()
    }
}
