use crate::emotion::{Decision, Emotion};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const FALLBACK_MESSAGE: &str = "I hope you're doing well today.";
pub const REFERRAL: &str =
    "Consider talking to a close friend or a counselor if you're feeling overwhelmed.";

#[derive(thiserror::Error, Debug)]
pub enum MotivationError {
    #[error("failed to read motivation table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid motivation table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Canned lines spoken back to the user, keyed by mood.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MotivationTable {
    pub messages: BTreeMap<Emotion, Vec<String>>,
    #[serde(default)]
    pub songs: BTreeMap<Emotion, Vec<String>>,
}

impl MotivationTable {
    pub fn from_json_str(raw: &str) -> Result<Self, MotivationError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MotivationError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Random message for `label`, drawn from `rng`.
    pub fn pick<R: Rng + ?Sized>(&self, label: Emotion, rng: &mut R) -> &str {
        self.messages
            .get(&label)
            .and_then(|lines| lines.choose(rng))
            .map(String::as_str)
            .unwrap_or(FALLBACK_MESSAGE)
    }

    pub fn pick_song<R: Rng + ?Sized>(&self, label: Emotion, rng: &mut R) -> Option<&str> {
        self.songs
            .get(&label)
            .and_then(|songs| songs.choose(rng))
            .map(String::as_str)
    }
}

/// Sentence announcing the detected mood.
pub fn announcement(decision: &Decision) -> String {
    if decision.confidence() > 0.0 {
        format!(
            "You seem to be feeling {} with {}% confidence.",
            decision.emotion(),
            decision.percent()
        )
    } else {
        format!("You seem to be feeling {}.", decision.emotion())
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

impl Default for MotivationTable {
    fn default() -> Self {
        let messages = BTreeMap::from([
            (
                Emotion::Angry,
                lines(&[
                    "Take a deep breath. You're stronger than your anger.",
                    "Channel your frustration into something productive.",
                    "It's okay to feel angry, just don't let it control you.",
                    "Step back for a moment. This feeling will pass.",
                    "Your anger is valid, but you have the power to respond calmly.",
                ]),
            ),
            (
                Emotion::Sad,
                lines(&[
                    "Everything will be okay. You've survived 100% of your worst days.",
                    "You're not alone. You are loved and valued.",
                    "Crying is not a weakness. It's a sign of strength.",
                    "This too shall pass. Better days are coming.",
                    "Be gentle with yourself. You're doing the best you can.",
                ]),
            ),
            (
                Emotion::Happy,
                lines(&[
                    "Keep smiling, it makes others happy too!",
                    "You're glowing with positivity. Spread it around!",
                    "Happiness is contagious, enjoy it!",
                    "Your joy is beautiful. Hold onto this feeling.",
                    "What a wonderful moment! Savor it.",
                ]),
            ),
            (
                Emotion::Surprise,
                lines(&[
                    "Wow, you look surprised! Something unexpected must've happened.",
                    "Surprises make life interesting. Embrace the unknown!",
                    "Life keeps us on our toes. Roll with it!",
                    "Unexpected moments can lead to great things.",
                ]),
            ),
            (
                Emotion::Neutral,
                lines(&[
                    "Sometimes, a neutral moment is peaceful. Enjoy it.",
                    "Take this time to reflect and recharge.",
                    "Calm moments are valuable. Use them wisely.",
                    "Balance is good. You're in a steady place.",
                ]),
            ),
            (
                Emotion::Fear,
                lines(&[
                    "Fear is natural. You can overcome it, step by step.",
                    "Face your fears. You're braver than you believe.",
                    "It's okay to be scared. Courage is acting despite fear.",
                    "You've faced challenges before. You can do this too.",
                ]),
            ),
            (
                Emotion::Disgust,
                lines(&[
                    "Something bothering you? Take a moment to breathe.",
                    "Not everything deserves your energy. Let go of what disgusts you.",
                    "Trust your instincts. It's okay to feel this way.",
                    "Sometimes we need to distance ourselves from negativity.",
                ]),
            ),
        ]);

        let songs = BTreeMap::from([
            (
                Emotion::Sad,
                lines(&["'Fix You' by Coldplay", "'Someone Like You' by Adele"]),
            ),
            (
                Emotion::Angry,
                lines(&["'Lose Yourself' by Eminem", "'Numb' by Linkin Park"]),
            ),
            (
                Emotion::Happy,
                lines(&[
                    "'Happy' by Pharrell Williams",
                    "'Can't Stop the Feeling' by Justin Timberlake",
                ]),
            ),
            (
                Emotion::Neutral,
                lines(&[
                    "'Let It Be' by The Beatles",
                    "'Banana Pancakes' by Jack Johnson",
                ]),
            ),
            (
                Emotion::Surprise,
                lines(&["'A Sky Full of Stars' by Coldplay"]),
            ),
            (
                Emotion::Fear,
                lines(&[
                    "'Shake It Out' by Florence + The Machine",
                    "'Roar' by Katy Perry",
                ]),
            ),
            (
                Emotion::Disgust,
                lines(&["'Stronger' by Kelly Clarkson", "'Unbreakable' by Alicia Keys"]),
            ),
        ]);

        Self { messages, songs }
    }
}
