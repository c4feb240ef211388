use crate::capture::FrameReading;
use crate::config::ScanWindow;
use crate::emotion::{Decision, Emotion, Sample};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

const LOG_TARGET: &str = "emotion::scan";

/// Scores seen during one window, keyed by the label they were reported under.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmotionTally {
    scores: BTreeMap<Emotion, Vec<f32>>,
}

impl EmotionTally {
    pub fn record(&mut self, sample: Sample) {
        self.scores.entry(sample.label).or_default().push(sample.score);
    }

    pub fn scores(&self, label: Emotion) -> &[f32] {
        self.scores.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Arithmetic mean of the scores recorded under `label`, if any.
    pub fn mean(&self, label: Emotion) -> Option<f32> {
        let scores = self.scores.get(&label)?;
        if scores.is_empty() {
            return None;
        }
        let sum: f32 = scores.iter().sum();
        Some(sum / scores.len() as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Folds per-frame samples into one decision for the window.
///
/// The winning label is the one holding the highest single-frame score
/// (first seen wins on ties). The reported confidence is the mean of every
/// score recorded under that label, not the peak.
#[derive(Clone, Debug, Default)]
pub struct ScanAggregator {
    best: Option<Sample>,
    tally: EmotionTally,
    observed: usize,
}

impl ScanAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sample: Sample) {
        self.tally.record(sample);
        self.observed += 1;
        match self.best {
            Some(best) if sample.score <= best.score => {}
            _ => self.best = Some(sample),
        }
    }

    pub fn len(&self) -> usize {
        self.observed
    }

    pub fn is_empty(&self) -> bool {
        self.observed == 0
    }

    /// Highest single-frame sample so far.
    pub fn running_best(&self) -> Option<Sample> {
        self.best
    }

    pub fn tally(&self) -> &EmotionTally {
        &self.tally
    }

    /// An aggregator whose running best has no tally behind it.
    #[cfg(test)]
    fn with_best(best: Sample) -> Self {
        Self {
            best: Some(best),
            tally: EmotionTally::default(),
            observed: 1,
        }
    }

    /// Mean of the winner's tally, or its single-frame score when no tally
    /// was kept for it.
    pub fn finish(&self) -> Decision {
        let Some(best) = self.best else {
            return Decision::fallback();
        };
        let confidence = self.tally.mean(best.label).unwrap_or(best.score);
        Decision::new(best.label, confidence)
    }
}

pub fn aggregate<I>(samples: I) -> Decision
where
    I: IntoIterator<Item = Sample>,
{
    let mut agg = ScanAggregator::new();
    for sample in samples {
        agg.observe(sample);
    }
    agg.finish()
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScanOutcome {
    pub decision: Decision,
    /// Frames received, with or without a detected face.
    pub frames: usize,
    /// Frames that carried a sample.
    pub samples: usize,
    /// The source stopped before the window was full.
    pub truncated: bool,
}

/// Reads up to `window` frames from `rx` and aggregates them.
///
/// A closed channel ends the window early; whatever arrived before that
/// still produces a decision.
pub async fn collect_scan(rx: &mut mpsc::Receiver<FrameReading>, window: ScanWindow) -> ScanOutcome {
    let mut agg = ScanAggregator::new();
    let mut frames = 0usize;
    let mut truncated = false;

    while frames < window.frames() {
        let Some(reading) = rx.recv().await else {
            truncated = true;
            break;
        };
        frames += 1;
        if let Some(sample) = reading.sample {
            agg.observe(sample);
        }
        if let Some(best) = agg.running_best() {
            tracing::trace!(
                target: LOG_TARGET,
                frame = reading.index,
                current = %best.label,
                score = best.score,
                "frame observed"
            );
        }
    }

    if truncated {
        tracing::warn!(
            target: LOG_TARGET,
            frames,
            window = window.frames(),
            "frame source ended before the scan window filled"
        );
    }

    let decision = agg.finish();
    tracing::debug!(
        target: LOG_TARGET,
        emotion = %decision.emotion,
        confidence = decision.confidence,
        frames,
        samples = agg.len(),
        "scan finished"
    );

    ScanOutcome {
        decision,
        frames,
        samples: agg.len(),
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn s(label: Emotion, score: f32) -> Sample {
        Sample::new(label, score)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn empty_window_is_neutral_with_zero_confidence() {
        assert_eq!(aggregate(Vec::new()), Decision::new(Emotion::Neutral, 0.0));
    }

    #[test]
    fn single_sample_passes_through() {
        let d = aggregate([s(Emotion::Fear, 0.42)]);
        assert_eq!(d.emotion, Emotion::Fear);
        assert!(approx(d.confidence, 0.42));
    }

    #[test]
    fn ties_keep_first_seen_label() {
        let d = aggregate([s(Emotion::Happy, 0.5), s(Emotion::Sad, 0.5)]);
        assert_eq!(d.emotion, Emotion::Happy);
        assert!(approx(d.confidence, 0.5));
    }

    #[test]
    fn confidence_is_mean_of_winning_label_only() {
        let d = aggregate([
            s(Emotion::Angry, 0.4),
            s(Emotion::Angry, 0.8),
            s(Emotion::Sad, 0.9),
        ]);
        assert_eq!(d.emotion, Emotion::Sad);
        assert!(approx(d.confidence, 0.9));

        let d = aggregate([s(Emotion::Angry, 0.4), s(Emotion::Angry, 0.8)]);
        assert_eq!(d.emotion, Emotion::Angry);
        assert!(approx(d.confidence, 0.6));
    }

    #[test]
    fn averaging_can_pull_confidence_below_peak() {
        let d = aggregate([
            s(Emotion::Happy, 0.2),
            s(Emotion::Happy, 0.95),
            s(Emotion::Neutral, 0.7),
            s(Emotion::Happy, 0.3),
        ]);
        assert_eq!(d.emotion, Emotion::Happy);
        assert!(approx(d.confidence, (0.2 + 0.95 + 0.3) / 3.0));
    }

    #[test]
    fn tally_keeps_every_label() {
        let mut agg = ScanAggregator::new();
        agg.observe(s(Emotion::Angry, 0.4));
        agg.observe(s(Emotion::Sad, 0.9));
        agg.observe(s(Emotion::Angry, 0.8));
        assert_eq!(agg.tally().scores(Emotion::Angry), &[0.4, 0.8]);
        assert_eq!(agg.tally().scores(Emotion::Sad), &[0.9]);
        assert!(agg.tally().scores(Emotion::Happy).is_empty());
        assert_eq!(agg.len(), 3);
    }

    #[test]
    fn missing_tally_falls_back_to_peak_score() {
        let agg = ScanAggregator::with_best(s(Emotion::Surprise, 0.65));
        assert!(agg.tally().is_empty());
        let d = agg.finish();
        assert_eq!(d.emotion, Emotion::Surprise);
        assert!(approx(d.confidence, 0.65));
    }

    #[test]
    fn ordering_matters_for_the_winner() {
        let forward = aggregate([s(Emotion::Happy, 0.6), s(Emotion::Sad, 0.6)]);
        let backward = aggregate([s(Emotion::Sad, 0.6), s(Emotion::Happy, 0.6)]);
        assert_eq!(forward.emotion, Emotion::Happy);
        assert_eq!(backward.emotion, Emotion::Sad);
    }

    #[test]
    fn confidence_stays_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let len = rng.random_range(0..40);
            let samples: Vec<Sample> = (0..len)
                .map(|_| {
                    let label = Emotion::ALL[rng.random_range(0..Emotion::ALL.len())];
                    s(label, rng.random::<f32>())
                })
                .collect();
            let d = aggregate(samples);
            assert!((0.0..=1.0).contains(&d.confidence), "{d:?}");
        }
    }

    #[tokio::test]
    async fn collect_scan_stops_at_window_size() {
        let (tx, mut rx) = mpsc::channel(16);
        for i in 0..5 {
            tx.send(FrameReading::detected(i, s(Emotion::Happy, 0.5)))
                .await
                .unwrap();
        }
        let window = ScanWindow::new(3).unwrap();
        let outcome = collect_scan(&mut rx, window).await;
        assert_eq!(outcome.frames, 3);
        assert_eq!(outcome.samples, 3);
        assert!(!outcome.truncated);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn collect_scan_handles_early_end_and_faceless_frames() {
        let (tx, mut rx) = mpsc::channel(16);
        tx.send(FrameReading::empty(0)).await.unwrap();
        tx.send(FrameReading::detected(1, s(Emotion::Sad, 0.7)))
            .await
            .unwrap();
        drop(tx);

        let outcome = collect_scan(&mut rx, ScanWindow::default()).await;
        assert_eq!(outcome.frames, 2);
        assert_eq!(outcome.samples, 1);
        assert!(outcome.truncated);
        assert_eq!(outcome.decision.emotion, Emotion::Sad);
    }

    #[tokio::test]
    async fn collect_scan_with_closed_source_falls_back() {
        let (tx, mut rx) = mpsc::channel::<FrameReading>(1);
        drop(tx);
        let outcome = collect_scan(&mut rx, ScanWindow::default()).await;
        assert_eq!(outcome.decision, Decision::fallback());
        assert_eq!(outcome.frames, 0);
        assert!(outcome.truncated);
    }
}
