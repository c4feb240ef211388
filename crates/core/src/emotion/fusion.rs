use crate::emotion::Decision;

/// Voice readings at or below this confidence never influence the result.
pub const VOICE_ACCEPT_THRESHOLD: f32 = 0.5;

/// Combines the facial decision with an optional voice decision.
///
/// A voice reading above [`VOICE_ACCEPT_THRESHOLD`] takes over the label,
/// and the confidence becomes the mean of both confidences. Otherwise the
/// face decision is returned as is.
pub fn fuse(face: Decision, voice: Option<Decision>) -> Decision {
    match voice {
        Some(voice) if voice.confidence > VOICE_ACCEPT_THRESHOLD => Decision::new(
            voice.emotion,
            (face.confidence + voice.confidence) / 2.0,
        ),
        _ => face,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;

    fn d(emotion: Emotion, confidence: f32) -> Decision {
        Decision::new(emotion, confidence)
    }

    #[test]
    fn absent_voice_passes_face_through() {
        let face = d(Emotion::Happy, 0.9);
        assert_eq!(fuse(face, None), face);
    }

    #[test]
    fn weak_voice_is_ignored() {
        let face = d(Emotion::Happy, 0.9);
        assert_eq!(fuse(face, Some(d(Emotion::Sad, 0.4))), face);
    }

    #[test]
    fn voice_exactly_at_threshold_is_ignored() {
        let face = d(Emotion::Happy, 0.9);
        assert_eq!(fuse(face, Some(d(Emotion::Sad, 0.5))), face);
    }

    #[test]
    fn confident_voice_overrides_label_and_averages() {
        let fused = fuse(d(Emotion::Happy, 0.9), Some(d(Emotion::Sad, 0.6)));
        assert_eq!(fused.emotion, Emotion::Sad);
        assert!((fused.confidence - 0.75).abs() < 1e-6);
    }

    // The averaged confidence is reported for a label the face never
    // supported. Kept as is; this test pins the behavior.
    #[test]
    fn override_with_weak_face_still_averages() {
        let fused = fuse(d(Emotion::Neutral, 0.0), Some(d(Emotion::Angry, 0.8)));
        assert_eq!(fused.emotion, Emotion::Angry);
        assert!((fused.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn fusing_a_fused_decision_without_voice_is_a_no_op() {
        let once = fuse(d(Emotion::Happy, 0.9), Some(d(Emotion::Sad, 0.6)));
        let twice = fuse(once, None);
        assert_eq!(once, twice);
    }
}
