mod replay;

use crate::emotion::{Sample, UnknownEmotion};
use serde::Deserialize;
use std::{future::Future, io::BufRead, pin::Pin};

pub use replay::ReplayFrameSource;

/// What the detector reported for one captured frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReading {
    pub index: u64,
    /// `None` when no face was found in the frame.
    pub sample: Option<Sample>,
}

impl FrameReading {
    pub fn detected(index: u64, sample: Sample) -> Self {
        Self {
            index,
            sample: Some(sample),
        }
    }

    pub fn empty(index: u64) -> Self {
        Self {
            index,
            sample: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed frame record: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: {source}")]
    UnknownLabel {
        line: usize,
        #[source]
        source: UnknownEmotion,
    },
}

/// Produces frame readings until the window is full or capture fails.
///
/// Implementations stop quietly when the receiver is dropped.
pub trait FrameSource: Send + Sync {
    fn start(
        &self,
        tx: tokio::sync::mpsc::Sender<FrameReading>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CaptureError>> + Send + 'static>>;
}

#[derive(Deserialize)]
struct FrameRecord {
    label: String,
    score: f32,
}

/// Parses detector output, one JSON value per line.
///
/// Each line is either `{"label": "...", "score": ...}` or `null` for a frame
/// without a face. Blank lines are skipped.
pub fn read_frames_jsonl(reader: impl BufRead) -> Result<Vec<Option<Sample>>, CaptureError> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: Option<FrameRecord> =
            serde_json::from_str(trimmed).map_err(|source| CaptureError::Malformed {
                line: i + 1,
                source,
            })?;
        let sample = match record {
            Some(r) => {
                let label = r
                    .label
                    .parse()
                    .map_err(|source| CaptureError::UnknownLabel { line: i + 1, source })?;
                Some(Sample::new(label, r.score))
            }
            None => None,
        };
        frames.push(sample);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;
    use std::io::Cursor;

    #[test]
    fn parses_samples_and_faceless_frames() {
        let input = "{\"label\":\"happy\",\"score\":0.8}\nnull\n\n{\"label\":\"Surprised\",\"score\":0.3}\n";
        let frames = read_frames_jsonl(Cursor::new(input)).expect("parses");
        assert_eq!(
            frames,
            vec![
                Some(Sample::new(Emotion::Happy, 0.8)),
                None,
                Some(Sample::new(Emotion::Surprise, 0.3)),
            ]
        );
    }

    #[test]
    fn reports_line_of_malformed_record() {
        let input = "null\n{\"label\":\"happy\"}\n";
        match read_frames_jsonl(Cursor::new(input)) {
            Err(CaptureError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_labels() {
        let input = "{\"label\":\"bored\",\"score\":0.5}\n";
        assert!(matches!(
            read_frames_jsonl(Cursor::new(input)),
            Err(CaptureError::UnknownLabel { line: 1, .. })
        ));
    }
}
