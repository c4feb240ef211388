use crate::capture::{CaptureError, FrameReading, FrameSource};
use crate::emotion::Sample;
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

const LOG_TARGET: &str = "capture::replay";

/// Replays previously recorded detector output at a fixed frame pace.
#[derive(Clone)]
pub struct ReplayFrameSource {
    frames: Arc<Vec<Option<Sample>>>,
    interval: Duration,
}

impl ReplayFrameSource {
    pub fn new(frames: Vec<Option<Sample>>, interval: Duration) -> Self {
        Self {
            frames: Arc::new(frames),
            interval,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplayFrameSource {
    fn start(
        &self,
        tx: tokio::sync::mpsc::Sender<FrameReading>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CaptureError>> + Send + 'static>> {
        let frames = Arc::clone(&self.frames);
        let interval = self.interval;
        Box::pin(async move {
            for (index, sample) in frames.iter().enumerate() {
                let reading = FrameReading {
                    index: index as u64,
                    sample: *sample,
                };
                if tx.send(reading).await.is_err() {
                    tracing::debug!(target: LOG_TARGET, index, "scan closed, stopping replay");
                    return Ok(());
                }
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
            }
            tracing::debug!(target: LOG_TARGET, frames = frames.len(), "replay exhausted");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;

    #[tokio::test]
    async fn replays_frames_in_order_then_closes() {
        let source = ReplayFrameSource::new(
            vec![Some(Sample::new(Emotion::Sad, 0.4)), None],
            Duration::ZERO,
        );
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        source.start(tx).await.expect("replay");

        let first = rx.recv().await.expect("first");
        assert_eq!(first.index, 0);
        assert_eq!(first.sample, Some(Sample::new(Emotion::Sad, 0.4)));
        assert_eq!(rx.recv().await, Some(FrameReading::empty(1)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn stops_when_receiver_dropped() {
        let source = ReplayFrameSource::new(vec![None; 10], Duration::ZERO);
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        assert!(source.start(tx).await.is_ok());
    }
}
