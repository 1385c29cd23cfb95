//! Progress reporting for long publishes.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Started,
    Finished,
}
impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Started => "STARTED",
            Self::Finished => "FINISHED",
        })
    }
}

/// Receives progress updates. Fire-and-forget: implementations must not
/// block and cannot fail the publish.
pub trait ProgressSink: Send + Sync {
    fn update(&self, state: PublishState, percent: f64);
}

/// Maps per-node progress into a sub-range of the overall scale.
///
/// Updates are only forwarded when progress crosses a new whole percent, so
/// a tree with tens of thousands of nodes produces at most ~100 updates.
pub struct ProgressTracker<'a> {
    sink: Option<&'a dyn ProgressSink>,
    start: f64,
    end: f64,
    per_node: f64,
    current: f64,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: Option<&'a dyn ProgressSink>, start: f64, end: f64, total_nodes: u64) -> Self {
        let per_node = (end - start) / total_nodes.max(1) as f64;
        Self { sink, start, end, per_node, current: 0.0 }
    }

    /// Report an absolute percentage outside of the node loop.
    pub fn report(&self, percent: f64) {
        if let Some(sink) = self.sink {
            sink.update(PublishState::Started, percent);
        }
    }

    /// Count one visited node.
    pub fn advance(&mut self) {
        let next = self.current + self.per_node;
        if next > self.current.ceil() {
            self.report((self.start + next).min(self.end));
        }
        self.current = next;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct Recorder(pub(crate) Mutex<Vec<(PublishState, f64)>>);
    impl ProgressSink for Recorder {
        fn update(&self, state: PublishState, percent: f64) {
            self.0.lock().unwrap().push((state, percent));
        }
    }

    #[test]
    fn test_updates_are_throttled_and_bounded() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(Some(&recorder), 10.0, 90.0, 10_000);
        for _ in 0..10_000 {
            tracker.advance();
        }
        let updates = recorder.0.lock().unwrap();
        assert!(updates.len() <= 81, "{} updates", updates.len());
        assert!(updates.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(updates.iter().all(|(_, p)| (10.0..=90.0).contains(p)));
        assert!(updates.last().unwrap().1 >= 89.0);
    }

    #[test]
    fn test_small_trees_report_every_node() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(Some(&recorder), 10.0, 90.0, 4);
        for _ in 0..4 {
            tracker.advance();
        }
        let percents: Vec<f64> = recorder.0.lock().unwrap().iter().map(|(_, p)| *p).collect();
        assert_eq!(percents, [30.0, 50.0, 70.0, 90.0]);
    }

    #[test]
    fn test_without_sink() {
        let mut tracker = ProgressTracker::new(None, 10.0, 90.0, 0);
        tracker.advance();
        tracker.report(100.0);
    }
}
