pub mod behavior;
pub mod classifier;
pub mod config;
pub mod detection;
pub mod error;
pub mod face;
pub mod fallback;
pub mod filter;
pub mod frame;
pub mod history;
pub mod monitor;
pub mod pose;
pub mod scheduler;

mod circular_queue;

pub use behavior::Behavior;
pub use classifier::FrameClassifier;
pub use config::Settings;
pub use detection::{Detection, TimedDetection};
pub use filter::TemporalFilter;
pub use frame::{Frame, Landmarks};
pub use history::BehaviorHistory;
pub use monitor::BehaviorMonitor;
pub use pose::PoseHistory;

use async_trait::async_trait;
use error::Error;

pub trait Classifying {
    /// `None` landmarks mean the local model produced nothing for this frame.
    fn classify_frame(
        &self,
        landmarks: Option<&Landmarks>,
        poses: &mut PoseHistory,
    ) -> Option<Detection>;
    fn filter_history(&self, history: &BehaviorHistory, now_ms: i64) -> Behavior;
}

/// Per-subject status resolution, one call per sampling tick.
#[async_trait]
pub trait Monitoring: Send + Sync {
    async fn resolve_status(&self, subject: &str, frame: Frame) -> Result<Behavior, Error>;
    fn end_session(&self, subject: &str) -> bool;
}

/// Classifier and filter pair, for callers that manage histories themselves.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    classifier: FrameClassifier,
    filter: TemporalFilter,
}

impl Pipeline {
    pub fn new(settings: &Settings) -> Self {
        Self {
            classifier: FrameClassifier::new(settings.classifier.clone()),
            filter: TemporalFilter::new(settings.filter.clone()),
        }
    }
}

impl crate::Classifying for Pipeline {
    #[inline]
    fn classify_frame(
        &self,
        landmarks: Option<&Landmarks>,
        poses: &mut PoseHistory,
    ) -> Option<Detection> {
        Some(self.classifier.classify(landmarks?, poses))
    }

    #[inline]
    fn filter_history(&self, history: &BehaviorHistory, now_ms: i64) -> Behavior {
        self.filter.filter(history, now_ms)
    }
}
