use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::behavior::Behavior;
use crate::config::Settings;
use crate::detection::{Detection, TimedDetection};
use crate::error::Error;
use crate::fallback::FallbackDetector;
use crate::frame::{Frame, Landmarks};
use crate::history::{BehaviorHistory, DEFAULT_BEHAVIOR_CAPACITY};
use crate::pose::{PoseHistory, DEFAULT_POSE_CAPACITY};
use crate::{Classifying, Pipeline};

/// Local face/pose landmark model.
#[async_trait]
pub trait LocalModel: Send + Sync {
    fn is_ready(&self) -> bool {
        true
    }

    async fn detect(&self, frame: &Frame) -> Result<Landmarks, Error>;
}

/// Receives every resolved status, for persistence or broadcast.
pub trait HistorySink: Send + Sync {
    fn record(&self, subject: &str, status: Behavior, timestamp_ms: i64);
}

pub struct NullSink;

impl HistorySink for NullSink {
    #[inline]
    fn record(&self, _subject: &str, _status: Behavior, _timestamp_ms: i64) {}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub pose_capacity: usize,
    pub behavior_capacity: usize,
    /// Local detections below this confidence are double-checked by the fallback.
    pub fallback_threshold: f32,
    pub fallback_confidence: f32,
    pub fallback_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pose_capacity: DEFAULT_POSE_CAPACITY,
            behavior_capacity: DEFAULT_BEHAVIOR_CAPACITY,
            fallback_threshold: 0.7,
            fallback_confidence: 0.8,
            fallback_timeout_ms: 3_000,
        }
    }
}

/// True when the local result is missing or not confident enough to stand alone.
#[inline]
pub fn needs_fallback(local: Option<&Detection>, threshold: f32) -> bool {
    local.map_or(true, |det| det.confidence() < threshold)
}

#[derive(Debug)]
struct Session {
    poses: PoseHistory,
    behaviors: BehaviorHistory,
}

struct SessionSlot {
    closed: AtomicBool,
    state: tokio::sync::Mutex<Session>,
}

impl SessionSlot {
    fn new(config: &MonitorConfig) -> Self {
        Self {
            closed: AtomicBool::new(false),
            state: tokio::sync::Mutex::new(Session {
                poses: PoseHistory::new(config.pose_capacity),
                behaviors: BehaviorHistory::new(config.behavior_capacity),
            }),
        }
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Per-subject detection pipeline: local classification, optional fallback,
/// bounded history and temporal filtering.
pub struct BehaviorMonitor {
    pipeline: Pipeline,
    config: MonitorConfig,
    model: Option<Arc<dyn LocalModel>>,
    fallback: Option<Arc<dyn FallbackDetector>>,
    sink: Arc<dyn HistorySink>,
    sessions: Mutex<HashMap<String, Arc<SessionSlot>>>,
}

impl BehaviorMonitor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            pipeline: Pipeline::new(settings),
            config: settings.monitor.clone(),
            model: None,
            fallback: None,
            sink: Arc::new(NullSink),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn LocalModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackDetector>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Opens a session with empty histories; returns false if one is already open.
    pub fn start_session(&self, subject: &str) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(subject) {
            return false;
        }

        sessions.insert(subject.to_string(), Arc::new(SessionSlot::new(&self.config)));
        info!(subject, "session started");

        true
    }

    /// Disposes of the subject's histories. A tick still in flight for the
    /// session is discarded when it completes.
    pub fn end_session(&self, subject: &str) -> bool {
        match self.sessions.lock().remove(subject) {
            Some(slot) => {
                slot.closed.store(true, Ordering::Release);
                info!(subject, "session ended");
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_active(&self, subject: &str) -> bool {
        self.sessions.lock().contains_key(subject)
    }

    #[inline]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Copy of the subject's behavior history, oldest first.
    pub async fn history(&self, subject: &str) -> Option<Vec<TimedDetection>> {
        let slot = self.sessions.lock().get(subject).cloned()?;
        let session = slot.state.lock().await;

        Some(session.behaviors.iter().copied().collect())
    }

    /// Filtered status over the recorded history, without sampling.
    pub async fn current_status(&self, subject: &str, now_ms: i64) -> Behavior {
        let slot = match self.sessions.lock().get(subject).cloned() {
            Some(slot) => slot,
            None => return Behavior::Inactive,
        };
        let session = slot.state.lock().await;

        self.pipeline.filter_history(&session.behaviors, now_ms)
    }

    /// Runs one sampling tick for `subject`. The frame timestamp is the
    /// filter's reference time. A frame older than the newest recorded entry
    /// is neither classified nor recorded; the current status is returned.
    pub async fn resolve_status(&self, subject: &str, frame: Frame) -> Result<Behavior, Error> {
        let slot = self.session(subject);
        let mut session = slot.state.lock().await;

        if let Some(last) = session.behaviors.last() {
            if frame.timestamp_ms < last.timestamp_ms {
                let err = Error::OutOfOrder {
                    last: last.timestamp_ms,
                    got: frame.timestamp_ms,
                };
                warn!(subject, %err, "frame skipped");

                return Ok(self
                    .pipeline
                    .filter_history(&session.behaviors, frame.timestamp_ms));
            }
        }

        let local = self.classify_local(subject, &frame, &mut session.poses).await;
        let detection = self.resolve_detection(subject, &frame, local).await;

        if slot.is_closed() {
            warn!(subject, "session closed during tick, discarding result");
            return Err(Error::SessionClosed(subject.to_string()));
        }

        let entry = TimedDetection::new(frame.timestamp_ms, detection);
        if let Err(err) = session.behaviors.push(entry) {
            warn!(subject, %err, "detection not recorded");
        }

        let status = self
            .pipeline
            .filter_history(&session.behaviors, frame.timestamp_ms);
        debug!(subject, %status, "resolved");
        self.sink.record(subject, status, frame.timestamp_ms);

        Ok(status)
    }

    fn session(&self, subject: &str) -> Arc<SessionSlot> {
        let mut sessions = self.sessions.lock();
        if let Some(slot) = sessions.get(subject) {
            return slot.clone();
        }

        let slot = Arc::new(SessionSlot::new(&self.config));
        sessions.insert(subject.to_string(), slot.clone());
        info!(subject, "session started");

        slot
    }

    async fn classify_local(
        &self,
        subject: &str,
        frame: &Frame,
        poses: &mut PoseHistory,
    ) -> Option<Detection> {
        let model = self.model.as_ref()?;

        if !model.is_ready() {
            debug!(subject, "{}", Error::ModelUnavailable);
            return None;
        }

        let landmarks = match model.detect(frame).await {
            Ok(landmarks) => Some(landmarks),
            Err(err) => {
                warn!(subject, %err, "local classification failed");
                None
            }
        };

        self.pipeline.classify_frame(landmarks.as_ref(), poses)
    }

    async fn resolve_detection(
        &self,
        subject: &str,
        frame: &Frame,
        local: Option<Detection>,
    ) -> Detection {
        if !needs_fallback(local.as_ref(), self.config.fallback_threshold) {
            return local.unwrap_or_else(Detection::unresolved);
        }

        match self.ask_fallback(subject, frame).await {
            Ok(behavior) => Detection::fixed(behavior, self.config.fallback_confidence),
            Err(err) => {
                warn!(subject, %err, "fallback failed, keeping local result");
                local.unwrap_or_else(Detection::unresolved)
            }
        }
    }

    async fn ask_fallback(&self, subject: &str, frame: &Frame) -> Result<Behavior, Error> {
        let fallback = self
            .fallback
            .as_ref()
            .ok_or_else(|| Error::Fallback("no fallback detector configured".to_string()))?;

        let limit = Duration::from_millis(self.config.fallback_timeout_ms);

        tokio::time::timeout(limit, fallback.detect(&frame.image, subject))
            .await
            .map_err(|_| Error::FallbackTimeout(limit))?
    }
}

#[async_trait]
impl crate::Monitoring for BehaviorMonitor {
    async fn resolve_status(&self, subject: &str, frame: Frame) -> Result<Behavior, Error> {
        BehaviorMonitor::resolve_status(self, subject, frame).await
    }

    #[inline]
    fn end_session(&self, subject: &str) -> bool {
        BehaviorMonitor::end_session(self, subject)
    }
}
