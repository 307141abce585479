//! Fallback detection, used when the local classifier has nothing or is unsure.

use async_trait::async_trait;
use serde_derive::Deserialize;

use crate::behavior::Behavior;
use crate::error::Error;

/// Remote or out-of-process detector. Its answers carry no confidence of
/// their own; the monitor assigns one.
#[async_trait]
pub trait FallbackDetector: Send + Sync {
    async fn detect(&self, image: &[u8], subject: &str) -> Result<Behavior, Error>;
}

/// Reply of a fallback analysis service: `{"status": "<label>"}`, or
/// `{"status": "error", "message": "..."}`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FallbackReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl FallbackReply {
    pub fn parse(json: &str) -> Result<Behavior, Error> {
        let reply: FallbackReply =
            serde_json::from_str(json).map_err(|e| Error::Fallback(e.to_string()))?;

        reply.into_behavior()
    }

    pub fn into_behavior(self) -> Result<Behavior, Error> {
        if self.status == "error" {
            let message = self
                .message
                .unwrap_or_else(|| "unspecified error".to_string());

            return Err(Error::Fallback(message));
        }

        self.status.parse()
    }
}

/// Faces found in an image, and eyes found inside the first face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureCounts {
    pub faces: usize,
    pub eyes: usize,
}

impl FeatureCounts {
    /// No face reads as away from the desk, fewer than two visible eyes as asleep.
    pub fn behavior(&self) -> Behavior {
        if self.faces == 0 {
            Behavior::Idle
        } else if self.eyes < 2 {
            Behavior::Sleeping
        } else {
            Behavior::Working
        }
    }
}

/// Counts faces and eyes in an encoded image (e.g. with cascade classifiers).
#[async_trait]
pub trait FeatureCounter: Send + Sync {
    async fn count(&self, image: &[u8]) -> Result<FeatureCounts, Error>;
}

/// Fallback detector built on plain face/eye counting.
pub struct FeatureFallback<C> {
    counter: C,
}

impl<C: FeatureCounter> FeatureFallback<C> {
    pub fn new(counter: C) -> Self {
        Self { counter }
    }
}

#[async_trait]
impl<C: FeatureCounter> FallbackDetector for FeatureFallback<C> {
    async fn detect(&self, image: &[u8], _subject: &str) -> Result<Behavior, Error> {
        if image.is_empty() {
            return Err(Error::Fallback("no image data provided".to_string()));
        }

        Ok(self.counter.count(image).await?.behavior())
    }
}
