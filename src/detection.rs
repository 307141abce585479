use serde_derive::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::error::Error;

/// Single-shot behavior guess for one sampling tick.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(try_from = "RawDetection")]
pub struct Detection {
    pub behavior: Behavior,
    #[serde(rename = "p")]
    confidence: f32,
}

impl Detection {
    /// Rejects NaN and confidences outside `[0, 1]`.
    pub fn new(behavior: Behavior, confidence: f32) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidConfidence(confidence));
        }

        Ok(Self {
            behavior,
            confidence,
        })
    }

    /// Used when neither the local classifier nor the fallback produced anything.
    #[inline]
    pub fn unresolved() -> Self {
        Self {
            behavior: Behavior::Inactive,
            confidence: 0.0,
        }
    }

    /// For confidences already checked by `Settings::validate`.
    #[inline]
    pub(crate) fn fixed(behavior: Behavior, confidence: f32) -> Self {
        debug_assert!((0.0..=1.0).contains(&confidence), "unchecked confidence {confidence}");

        Self {
            behavior,
            confidence,
        }
    }

    #[inline(always)]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

#[derive(Deserialize)]
struct RawDetection {
    behavior: Behavior,
    p: f32,
}

impl TryFrom<RawDetection> for Detection {
    type Error = Error;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        Detection::new(raw.behavior, raw.p)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TimedDetection {
    #[serde(rename = "ts")]
    pub timestamp_ms: i64,
    #[serde(flatten)]
    pub detection: Detection,
}

impl TimedDetection {
    #[inline]
    pub fn new(timestamp_ms: i64, detection: Detection) -> Self {
        Self {
            timestamp_ms,
            detection,
        }
    }

    /// Validating constructor for data arriving from outside the crate.
    pub fn parse(timestamp_ms: i64, label: &str, confidence: f32) -> Result<Self, Error> {
        let detection = Detection::new(label.parse()?, confidence)?;

        Ok(Self::new(timestamp_ms, detection))
    }

    #[inline(always)]
    pub fn behavior(&self) -> Behavior {
        self.detection.behavior
    }

    #[inline(always)]
    pub fn confidence(&self) -> f32 {
        self.detection.confidence()
    }
}
