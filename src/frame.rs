use crate::face::FaceLandmarks;
use crate::pose::PoseSnapshot;

/// One sampled video frame of a subject.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image, handed to the fallback detector as-is.
    pub image: Vec<u8>,
    pub timestamp_ms: i64,
}

impl Frame {
    pub fn new(image: Vec<u8>, timestamp_ms: i64) -> Self {
        Self {
            image,
            timestamp_ms,
        }
    }
}

/// Output of the local face/pose model for one frame.
#[derive(Debug, Clone, Default)]
pub struct Landmarks {
    pub faces: Vec<FaceLandmarks>,
    pub poses: Vec<PoseSnapshot>,
}

impl Landmarks {
    /// Only the first detection is used; multiple subjects are not disambiguated.
    #[inline]
    pub fn face(&self) -> Option<&FaceLandmarks> {
        self.faces.first()
    }

    #[inline]
    pub fn pose(&self) -> Option<&PoseSnapshot> {
        self.poses.first()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.poses.is_empty()
    }
}
