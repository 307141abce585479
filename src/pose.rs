use crate::circular_queue::CircularQueue;
use nalgebra as na;

pub const DEFAULT_POSE_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub pos: na::Point2<f32>,
    pub score: Option<f32>,
}

impl Keypoint {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            pos: na::Point2::new(x, y),
            score: None,
        }
    }

    #[inline]
    pub fn scored(x: f32, y: f32, score: f32) -> Self {
        Self {
            pos: na::Point2::new(x, y),
            score: Some(score),
        }
    }

    /// Unscored keypoints never qualify.
    #[inline(always)]
    pub fn is_confident(&self, min_score: f32) -> bool {
        matches!(self.score, Some(s) if s > min_score)
    }
}

/// Body keypoints of one subject at one instant, in the pose model's index order.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSnapshot {
    keypoints: Vec<Keypoint>,
}

impl PoseSnapshot {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter()
    }

    /// Mean distance travelled by the keypoints that are confident in both
    /// snapshots. `None` when no index qualifies.
    pub fn mean_displacement(&self, later: &PoseSnapshot, min_score: f32) -> Option<f32> {
        let (sum, count) = self
            .iter()
            .zip(later.iter())
            .filter(|(a, b)| a.is_confident(min_score) && b.is_confident(min_score))
            .fold((0.0, 0usize), |(sum, count), (a, b)| {
                (sum + na::distance(&a.pos, &b.pos), count + 1)
            });

        if count == 0 {
            None
        } else {
            Some(sum / count as f32)
        }
    }
}

impl From<Vec<Keypoint>> for PoseSnapshot {
    fn from(keypoints: Vec<Keypoint>) -> Self {
        Self::new(keypoints)
    }
}

/// Rolling window of the most recent pose snapshots of one session.
#[derive(Debug, Clone)]
pub struct PoseHistory {
    snapshots: CircularQueue<PoseSnapshot>,
}

impl PoseHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: CircularQueue::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, snapshot: PoseSnapshot) -> Option<PoseSnapshot> {
        self.snapshots.push(snapshot)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.snapshots.capacity()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PoseSnapshot> {
        self.snapshots.iter()
    }

    /// Oldest to newest displacement over the window, provided the window
    /// holds at least `min_len` snapshots.
    pub fn window_displacement(&self, min_len: usize, min_score: f32) -> Option<f32> {
        if self.len() < min_len.max(2) {
            return None;
        }

        let oldest = self.snapshots.oldest()?;
        let newest = self.snapshots.newest()?;

        oldest.mean_displacement(newest, min_score)
    }
}

impl Default for PoseHistory {
    fn default() -> Self {
        Self::new(DEFAULT_POSE_CAPACITY)
    }
}
