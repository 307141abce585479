use crate::circular_queue::CircularQueue;
use crate::detection::TimedDetection;
use crate::error::Error;

pub const DEFAULT_BEHAVIOR_CAPACITY: usize = 10;

/// Most recent timestamped detections of one subject, oldest first.
#[derive(Debug, Clone)]
pub struct BehaviorHistory {
    entries: CircularQueue<TimedDetection>,
}

impl BehaviorHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: CircularQueue::with_capacity(capacity),
        }
    }

    /// Appends `entry`, evicting the oldest one when full. Entries must
    /// arrive in timestamp order; equal timestamps are accepted.
    pub fn push(&mut self, entry: TimedDetection) -> Result<Option<TimedDetection>, Error> {
        if let Some(last) = self.entries.newest() {
            if entry.timestamp_ms < last.timestamp_ms {
                return Err(Error::OutOfOrder {
                    last: last.timestamp_ms,
                    got: entry.timestamp_ms,
                });
            }
        }

        Ok(self.entries.push(entry))
    }

    #[inline]
    pub fn last(&self) -> Option<&TimedDetection> {
        self.entries.newest()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Oldest to newest.
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TimedDetection> {
        self.entries.iter()
    }
}

impl Default for BehaviorHistory {
    fn default() -> Self {
        Self::new(DEFAULT_BEHAVIOR_CAPACITY)
    }
}
