use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::Behavior;
use crate::detection::TimedDetection;
use crate::history::BehaviorHistory;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Entries younger than this take part in the vote.
    pub recent_window_ms: i64,
    /// Sleeping must outweigh idle by this factor to skip the entry count check.
    pub hysteresis_ratio: f32,
    pub min_sleeping_entries: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            recent_window_ms: 5_000,
            hysteresis_ratio: 1.5,
            min_sleeping_entries: 2,
        }
    }
}

/// Per-label weight totals of one vote, indexed by `Behavior::index`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Votes([f32; 5]);

impl Votes {
    #[inline]
    pub fn get(&self, behavior: Behavior) -> f32 {
        self.0[behavior.index()]
    }

    #[inline]
    fn add(&mut self, behavior: Behavior, weight: f32) {
        self.0[behavior.index()] += weight;
    }

    /// Strictly greatest total, earlier label on ties. All-zero votes
    /// elect nobody.
    pub fn winner(&self) -> Option<Behavior> {
        let mut best = None;
        let mut max = 0.0;

        for behavior in Behavior::ALL {
            let weight = self.get(behavior);
            if weight > max {
                max = weight;
                best = Some(behavior);
            }
        }

        best
    }
}

/// Confidence and recency weighted vote over the recent window, with a
/// hysteresis rule on the idle to sleeping boundary.
#[derive(Debug, Clone, Default)]
pub struct TemporalFilter {
    config: FilterConfig,
}

impl TemporalFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn filter(&self, history: &BehaviorHistory, now_ms: i64) -> Behavior {
        let last = match history.last() {
            Some(last) => last,
            None => return Behavior::Inactive,
        };

        let recent: Vec<&TimedDetection> = history
            .iter()
            .filter(|e| now_ms.saturating_sub(e.timestamp_ms) < self.config.recent_window_ms)
            .collect();

        if recent.is_empty() {
            debug!(stale = %last.behavior(), "no recent entries");
            return last.behavior();
        }

        let votes = vote(&recent);
        let winner = votes.winner().unwrap_or(Behavior::Inactive);

        if winner == Behavior::Sleeping && self.holds_idle(&recent, &votes) {
            debug!(?votes, "sleeping not sustained, staying idle");
            return Behavior::Idle;
        }

        debug!(%winner, ?votes, "filtered");

        winner
    }

    fn holds_idle(&self, recent: &[&TimedDetection], votes: &Votes) -> bool {
        let sleeping = votes.get(Behavior::Sleeping);
        let idle = votes.get(Behavior::Idle);

        if sleeping >= self.config.hysteresis_ratio * idle {
            return false;
        }

        let count = |b: Behavior| recent.iter().filter(|e| e.behavior() == b).count();

        count(Behavior::Sleeping) < self.config.min_sleeping_entries && count(Behavior::Idle) >= 1
    }
}

/// Entry `i` of `n` (oldest first) votes with `confidence * (i + 1) / n`.
pub fn vote(recent: &[&TimedDetection]) -> Votes {
    let n = recent.len() as f32;
    let mut votes = Votes::default();

    for (i, entry) in recent.iter().enumerate() {
        let recency = (i + 1) as f32 / n;
        votes.add(entry.behavior(), entry.confidence() * recency);
    }

    votes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;

    const T: i64 = 100_000;

    fn history(entries: &[(i64, Behavior, f32)]) -> BehaviorHistory {
        let mut history = BehaviorHistory::new(10);
        for &(ts, behavior, confidence) in entries {
            let det = Detection::new(behavior, confidence).unwrap();
            history.push(TimedDetection::new(ts, det)).unwrap();
        }
        history
    }

    #[test]
    fn empty_history_is_inactive() {
        let filter = TemporalFilter::default();
        assert_eq!(filter.filter(&BehaviorHistory::default(), T), Behavior::Inactive);
    }

    #[test]
    fn stale_history_falls_back_to_last_label() {
        let filter = TemporalFilter::default();
        let h = history(&[(T - 10_000, Behavior::Moving, 0.8)]);

        assert_eq!(filter.filter(&h, T), Behavior::Moving);
    }

    #[test]
    fn filtering_is_idempotent() {
        let filter = TemporalFilter::default();
        let h = history(&[
            (T - 3_000, Behavior::Working, 0.6),
            (T - 2_000, Behavior::Moving, 0.8),
            (T - 1_000, Behavior::Working, 0.6),
        ]);

        let first = filter.filter(&h, T);
        assert_eq!(first, filter.filter(&h, T));
        assert_eq!(first, Behavior::Working);
    }

    #[test]
    fn single_sleeping_after_idle_stays_idle() {
        let filter = TemporalFilter::default();
        let h = history(&[
            (T - 4_000, Behavior::Idle, 0.7),
            (T - 3_000, Behavior::Idle, 0.7),
            (T - 2_000, Behavior::Idle, 0.7),
            (T - 1_000, Behavior::Sleeping, 0.85),
        ]);

        assert_eq!(filter.filter(&h, T), Behavior::Idle);
    }

    #[test]
    fn weak_sleeping_win_is_overridden() {
        let filter = TemporalFilter::default();
        let h = history(&[
            (T - 3_000, Behavior::Working, 0.1),
            (T - 2_000, Behavior::Idle, 1.0),
            (T - 1_000, Behavior::Sleeping, 0.9),
        ]);

        let recent: Vec<_> = h.iter().collect();
        let votes = vote(&recent);
        assert_eq!(votes.winner(), Some(Behavior::Sleeping));

        assert_eq!(filter.filter(&h, T), Behavior::Idle);
    }

    #[test]
    fn sustained_sleeping_escalates() {
        let filter = TemporalFilter::default();
        let h = history(&[
            (T - 4_000, Behavior::Idle, 0.7),
            (T - 3_000, Behavior::Idle, 0.7),
            (T - 2_000, Behavior::Idle, 0.7),
            (T - 1_000, Behavior::Sleeping, 0.85),
            (T - 500, Behavior::Sleeping, 0.85),
        ]);

        assert_eq!(filter.filter(&h, T), Behavior::Sleeping);
    }

    #[test]
    fn lone_sleeping_without_idle_is_kept() {
        let filter = TemporalFilter::default();
        let h = history(&[(T - 1_000, Behavior::Sleeping, 0.85)]);

        assert_eq!(filter.filter(&h, T), Behavior::Sleeping);
    }

    #[test]
    fn old_entries_are_left_out_of_the_vote() {
        let filter = TemporalFilter::default();
        let h = history(&[
            (T - 9_000, Behavior::Moving, 1.0),
            (T - 8_000, Behavior::Moving, 1.0),
            (T - 5_000, Behavior::Moving, 1.0),
            (T - 1_000, Behavior::Working, 0.6),
        ]);

        assert_eq!(filter.filter(&h, T), Behavior::Working);
    }

    #[test]
    fn ties_go_to_the_earlier_label() {
        let votes = Votes([0.0, 0.5, 0.0, 0.5, 0.0]);
        assert_eq!(votes.winner(), Some(Behavior::Idle));

        assert_eq!(Votes::default().winner(), None);
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let filter = TemporalFilter::default();

        let ancient = history(&[(i64::MIN, Behavior::Idle, 0.7)]);
        assert_eq!(filter.filter(&ancient, 1), Behavior::Idle);

        let future = history(&[(i64::MAX, Behavior::Moving, 0.8)]);
        assert_eq!(filter.filter(&future, i64::MIN), Behavior::Moving);
    }

    #[test]
    fn zero_confidence_window_is_inactive() {
        let filter = TemporalFilter::default();
        let h = history(&[(T - 1_000, Behavior::Working, 0.0)]);

        assert_eq!(filter.filter(&h, T), Behavior::Inactive);
    }
}
