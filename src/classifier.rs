use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::Behavior;
use crate::detection::Detection;
use crate::frame::Landmarks;
use crate::pose::PoseHistory;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Mean eyelid gap, in landmark units, below which the eyes count as closed.
    pub closed_eye_threshold: f32,
    pub min_pose_window: usize,
    pub keypoint_min_score: f32,
    /// Mean keypoint displacement across the pose window, in keypoint units.
    pub movement_threshold: f32,
    pub idle_threshold: f32,

    pub no_face_confidence: f32,
    pub sleeping_confidence: f32,
    pub moving_confidence: f32,
    pub idle_confidence: f32,
    pub working_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            closed_eye_threshold: 0.02,
            min_pose_window: 5,
            keypoint_min_score: 0.5,
            movement_threshold: 5.0,
            idle_threshold: 2.0,
            no_face_confidence: 0.8,
            sleeping_confidence: 0.85,
            moving_confidence: 0.8,
            idle_confidence: 0.7,
            working_confidence: 0.6,
        }
    }
}

/// Single-frame heuristics over face landmarks and the rolling pose window.
#[derive(Debug, Clone, Default)]
pub struct FrameClassifier {
    config: ClassifierConfig,
}

impl FrameClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Records the frame's pose into `poses`, then applies the rules in
    /// priority order: no face, closed eyes, movement, stillness, working.
    pub fn classify(&self, landmarks: &Landmarks, poses: &mut PoseHistory) -> Detection {
        let cfg = &self.config;

        if let Some(pose) = landmarks.pose() {
            poses.push(pose.clone());
        }

        let face = match landmarks.face() {
            Some(face) => face,
            None => {
                debug!("no face in frame");
                return Detection::fixed(Behavior::Inactive, cfg.no_face_confidence);
            }
        };

        if let Some(openness) = face.eye_openness() {
            if openness < cfg.closed_eye_threshold {
                debug!(openness, "eyes closed");
                return Detection::fixed(Behavior::Sleeping, cfg.sleeping_confidence);
            }
        }

        if let Some(displacement) =
            poses.window_displacement(cfg.min_pose_window, cfg.keypoint_min_score)
        {
            if displacement > cfg.movement_threshold {
                debug!(displacement, "subject moving");
                return Detection::fixed(Behavior::Moving, cfg.moving_confidence);
            }

            if displacement < cfg.idle_threshold {
                debug!(displacement, "subject still");
                return Detection::fixed(Behavior::Idle, cfg.idle_confidence);
            }
        }

        Detection::fixed(Behavior::Working, cfg.working_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{Eye, Eyelid, FaceLandmarks};
    use crate::pose::{Keypoint, PoseSnapshot};
    use nalgebra as na;

    fn face_with_gap(gap: f32) -> FaceLandmarks {
        let lid = |y: f32| vec![na::Point2::new(0.3, y), na::Point2::new(0.35, y)];

        FaceLandmarks::bare()
            .with_contour(Eye::Left, Eyelid::Upper, lid(0.0))
            .with_contour(Eye::Left, Eyelid::Lower, lid(gap))
            .with_contour(Eye::Right, Eyelid::Upper, lid(0.0))
            .with_contour(Eye::Right, Eyelid::Lower, lid(gap))
    }

    fn pose_at(x: f32, y: f32) -> PoseSnapshot {
        PoseSnapshot::new(vec![
            Keypoint::scored(x, y, 0.9),
            Keypoint::scored(x + 10.0, y, 0.9),
        ])
    }

    fn landmarks(face: Option<FaceLandmarks>, pose: Option<PoseSnapshot>) -> Landmarks {
        Landmarks {
            faces: face.into_iter().collect(),
            poses: pose.into_iter().collect(),
        }
    }

    /// Fills the history so that the next `pose_at(dx, dy)` frame closes a
    /// window of exactly `len` snapshots starting at the origin.
    fn primed_history(len: usize) -> PoseHistory {
        let mut poses = PoseHistory::new(10);
        for _ in 0..len - 1 {
            poses.push(pose_at(0.0, 0.0));
        }
        poses
    }

    #[test]
    fn no_face_is_inactive() {
        let classifier = FrameClassifier::default();
        let mut poses = PoseHistory::new(10);

        let det = classifier.classify(&landmarks(None, Some(pose_at(0.0, 0.0))), &mut poses);

        assert_eq!(det.behavior, Behavior::Inactive);
        assert_eq!(det.confidence(), 0.8);
        assert_eq!(poses.len(), 1);
    }

    #[test]
    fn closed_eyes_threshold_is_strict() {
        let classifier = FrameClassifier::default();
        let mut poses = PoseHistory::new(10);

        let det = classifier.classify(&landmarks(Some(face_with_gap(0.02)), None), &mut poses);
        assert_eq!(det.behavior, Behavior::Working);

        let det = classifier.classify(&landmarks(Some(face_with_gap(0.019)), None), &mut poses);
        assert_eq!(det.behavior, Behavior::Sleeping);
        assert_eq!(det.confidence(), 0.85);
    }

    #[test]
    fn missing_contour_skips_eye_check() {
        let classifier = FrameClassifier::default();
        let mut poses = PoseHistory::new(10);
        let mut face = face_with_gap(0.0);
        face.right_lower = None;

        let det = classifier.classify(&landmarks(Some(face), None), &mut poses);
        assert_eq!(det.behavior, Behavior::Working);
    }

    #[test]
    fn short_window_never_reports_motion_rules() {
        let classifier = FrameClassifier::default();
        let face = face_with_gap(0.1);

        let mut poses = PoseHistory::new(10);
        for i in 0..4 {
            let x = i as f32 * 100.0;
            let frame = landmarks(Some(face.clone()), Some(pose_at(x, 0.0)));
            let det = classifier.classify(&frame, &mut poses);
            assert_eq!(det.behavior, Behavior::Working);
        }

        let mut still = PoseHistory::new(10);
        for _ in 0..4 {
            let frame = landmarks(Some(face.clone()), Some(pose_at(0.0, 0.0)));
            let det = classifier.classify(&frame, &mut still);
            assert_eq!(det.behavior, Behavior::Working);
        }
    }

    #[test]
    fn movement_threshold_is_strict() {
        let classifier = FrameClassifier::default();
        let face = face_with_gap(0.1);

        let mut poses = primed_history(5);
        let frame = landmarks(Some(face.clone()), Some(pose_at(3.0, 4.0)));
        let det = classifier.classify(&frame, &mut poses);
        assert_eq!(det.behavior, Behavior::Working);

        let mut poses = primed_history(5);
        let frame = landmarks(Some(face), Some(pose_at(5.01, 0.0)));
        let det = classifier.classify(&frame, &mut poses);
        assert_eq!(det.behavior, Behavior::Moving);
        assert_eq!(det.confidence(), 0.8);
    }

    #[test]
    fn still_pose_is_idle() {
        let classifier = FrameClassifier::default();
        let mut poses = primed_history(5);

        let det = classifier.classify(
            &landmarks(Some(face_with_gap(0.1)), Some(pose_at(1.0, 0.0))),
            &mut poses,
        );

        assert_eq!(det.behavior, Behavior::Idle);
        assert_eq!(det.confidence(), 0.7);
    }

    #[test]
    fn low_confidence_keypoints_fall_through_to_working() {
        let classifier = FrameClassifier::default();
        let mut poses = PoseHistory::new(10);
        let faint = || PoseSnapshot::new(vec![Keypoint::scored(0.0, 0.0, 0.3)]);
        for _ in 0..5 {
            poses.push(faint());
        }

        let frame = landmarks(Some(face_with_gap(0.1)), Some(faint()));
        let det = classifier.classify(&frame, &mut poses);
        assert_eq!(det.behavior, Behavior::Working);
        assert_eq!(det.confidence(), 0.6);
    }

    #[test]
    fn only_first_face_is_used() {
        let classifier = FrameClassifier::default();
        let mut poses = PoseHistory::new(10);
        let frame = Landmarks {
            faces: vec![face_with_gap(0.0), face_with_gap(0.1)],
            poses: Vec::new(),
        };

        assert_eq!(classifier.classify(&frame, &mut poses).behavior, Behavior::Sleeping);
    }
}
