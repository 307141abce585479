use nalgebra as na;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eyelid {
    Upper,
    Lower,
}

/// Eyelid contours of one detected face, in normalized landmark coordinates.
/// A contour is `None` when the face model did not return it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceLandmarks {
    pub left_upper: Option<Vec<na::Point2<f32>>>,
    pub left_lower: Option<Vec<na::Point2<f32>>>,
    pub right_upper: Option<Vec<na::Point2<f32>>>,
    pub right_lower: Option<Vec<na::Point2<f32>>>,
}

impl FaceLandmarks {
    /// A face without eyelid contours.
    pub fn bare() -> Self {
        Self::default()
    }

    pub fn with_contour(mut self, eye: Eye, lid: Eyelid, points: Vec<na::Point2<f32>>) -> Self {
        let slot = match (eye, lid) {
            (Eye::Left, Eyelid::Upper) => &mut self.left_upper,
            (Eye::Left, Eyelid::Lower) => &mut self.left_lower,
            (Eye::Right, Eyelid::Upper) => &mut self.right_upper,
            (Eye::Right, Eyelid::Lower) => &mut self.right_lower,
        };
        *slot = Some(points);
        self
    }

    /// Vertical gap between the mean upper and mean lower eyelid point,
    /// averaged over both eyes. `None` unless all four contours are present.
    pub fn eye_openness(&self) -> Option<f32> {
        let left = openness(self.left_upper.as_deref()?, self.left_lower.as_deref()?)?;
        let right = openness(self.right_upper.as_deref()?, self.right_lower.as_deref()?)?;

        Some((left + right) / 2.0)
    }
}

fn openness(upper: &[na::Point2<f32>], lower: &[na::Point2<f32>]) -> Option<f32> {
    Some((mean_y(lower)? - mean_y(upper)?).abs())
}

fn mean_y(points: &[na::Point2<f32>]) -> Option<f32> {
    if points.is_empty() {
        return None;
    }

    Some(points.iter().map(|p| p.y).sum::<f32>() / points.len() as f32)
}
