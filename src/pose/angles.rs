//! Joint angle calculation from three landmarks.
//!
//! The angle at the vertex is the difference of the two segment headings
//! (vertex→proximal and vertex→distal), folded into 0-180°.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::landmarks::{LandmarkFrame, LandmarkIndex};

/// Segments shorter than this (normalized units) carry no direction.
const MIN_SEGMENT_LENGTH: f32 = 1e-4;

/// A measured joint angle in degrees, always within 0-180.
///
/// There is no sentinel value: an unreliable measurement is `None` at the
/// call site, so 0° always means a fully folded joint.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointAngle(f32);

impl JointAngle {
    /// Clamp into the valid range. Non-finite input yields `None`.
    pub fn from_degrees(degrees: f32) -> Option<Self> {
        degrees
            .is_finite()
            .then(|| Self(degrees.clamp(0.0, 180.0)))
    }

    pub fn degrees(self) -> f32 {
        self.0
    }
}

impl fmt::Display for JointAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

/// Proximal, vertex and distal landmark of one joint, e.g. shoulder-elbow-wrist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointTriple {
    pub proximal: LandmarkIndex,
    pub vertex: LandmarkIndex,
    pub distal: LandmarkIndex,
}

impl JointTriple {
    pub const fn new(proximal: LandmarkIndex, vertex: LandmarkIndex, distal: LandmarkIndex) -> Self {
        Self {
            proximal,
            vertex,
            distal,
        }
    }

    pub fn indices(&self) -> [LandmarkIndex; 3] {
        [self.proximal, self.vertex, self.distal]
    }
}

/// Angle at `vertex` in degrees.
///
/// Returns `None` for non-finite coordinates or a zero-length segment.
pub fn calculate_angle(
    proximal: (f32, f32),
    vertex: (f32, f32),
    distal: (f32, f32),
) -> Option<JointAngle> {
    let upper = (proximal.0 - vertex.0, proximal.1 - vertex.1);
    let lower = (distal.0 - vertex.0, distal.1 - vertex.1);

    let upper_len = (upper.0 * upper.0 + upper.1 * upper.1).sqrt();
    let lower_len = (lower.0 * lower.0 + lower.1 * lower.1).sqrt();
    if !(upper_len >= MIN_SEGMENT_LENGTH && lower_len >= MIN_SEGMENT_LENGTH) {
        return None;
    }

    let radians = lower.1.atan2(lower.0) - upper.1.atan2(upper.0);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }

    JointAngle::from_degrees(angle)
}

/// Measure a joint in a frame.
///
/// Missing landmarks or any landmark with visibility below `min_visibility`
/// make the measurement unreliable (`None`), whatever the geometry says.
pub fn measure_joint(
    frame: &LandmarkFrame,
    joint: &JointTriple,
    min_visibility: f32,
) -> Option<JointAngle> {
    let mut points = [(0.0, 0.0); 3];
    for (slot, index) in points.iter_mut().zip(joint.indices()) {
        let landmark = frame.get(index)?;
        if landmark.visibility < min_visibility || !landmark.is_finite() {
            return None;
        }
        *slot = landmark.point();
    }

    calculate_angle(points[0], points[1], points[2])
}

/// Moving-average smoothing over the last `window` reliable angles.
#[derive(Debug, Clone)]
pub struct AngleSmoother {
    window: usize,
    samples: VecDeque<f32>,
}

impl AngleSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    pub fn push(&mut self, angle: JointAngle) -> JointAngle {
        if self.window == 1 {
            return angle;
        }

        self.samples.push_back(angle.degrees());
        if self.samples.len() > self.window {
            self.samples.pop_front();
        }

        let mean = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
        JointAngle::from_degrees(mean).unwrap_or(angle)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
