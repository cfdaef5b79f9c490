//! Landmark frames as delivered by the external pose detector.
//!
//! Coordinates are normalized image space (0-1). Indices follow the
//! MediaPipe Pose numbering (33 body landmarks).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type LandmarkIndex = u32;

// ============================================================================
// LANDMARK INDICES (MediaPipe Pose - 33 total)
// ============================================================================

pub const NOSE: LandmarkIndex = 0;
pub const LEFT_EAR: LandmarkIndex = 7;
pub const RIGHT_EAR: LandmarkIndex = 8;
pub const LEFT_SHOULDER: LandmarkIndex = 11;
pub const RIGHT_SHOULDER: LandmarkIndex = 12;
pub const LEFT_ELBOW: LandmarkIndex = 13;
pub const RIGHT_ELBOW: LandmarkIndex = 14;
pub const LEFT_WRIST: LandmarkIndex = 15;
pub const RIGHT_WRIST: LandmarkIndex = 16;
pub const LEFT_HIP: LandmarkIndex = 23;
pub const RIGHT_HIP: LandmarkIndex = 24;
pub const LEFT_KNEE: LandmarkIndex = 25;
pub const RIGHT_KNEE: LandmarkIndex = 26;
pub const LEFT_ANKLE: LandmarkIndex = 27;
pub const RIGHT_ANKLE: LandmarkIndex = 28;

pub const POSE_LANDMARK_COUNT: usize = 33;

/// Values per landmark in the flat detector layout: x, y, z, visibility.
const FLAT_STRIDE: usize = 4;

/// Human-readable name for coaching instructions.
pub fn landmark_name(index: LandmarkIndex) -> &'static str {
    match index {
        0 => "nose",
        1..=6 => "eye",
        7 => "left ear",
        8 => "right ear",
        9 | 10 => "mouth",
        11 => "left shoulder",
        12 => "right shoulder",
        13 => "left elbow",
        14 => "right elbow",
        15 => "left wrist",
        16 => "right wrist",
        17 | 19 | 21 => "left hand",
        18 | 20 | 22 => "right hand",
        23 => "left hip",
        24 => "right hip",
        25 => "left knee",
        26 => "right knee",
        27 => "left ankle",
        28 => "right ankle",
        29 | 31 => "left foot",
        30 | 32 => "right foot",
        _ => "joint",
    }
}

fn full_visibility() -> f32 {
    1.0
}

/// A single tracked keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Detector confidence that the point is visible, 0-1.
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility,
        }
    }

    pub fn point(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One detector result. Only derived metrics outlive the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub landmarks: HashMap<LandmarkIndex, Landmark>,
}

impl LandmarkFrame {
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            landmarks: HashMap::new(),
        }
    }

    pub fn with_landmark(mut self, index: LandmarkIndex, landmark: Landmark) -> Self {
        self.landmarks.insert(index, landmark);
        self
    }

    pub fn insert(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.landmarks.insert(index, landmark);
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// Build a frame from the detector's flat layout of 33 x (x, y, z, visibility).
    ///
    /// Returns `None` when the buffer has the wrong length.
    pub fn from_flat(timestamp_ms: u64, data: &[f32]) -> Option<Self> {
        if data.len() != POSE_LANDMARK_COUNT * FLAT_STRIDE {
            return None;
        }

        let landmarks = data
            .chunks_exact(FLAT_STRIDE)
            .enumerate()
            .map(|(i, values)| {
                (
                    i as LandmarkIndex,
                    Landmark {
                        x: values[0],
                        y: values[1],
                        z: Some(values[2]),
                        visibility: values[3],
                    },
                )
            })
            .collect();

        Some(Self {
            timestamp_ms,
            landmarks,
        })
    }
}
