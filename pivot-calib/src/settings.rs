use std::time::Duration;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings for the calibration process.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CalibrationSettings {
    /// The number of admitted poses that triggers the pivot solve
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_sample_quota"))]
    pub sample_quota: usize,
    /// The minimum time in seconds between two admitted poses
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_minimum_sample_spacing")
    )]
    pub minimum_sample_spacing: f64,
    /// The minimum L2 change of the rotation vector between two admitted poses
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_minimum_rotation_change")
    )]
    pub minimum_rotation_change: f64,
    /// The time in seconds a marker must stay visible before collection starts automatically
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_auto_start_countdown")
    )]
    pub auto_start_countdown: f64,
    /// The smallest accepted ratio of the smallest to the largest singular value of the pivot system
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_minimum_singular_value_ratio")
    )]
    pub minimum_singular_value_ratio: f64,
    /// Singular values below this are treated as zero in the least squares solve
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_solver_epsilon"))]
    pub solver_epsilon: f64,
}

impl CalibrationSettings {
    pub fn minimum_sample_spacing(&self) -> Duration {
        seconds(self.minimum_sample_spacing)
    }

    pub fn auto_start_countdown(&self) -> Duration {
        seconds(self.auto_start_countdown)
    }
}

/// Negative and NaN settings clamp to zero, infinite ones saturate.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            sample_quota: default_sample_quota(),
            minimum_sample_spacing: default_minimum_sample_spacing(),
            minimum_rotation_change: default_minimum_rotation_change(),
            auto_start_countdown: default_auto_start_countdown(),
            minimum_singular_value_ratio: default_minimum_singular_value_ratio(),
            solver_epsilon: default_solver_epsilon(),
        }
    }
}

fn default_sample_quota() -> usize {
    20
}

fn default_minimum_sample_spacing() -> f64 {
    0.5
}

fn default_minimum_rotation_change() -> f64 {
    0.3
}

fn default_auto_start_countdown() -> f64 {
    3.0
}

fn default_minimum_singular_value_ratio() -> f64 {
    1e-4
}

fn default_solver_epsilon() -> f64 {
    1e-12
}
