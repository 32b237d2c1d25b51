use crate::{CameraPoint, PivotOffset, RotationVector};
use nalgebra::{IsometryMatrix3, Rotation3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The pose of a marker relative to the camera, as delivered by the upstream
/// marker pose estimator for the first detected marker of a frame.
///
/// This maps points in the marker frame into [`CameraPoint`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct MarkerPose {
    pub rotation: RotationVector,
    pub translation: Vector3<f64>,
}

impl MarkerPose {
    pub fn new(rotation: RotationVector, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create the pose from a rotation matrix and translation.
    pub fn from_parts(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        Self {
            rotation: rotation.into(),
            translation,
        }
    }

    /// Retrieve the rotation matrix. This is recomputed on every call.
    pub fn rotation_matrix(&self) -> Rotation3<f64> {
        self.rotation.rotation()
    }

    /// Retrieve the isometry.
    pub fn isometry(&self) -> IsometryMatrix3<f64> {
        IsometryMatrix3::from_parts(self.translation.into(), self.rotation_matrix())
    }

    /// Carries a marker-frame offset into the camera frame: `R * offset + t`.
    pub fn transform(&self, offset: PivotOffset) -> CameraPoint {
        CameraPoint((self.rotation_matrix() * offset.0 + self.translation).into())
    }
}

/// A pose admitted into the pivot calibration set.
///
/// The rotation is expanded into a matrix once at admission so that the solver
/// does not need to expand it again.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CalibrationSample {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl CalibrationSample {
    /// Carries a marker-frame offset into the camera frame with this sample's pose.
    pub fn transform(&self, offset: PivotOffset) -> CameraPoint {
        CameraPoint((self.rotation * offset.0 + self.translation).into())
    }
}

impl From<MarkerPose> for CalibrationSample {
    fn from(pose: MarkerPose) -> Self {
        Self {
            rotation: pose.rotation_matrix(),
            translation: pose.translation,
        }
    }
}
