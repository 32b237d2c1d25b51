use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A 3d point relative to the camera's optical center and orientation where
/// the positive X axis is right, positive Y axis is down, and positive Z axis is forwards
/// from the optical center of the camera.
///
/// Marker poses are estimated with the physical marker side length, so the unit of a
/// `CameraPoint` is meters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraPoint(pub Point3<f64>);

impl CameraPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Point3::new(x, y, z))
    }

    /// Euclidean distance to another camera point in meters.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.0 - other.0).norm()
    }

    /// Depth along the optical axis.
    pub fn depth(&self) -> f64 {
        self.0.z
    }
}

/// The fixed vector from the marker origin to the physical pointer tip,
/// expressed in the marker's own frame.
///
/// This is what pivot calibration recovers. Once known, the tip can be located in the
/// camera frame from any single marker pose with [`MarkerPose::transform`](crate::MarkerPose::transform).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PivotOffset(pub Vector3<f64>);

impl PivotOffset {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// Length of the pointer from marker origin to tip.
    pub fn length(&self) -> f64 {
        self.0.norm()
    }
}
