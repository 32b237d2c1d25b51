//! This crate plugs into `pointer-core` and provides a pinhole camera model with and without
//! lens distortion. It is used to project points in the camera frame (such as a tracked pointer
//! tip) onto the image so that an overlay can be drawn at the right pixel.

mod distortion;

pub use distortion::*;

use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use pointer_core::nalgebra::{Point2, Vector2};
use pointer_core::{CameraModel, CameraPoint, ImagePoint, KeyPoint};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A point in normalized image coordinates. This is a point on the virtual
/// image plane at depth `1.0` in front of the camera, before any lens distortion
/// or intrinsic matrix is applied.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalizedKeyPoint(pub Point2<f64>);

impl NormalizedKeyPoint {
    /// Depth below which a point is considered to be on or behind the camera plane.
    pub const MIN_DEPTH: f64 = 1e-9;

    /// Tries to convert the [`CameraPoint`] into a [`NormalizedKeyPoint`].
    ///
    /// Returns `None` if the point is on or behind the camera plane, since it
    /// cannot appear in the image.
    pub fn from_camera_point(point: CameraPoint) -> Option<Self> {
        let depth = point.depth();
        if !(depth > Self::MIN_DEPTH) {
            return None;
        }
        Some(Self(Point2::new(point.x / depth, point.y / depth)))
    }
}

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    /// Focal lengths `(fx, fy)` in pixels.
    pub fn focals(self, focals: Vector2<f64>) -> Self {
        Self { focals, ..self }
    }

    /// Optical center `(cx, cy)` in pixels.
    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    /// Takes in a point from an image in pixel coordinates and
    /// converts it to a [`NormalizedKeyPoint`].
    pub fn calibrate<P>(&self, point: P) -> NormalizedKeyPoint
    where
        P: ImagePoint,
    {
        let centered = point.image_point() - self.principal_point;
        let y = centered.y / self.focals.y;
        let x = (centered.x - self.skew * y) / self.focals.x;
        NormalizedKeyPoint(Point2::new(x, y))
    }

    /// Converts a [`NormalizedKeyPoint`] back into pixel coordinates.
    pub fn uncalibrate(&self, projection: NormalizedKeyPoint) -> KeyPoint {
        let y = projection.y * self.focals.y;
        let x = projection.x * self.focals.x + self.skew * projection.y;
        KeyPoint(Point2::new(x, y) + self.principal_point.coords)
    }
}

impl CameraModel for CameraIntrinsics {
    fn project(&self, point: CameraPoint) -> Option<KeyPoint> {
        NormalizedKeyPoint::from_camera_point(point).map(|nkp| self.uncalibrate(nkp))
    }
}

/// Intrinsic camera parameters together with a lens distortion model.
///
/// Projection first divides by depth, then distorts the normalized coordinates,
/// then applies the intrinsic matrix. This is the same model OpenCV's `projectPoints`
/// uses with an identity extrinsic transform.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsicsDistortion<D = BrownConrady5> {
    pub simple_intrinsics: CameraIntrinsics,
    pub distortion: D,
}

impl<D> CameraIntrinsicsDistortion<D>
where
    D: DistortionModel,
{
    pub fn new(simple_intrinsics: CameraIntrinsics, distortion: D) -> Self {
        Self {
            simple_intrinsics,
            distortion,
        }
    }

    /// Takes in a point from an image in pixel coordinates and converts it to an
    /// undistorted [`NormalizedKeyPoint`].
    pub fn calibrate<P>(&self, point: P) -> NormalizedKeyPoint
    where
        P: ImagePoint,
    {
        let NormalizedKeyPoint(distorted) = self.simple_intrinsics.calibrate(point);
        NormalizedKeyPoint(self.distortion.undistort(distorted.coords).into())
    }

    /// Distorts an undistorted [`NormalizedKeyPoint`] and converts it to pixel coordinates.
    pub fn uncalibrate(&self, projection: NormalizedKeyPoint) -> KeyPoint {
        let NormalizedKeyPoint(undistorted) = projection;
        let distorted = self.distortion.distort(undistorted.coords);
        self.simple_intrinsics
            .uncalibrate(NormalizedKeyPoint(distorted.into()))
    }
}

impl<D> CameraModel for CameraIntrinsicsDistortion<D>
where
    D: DistortionModel,
{
    fn project(&self, point: CameraPoint) -> Option<KeyPoint> {
        NormalizedKeyPoint::from_camera_point(point).map(|nkp| self.uncalibrate(nkp))
    }
}
