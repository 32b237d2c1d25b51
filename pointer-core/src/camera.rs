use crate::{CameraPoint, KeyPoint};

/// Projects points in the camera frame onto the image.
pub trait CameraModel {
    /// Extracts the pixel location in the image of a point in the camera frame.
    ///
    /// The point's X axis points right, Y axis points down, and Z axis points forwards.
    /// The image point uses the same coordiate frame. Its Y is down and its X is right.
    ///
    /// Since this might not be possible (if the point is behind the camera for a pinhole camera),
    /// this operation is fallible.
    fn project(&self, point: CameraPoint) -> Option<KeyPoint>;
}
