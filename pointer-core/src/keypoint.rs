use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Allows the retrieval of the point on the image.
pub trait ImagePoint {
    /// Retrieves the point on the image
    fn image_point(&self) -> Point2<f64>;
}

/// A point on an image frame in pixel coordinates.
/// This means the keypoint is neither undistorted nor normalized.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyPoint(pub Point2<f64>);

impl KeyPoint {
    /// Rounds the keypoint to the nearest pixel, as an overlay renderer would draw it.
    pub fn pixel(&self) -> (i64, i64) {
        (self.0.x.round() as i64, self.0.y.round() as i64)
    }
}

impl ImagePoint for KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_rounds_to_nearest() {
        assert_eq!(KeyPoint(Point2::new(317.5, 244.49)).pixel(), (318, 244));
        assert_eq!(KeyPoint(Point2::new(-0.6, 0.4)).pixel(), (-1, 0));
    }
}
