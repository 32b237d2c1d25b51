//! # Pointer Core
//!
//! Common types shared by the crates of the pointer workspace: marker poses and their
//! Rodrigues rotation vectors, points in the camera frame, the pivot offset of a pointer tip,
//! image keypoints, and the camera model trait used to project points for overlays.
//!
//! ## Pivot geometry
//!
//! A pointer carries a fiducial marker somewhere along its body. The marker pose estimator
//! reports the marker frame relative to the camera, but what we care about is the tip. The
//! tip sits at a fixed offset `p` in the marker frame, so for every pose `(R, t)`:
//!
//! ```text
//!                 marker
//!                 [###]---.
//!                  /       \  R * p
//!                 /         \
//!       t        /           \
//!   O ----------'             * tip = R * p + t
//!  camera
//! ```
//!
//! Rotating the pointer about its tip while the tip rests on a surface keeps the tip still
//! in the camera frame, which is what pivot calibration exploits to recover `p`.

mod camera;
mod keypoint;
mod point;
mod pose;
mod rotation;

pub use camera::*;
pub use keypoint::*;
pub use nalgebra;
pub use point::*;
pub use pose::*;
pub use rotation::*;
