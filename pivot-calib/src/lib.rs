//! Pivot calibration and tip tracking for a marker-tagged pointer.
//!
//! The pointer is calibrated by resting its tip on a surface and rotating it about the tip
//! while the marker stays in view. [`SampleFilter`] picks a diverse set of marker poses,
//! [`PivotSolver`] recovers the tip offset in the marker frame, and [`TipTracker`] carries that
//! offset through every later pose to locate the tip. [`MeasurementSession`] measures the
//! distance between a marked start point and the live tip.
//!
//! [`CalibrationStateMachine`] ties these together frame by frame:
//!
//! ```text
//! Idle --marker--> AutoCountdown --3 s--> Collecting --20 poses--> Ready
//!  ^                    |                     ^   |
//!  '---marker lost------'                     '---' degenerate solve
//! ```
//!
//! A reset from any state returns to `Idle`.

mod error;
mod filter;
mod machine;
mod measure;
mod settings;
mod solver;
mod status;
mod tracker;

pub use error::*;
pub use filter::*;
pub use machine::*;
pub use measure::*;
pub use settings::*;
pub use solver::*;
pub use status::*;
pub use tracker::*;
