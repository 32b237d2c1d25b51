use pointer_core::CameraPoint;

const CENTIMETERS_PER_METER: f64 = 100.0;

/// Holds the optional start point of a distance measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeasurementSession {
    start: Option<CameraPoint>,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<CameraPoint> {
        self.start
    }

    /// Marks the given tip as the start point, or clears an existing start point.
    ///
    /// Clearing happens whether or not a tip is available. Without a tip and
    /// without a start point this does nothing.
    pub fn toggle_start(&mut self, tip: Option<CameraPoint>) {
        self.start = match self.start {
            Some(_) => None,
            None => tip,
        };
    }

    pub fn clear(&mut self) {
        self.start = None;
    }

    /// Distance from the start point to `tip` in centimeters, if a start point is set.
    pub fn distance_cm(&self, tip: CameraPoint) -> Option<f64> {
        self.start
            .map(|start| start.distance(&tip) * CENTIMETERS_PER_METER)
    }
}
