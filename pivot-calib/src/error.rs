use thiserror::Error;

/// Failures of the pivot solve.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PivotError {
    #[error("need at least {required} poses for pivot calibration, got {got}")]
    NotEnoughSamples { required: usize, got: usize },
    #[error(
        "degenerate pivot geometry: singular value ratio {ratio:.3e} is below {threshold:.3e}, \
         rotate the pointer about more than one axis"
    )]
    DegenerateGeometry { ratio: f64, threshold: f64 },
    #[error("svd failed during pivot solve: {0}")]
    SvdFailed(&'static str),
}
