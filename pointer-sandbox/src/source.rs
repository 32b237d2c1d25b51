use log::info;
use pivot_calib::Frame;
use pointer_core::nalgebra::Vector3;
use pointer_core::{MarkerPose, PivotOffset, RotationVector};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unable to open pose source {path}: {source}")]
    Acquisition { path: PathBuf, source: io::Error },
    #[error("unable to read line {line}: {source}")]
    Read { line: usize, source: io::Error },
    #[error("giving up after {attempts} failed reads, last on line {line}: {source}")]
    Unreadable {
        line: usize,
        attempts: usize,
        source: io::Error,
    },
    #[error("unable to decode frame on line {line}: {reason}")]
    Decode { line: usize, reason: String },
}

impl SourceError {
    /// Transient errors only affect one frame and the loop can carry on.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            SourceError::Acquisition { .. } | SourceError::Unreadable { .. }
        )
    }
}

/// Delivers the first detected marker pose of every frame.
pub trait PoseSource: Send {
    /// Returns the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

impl<S> PoseSource for Box<S>
where
    S: PoseSource + ?Sized,
{
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }
}

/// A frame as stored in a recording, one JSON object per line.
///
/// A line without `rvec` and `tvec` is a frame in which no marker was detected.
#[derive(Debug, Deserialize)]
struct RecordedFrame {
    t: f64,
    rvec: Option<[f64; 3]>,
    tvec: Option<[f64; 3]>,
}

/// Replays marker poses recorded by an external detector.
pub struct ReplaySource<R> {
    lines: Lines<R>,
    line: usize,
    read_failures: usize,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Acquisition {
            path: path.to_owned(),
            source,
        })?;
        info!("replaying poses from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            read_failures: 0,
        }
    }

    fn decode(&self, text: &str) -> Result<Frame, SourceError> {
        let decode_error = |reason: String| SourceError::Decode {
            line: self.line,
            reason,
        };
        let recorded: RecordedFrame =
            serde_json::from_str(text).map_err(|e| decode_error(e.to_string()))?;
        let timestamp = Duration::try_from_secs_f64(recorded.t)
            .map_err(|_| decode_error(format!("invalid timestamp {}", recorded.t)))?;
        let marker = match (recorded.rvec, recorded.tvec) {
            (Some(rvec), Some(tvec)) => Some(MarkerPose::new(
                RotationVector(rvec.into()),
                Vector3::from(tvec),
            )),
            (None, None) => None,
            _ => return Err(decode_error("rvec and tvec must come together".to_owned())),
        };
        Ok(Frame::new(timestamp, marker))
    }
}

impl<R> ReplaySource<R> {
    /// Consecutive failed reads after which the recording is considered unreadable.
    pub const MAX_READ_FAILURES: usize = 3;
}

impl<R: BufRead + Send> PoseSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            let text = match self.lines.next() {
                Some(text) => text,
                None => return Ok(None),
            };
            self.line += 1;
            let text = match text {
                Ok(text) => {
                    self.read_failures = 0;
                    text
                }
                Err(source) => {
                    self.read_failures += 1;
                    let line = self.line;
                    return Err(if self.read_failures >= Self::MAX_READ_FAILURES {
                        SourceError::Unreadable {
                            line,
                            attempts: self.read_failures,
                            source,
                        }
                    } else {
                        SourceError::Read { line, source }
                    });
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            return self.decode(&text).map(Some);
        }
    }
}

/// Simulates a pointer without a camera.
///
/// The marker is out of view for the first second, then the pointer pivots about a fixed tip
/// while sweeping through many orientations. After `pivot_duration` the pointer stops pivoting
/// and slides along the x axis so that a measurement can be taken.
pub struct SyntheticSource {
    rng: Pcg64,
    frame: u64,
    frame_interval: Duration,
    duration: Duration,
    pivot_duration: Duration,
    offset: PivotOffset,
    tip: Vector3<f64>,
    noise: f64,
}

impl SyntheticSource {
    const HIDDEN: Duration = Duration::from_secs(1);
    /// Sliding speed in meters per second once pivoting is over.
    const SLIDE_SPEED: f64 = 0.01;

    pub fn new(seed: u64, duration: Duration) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
            frame: 0,
            frame_interval: Duration::from_millis(33),
            duration,
            pivot_duration: Duration::from_secs(25),
            offset: PivotOffset::new(0.0, -0.12, 0.0),
            tip: Vector3::new(0.0, 0.03, 0.35),
            noise: 2e-4,
        }
    }

    /// Bound of the uniform translation noise in meters.
    #[must_use]
    pub fn noise(self, noise: f64) -> Self {
        Self { noise, ..self }
    }

    fn pose_at(&mut self, t: f64) -> MarkerPose {
        let visible = t - Self::HIDDEN.as_secs_f64();
        let pivot_end = self.pivot_duration.as_secs_f64();
        let (phase, slide) = if visible < pivot_end {
            (visible, 0.0)
        } else {
            (pivot_end, (visible - pivot_end) * Self::SLIDE_SPEED)
        };
        let rotation = RotationVector::new(
            0.6 * (1.7 * phase).sin(),
            0.6 * (2.3 * phase + 1.0).sin(),
            0.4 * (1.1 * phase).sin(),
        )
        .rotation();
        let tip = self.tip + Vector3::new(slide, 0.0, 0.0);
        let bound = self.noise;
        let rng = &mut self.rng;
        let noise = if bound > 0.0 {
            Vector3::from_fn(|_, _| rng.gen_range(-bound..bound))
        } else {
            Vector3::zeros()
        };
        MarkerPose::from_parts(tip - rotation * self.offset.0 + noise, rotation)
    }
}

impl PoseSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let timestamp = self.frame_interval * self.frame as u32;
        if timestamp > self.duration {
            return Ok(None);
        }
        self.frame += 1;
        let marker = if timestamp < Self::HIDDEN {
            None
        } else {
            Some(self.pose_at(timestamp.as_secs_f64()))
        };
        Ok(Some(Frame::new(timestamp, marker)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn replays_frames_and_gaps() {
        let recording = r#"{"t": 0.0}
{"t": 0.033, "rvec": [0.1, 0.2, 0.3], "tvec": [0.0, 0.01, 0.3]}

{"t": 0.066}
"#;
        let mut source = ReplaySource::new(recording.as_bytes());
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.marker, None);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.timestamp, Duration::from_millis(33));
        let marker = second.marker.unwrap();
        assert_relative_eq!(marker.rotation.0, Vector3::new(0.1, 0.2, 0.3));
        assert_relative_eq!(marker.translation, Vector3::new(0.0, 0.01, 0.3));
        assert!(source.next_frame().unwrap().unwrap().marker.is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn bad_lines_are_transient() {
        let recording = "{\"t\": 0.0, \"rvec\": [0.1, 0.2, 0.3]}\nnot json\n{\"t\": -1.0}\n{\"t\": 0.1}\n";
        let mut source = ReplaySource::new(recording.as_bytes());
        for line in 1..=3 {
            match source.next_frame() {
                Err(e @ SourceError::Decode { .. }) => {
                    assert!(e.is_transient());
                    assert!(e.to_string().contains(&format!("line {}", line)));
                }
                other => panic!("expected decode error, got {:?}", other),
            }
        }
        assert!(source.next_frame().unwrap().is_some());
    }

    /// Fails the first `failures` reads, then serves `data`.
    struct Flaky {
        failures: usize,
        data: io::Cursor<&'static [u8]>,
    }

    impl io::Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "device error"));
            }
            io::Read::read(&mut self.data, buf)
        }
    }

    fn flaky(failures: usize, data: &'static str) -> ReplaySource<BufReader<Flaky>> {
        ReplaySource::new(BufReader::new(Flaky {
            failures,
            data: io::Cursor::new(data.as_bytes()),
        }))
    }

    #[test]
    fn failed_read_counts_as_a_line() {
        let mut source = flaky(1, "not json\n{\"t\": 0.1}\n");
        match source.next_frame() {
            Err(e @ SourceError::Read { line: 1, .. }) => assert!(e.is_transient()),
            other => panic!("expected read error, got {:?}", other),
        }
        match source.next_frame() {
            Err(SourceError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected decode error, got {:?}", other),
        }
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn repeated_read_failures_are_fatal() {
        let mut source = flaky(usize::MAX, "");
        for _ in 1..ReplaySource::<()>::MAX_READ_FAILURES {
            assert!(source.next_frame().unwrap_err().is_transient());
        }
        match source.next_frame() {
            Err(e @ SourceError::Unreadable { .. }) => assert!(!e.is_transient()),
            other => panic!("expected unreadable recording, got {:?}", other),
        }
    }

    #[test]
    fn missing_recording_is_fatal() {
        let error = match ReplaySource::open("/nonexistent/poses.jsonl") {
            Err(error) => error,
            Ok(_) => panic!("opened a missing recording"),
        };
        assert!(!error.is_transient());
    }

    #[test]
    fn synthetic_tip_stays_put_while_pivoting() {
        let mut source = SyntheticSource::new(0, Duration::from_secs(5)).noise(0.0);
        let offset = source.offset;
        let tip = source.tip;
        let mut frames = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            frames += 1;
            if let Some(pose) = frame.marker {
                assert_relative_eq!(pose.transform(offset).0.coords, tip, epsilon = 1e-9);
            } else {
                assert!(frame.timestamp < SyntheticSource::HIDDEN);
            }
        }
        assert!(frames > 100);
    }
}
