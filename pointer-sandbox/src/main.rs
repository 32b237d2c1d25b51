mod console;
mod source;
mod worker;

use log::*;
use pivot_calib::{CalibrationSettings, CalibrationStateMachine};
use pointer_core::nalgebra::{Point2, Vector2};
use pointer_pinhole::{BrownConrady5, CameraIntrinsics, CameraIntrinsicsDistortion};
use source::{PoseSource, ReplaySource, SyntheticSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;
use worker::Shared;

#[derive(StructOpt, Clone)]
#[structopt(
    name = "pointer-sandbox",
    about = "Pivot calibrate a marker pointer and measure distances with its tip"
)]
struct Opt {
    /// The file where settings are specified.
    ///
    /// This is in the format of `pivot_calib::CalibrationSettings`.
    #[structopt(short, long, default_value = "pointer-settings.json")]
    settings: PathBuf,
    /// Replay marker poses from a JSON lines file instead of simulating a pointer.
    ///
    /// Each line looks like `{"t": 0.033, "rvec": [..], "tvec": [..]}`. A line without
    /// `rvec` and `tvec` is a frame in which no marker was detected.
    #[structopt(short, long)]
    replay: Option<PathBuf>,
    /// Time in milliseconds to idle between frames
    #[structopt(long, default_value = "30")]
    frame_delay_ms: u64,
    /// Seed of the simulated pointer noise
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// Bound of the uniform noise on simulated marker positions in meters
    #[structopt(long, default_value = "0.0002")]
    noise: f64,
    /// Length of the simulated session in seconds
    #[structopt(long, default_value = "40")]
    duration: f64,
    /// The x focal length
    #[structopt(long, default_value = "506.25")]
    x_focal: f64,
    /// The y focal length
    #[structopt(long, default_value = "505.10")]
    y_focal: f64,
    /// The x optical center coordinate
    #[structopt(long, default_value = "317.89")]
    x_center: f64,
    /// The y optical center coordinate
    #[structopt(long, default_value = "244.05")]
    y_center: f64,
    /// The skew
    #[structopt(long, default_value = "0.0")]
    skew: f64,
    /// The K1 radial distortion
    #[structopt(long, default_value = "0.2099", allow_hyphen_values = true)]
    k1: f64,
    /// The K2 radial distortion
    #[structopt(long, default_value = "-0.9094", allow_hyphen_values = true)]
    k2: f64,
    /// The P1 tangential distortion
    #[structopt(long, default_value = "0.0077", allow_hyphen_values = true)]
    p1: f64,
    /// The P2 tangential distortion
    #[structopt(long, default_value = "0.0014", allow_hyphen_values = true)]
    p2: f64,
    /// The K3 radial distortion
    #[structopt(long, default_value = "1.3815", allow_hyphen_values = true)]
    k3: f64,
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();

    // Fill intrinsics from args.
    let camera = CameraIntrinsicsDistortion::new(
        CameraIntrinsics::identity()
            .focals(Vector2::new(opt.x_focal, opt.y_focal))
            .principal_point(Point2::new(opt.x_center, opt.y_center))
            .skew(opt.skew),
        BrownConrady5::from_coefficients([opt.k1, opt.k2, opt.p1, opt.p2, opt.k3]),
    );

    let settings = std::fs::File::open(&opt.settings)
        .ok()
        .and_then(|file| serde_json::from_reader(file).ok());
    if settings.is_some() {
        info!("loaded existing settings");
    } else {
        info!("used default settings");
    }
    let settings: CalibrationSettings = settings.unwrap_or_default();
    debug!("{:?}", settings);

    let source: Box<dyn PoseSource> = match &opt.replay {
        Some(path) => match ReplaySource::open(path) {
            Ok(source) => Box::new(source),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            let duration = Duration::try_from_secs_f64(opt.duration.max(0.0))
                .unwrap_or(Duration::MAX);
            info!("simulating a pointer for {:.0} s", duration.as_secs_f64());
            Box::new(SyntheticSource::new(opt.seed, duration).noise(opt.noise))
        }
    };

    println!("{}", console::HELP);

    let shared = Arc::new(Shared::new());
    let machine = CalibrationStateMachine::new(settings, camera);
    let handle = worker::spawn(
        source,
        machine,
        Duration::from_millis(opt.frame_delay_ms),
        shared.clone(),
    );
    console::spawn_input(shared.clone());

    console::present(&shared, Duration::from_millis(opt.frame_delay_ms.max(1)));

    match handle.join() {
        Ok(machine) => match machine.offset() {
            Some(offset) => info!(
                "session ended calibrated, tip offset ({:.4}, {:.4}, {:.4}) m",
                offset.x, offset.y, offset.z
            ),
            None => info!("session ended without a calibration"),
        },
        Err(_) => {
            error!("processing worker panicked");
            std::process::exit(1);
        }
    }
}
