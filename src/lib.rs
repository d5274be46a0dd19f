//! Hand landmark extraction and simple hand-geometry features.
//!
//! The neural network that turns a camera frame into 21 landmark positions per hand is an
//! external collaborator hidden behind the [`detector::HandPredictor`] trait. This crate adapts
//! the model's normalized output into per-hand pixel coordinates ([`detection::PixelLandmarks`])
//! and derives finger-up/down state, point-to-point distances, and bounding boxes from them.
//!
//! # Coordinates
//!
//! The model reports landmarks with X and Y normalized to `0..=1` relative to the input frame;
//! pixel positions are obtained by multiplying with the frame dimensions and truncating. Y points
//! *down*, as usual for image coordinates.
//!
//! # Environment Variables
//!
//! * `HANDTRACK_PYTHON`: Overrides the Python interpreter used to launch the MediaPipe helper
//!   process ([`detector::mediapipe::MediaPipeHands`]).

use log::LevelFilter;

pub mod detection;
pub mod detector;
mod error;
pub mod gui;
pub mod image;
pub mod landmark;
pub mod resolution;
pub mod timer;
pub mod webcam;

pub use error::Error;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this crate will log at *debug* level; `wgpu` will log at *warn* level.
/// `RUST_LOG` overrides both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
