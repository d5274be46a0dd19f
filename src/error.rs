//! The crate's error type.

/// Errors reported by this crate.
///
/// Absence of a detected hand is *not* an error; it shows up as an empty
/// [`Detections`][crate::detection::Detections] container or a [`None`] result.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A landmark index outside of `0..=20` was requested.
    #[error("no landmark with index {0} (hands have landmarks 0..=20)")]
    InvalidLandmark(usize),

    /// Reading a frame from the capture device failed.
    #[error("frame capture failed: {0}")]
    Capture(anyhow::Error),

    /// The external hand-pose model failed to produce predictions.
    #[error("hand predictor failed: {0}")]
    Predictor(anyhow::Error),
}
