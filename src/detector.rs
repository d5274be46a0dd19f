//! The external hand-pose model boundary and its convenience wrapper.

pub mod mediapipe;

use crate::detection::{Detection, Detections, Handedness};
use crate::image::Image;
use crate::landmark::{Landmarks, NUM_LANDMARKS};
use crate::timer::Timer;
use crate::Error;

/// Configuration knobs passed through to the hand-pose model.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub(crate) static_image_mode: bool,
    pub(crate) max_hands: usize,
    pub(crate) min_detection_confidence: f32,
    pub(crate) min_tracking_confidence: f32,
}

/// The default configuration: video mode, up to 2 hands, 0.5 detection and tracking confidence.
impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            static_image_mode: false,
            max_hands: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl DetectorConfig {
    /// Treats every frame as an unrelated still image instead of a video stream.
    ///
    /// This disables landmark tracking across frames inside the model.
    #[inline]
    pub fn static_image_mode(mut self, static_image_mode: bool) -> Self {
        self.static_image_mode = static_image_mode;
        self
    }

    /// Sets the maximum number of hands the model will report per frame.
    #[inline]
    pub fn max_hands(mut self, max_hands: usize) -> Self {
        self.max_hands = max_hands;
        self
    }

    /// Sets the minimum confidence for the initial hand detection to be reported.
    #[inline]
    pub fn min_detection_confidence(mut self, confidence: f32) -> Self {
        self.min_detection_confidence = confidence;
        self
    }

    /// Sets the minimum confidence for cross-frame landmark tracking to be considered
    /// successful (ignored in static-image mode).
    #[inline]
    pub fn min_tracking_confidence(mut self, confidence: f32) -> Self {
        self.min_tracking_confidence = confidence;
        self
    }
}

/// A raw per-hand prediction produced by a [`HandPredictor`].
#[derive(Debug, Clone)]
pub struct RawHand {
    /// The 21 landmark positions as normalized `[x, y, z]` triples.
    pub landmarks: [[f32; 3]; NUM_LANDMARKS],
    pub handedness: Handedness,
    /// Model confidence that this is actually a hand, 0.0 to 1.0.
    pub confidence: f32,
}

/// Interface to an external hand-pose estimation model.
///
/// Implementations accept a frame and return, per detected hand (up to a configured maximum), 21
/// landmarks with normalized coordinates. The model's architecture and inference runtime are
/// entirely its own business; any equivalent model satisfies this contract.
pub trait HandPredictor: Send {
    /// Runs hand-pose estimation on `image`.
    ///
    /// Returns one entry per detected hand, or an empty list when no hand is in view (which is
    /// not an error).
    fn predict(&mut self, image: &Image) -> anyhow::Result<Vec<RawHand>>;
}

/// Convenience wrapper around a [`HandPredictor`].
///
/// Adapts the model's raw output into [`Detections`]. The result is handed back to the caller
/// rather than kept inside the detector, so extraction and classification are ordinary method
/// calls on the returned value and repeated calls cannot observe stale state.
pub struct HandDetector {
    predictor: Box<dyn HandPredictor>,
    t_predict: Timer,
}

impl HandDetector {
    pub fn new<P: HandPredictor + 'static>(predictor: P) -> Self {
        Self {
            predictor: Box::new(predictor),
            t_predict: Timer::new("predict"),
        }
    }

    /// Runs hand detection on `image`.
    ///
    /// Returns the per-hand landmark collections; empty when no hand is in view. A failure of the
    /// underlying model is reported as [`Error::Predictor`].
    pub fn detect(&mut self, image: &Image) -> Result<Detections, Error> {
        let Self {
            predictor,
            t_predict,
        } = self;
        let raw = t_predict
            .time(|| predictor.predict(image))
            .map_err(Error::Predictor)?;
        log::trace!("predictor returned {} hand(s)", raw.len());

        let resolution = image.resolution();
        let hands = raw
            .into_iter()
            .map(|hand| {
                Detection::new(
                    Landmarks::from_positions(hand.landmarks),
                    hand.handedness,
                    hand.confidence,
                    resolution,
                )
            })
            .collect();
        Ok(Detections::new(hands, resolution))
    }

    /// Returns profiling timers for this detector.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_predict].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Predictor that replays a fixed prediction for every frame.
    struct StaticPredictor(Vec<RawHand>);

    impl HandPredictor for StaticPredictor {
        fn predict(&mut self, _image: &Image) -> anyhow::Result<Vec<RawHand>> {
            Ok(self.0.clone())
        }
    }

    struct FailingPredictor;

    impl HandPredictor for FailingPredictor {
        fn predict(&mut self, _image: &Image) -> anyhow::Result<Vec<RawHand>> {
            anyhow::bail!("model exploded")
        }
    }

    #[test]
    fn adapts_raw_predictions() {
        let raw = RawHand {
            landmarks: [[0.5, 0.25, 0.0]; NUM_LANDMARKS],
            handedness: Handedness::Left,
            confidence: 0.8,
        };
        let mut detector = HandDetector::new(StaticPredictor(vec![raw]));

        let detections = detector.detect(&Image::new(64, 32)).unwrap();
        assert_eq!(detections.len(), 1);
        let hand = detections.hand(0).unwrap();
        assert_eq!(hand.handedness(), Handedness::Left);

        let pixels = hand.pixel_landmarks();
        let wrist = pixels.get(0usize).unwrap();
        assert_eq!((wrist.x, wrist.y), (32, 8));
    }

    #[test]
    fn no_hands_is_empty_not_an_error() {
        let mut detector = HandDetector::new(StaticPredictor(Vec::new()));
        let detections = detector.detect(&Image::new(64, 32)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn predictor_failure_is_reported() {
        let mut detector = HandDetector::new(FailingPredictor);
        let err = detector.detect(&Image::new(64, 32)).unwrap_err();
        assert!(matches!(err, Error::Predictor(_)));
    }
}
