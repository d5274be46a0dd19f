//! End-to-end exercise of the public API with a synthetic predictor: detect, extract, classify,
//! measure, annotate.

use handtrack::detection::Handedness;
use handtrack::detector::{HandDetector, HandPredictor, RawHand};
use handtrack::image::{Color, Image};
use handtrack::landmark::{LandmarkIdx, NUM_LANDMARKS};

/// Produces one upright open right hand, built from joint positions in 64ths of the frame.
struct OpenHandPredictor;

const OPEN_HAND: [(i32, i32); NUM_LANDMARKS] = [
    (32, 58), // wrist
    (40, 52),
    (44, 46),
    (46, 42),
    (50, 40), // thumb
    (37, 35),
    (37, 27),
    (37, 21),
    (37, 16), // index
    (32, 34),
    (32, 26),
    (32, 19),
    (32, 13), // middle
    (27, 35),
    (27, 27),
    (27, 21),
    (27, 17), // ring
    (22, 37),
    (22, 30),
    (22, 26),
    (22, 21), // pinky
];

impl HandPredictor for OpenHandPredictor {
    fn predict(&mut self, _image: &Image) -> anyhow::Result<Vec<RawHand>> {
        let mut landmarks = [[0.0; 3]; NUM_LANDMARKS];
        for (out, (x, y)) in landmarks.iter_mut().zip(OPEN_HAND) {
            *out = [x as f32 / 64.0, y as f32 / 64.0, 0.0];
        }
        Ok(vec![RawHand {
            landmarks,
            handedness: Handedness::Right,
            confidence: 0.9,
        }])
    }
}

#[test]
fn detect_extract_classify_measure() {
    let mut detector = HandDetector::new(OpenHandPredictor);
    let mut image = Image::new(128, 128);

    let detections = detector.detect(&image).unwrap();
    assert_eq!(detections.len(), 1);
    assert!(detections.hand(1).is_none());

    let hand = detections.hand(0).unwrap();
    assert_eq!(hand.handedness(), Handedness::Right);

    let pixels = hand.pixel_landmarks();
    assert_eq!(pixels.points().len(), NUM_LANDMARKS);

    // Every finger of the open hand is extended.
    assert!(detections.fingers_up(0).unwrap().all_up());
    assert!(detections.fingers_up(1).is_none());

    // Wrist to middle fingertip is the longest span on this hand.
    let span = pixels
        .span(LandmarkIdx::Wrist, LandmarkIdx::MiddleFingerTip)
        .unwrap();
    assert!(span.length() > 0.0);
    assert_eq!(span.start(), (64, 116));
    assert_eq!(span.end(), (64, 26));
    assert_eq!(span.midpoint(), (64, 71));

    // Annotation writes into the frame.
    detections.draw(&mut image);
    pixels.draw_bounding_rect(&mut image);
    span.draw(&mut image);
    assert!(image.data().iter().any(|b| *b != 0));
    let wrist = pixels.get(LandmarkIdx::Wrist).unwrap();
    assert_eq!(image.get(wrist.x as u32, wrist.y as u32), Color::MAGENTA);
}

#[test]
fn same_detections_yield_same_features() {
    let mut detector = HandDetector::new(OpenHandPredictor);
    let detections = detector.detect(&Image::new(128, 128)).unwrap();
    let hand = detections.hand(0).unwrap();

    let a = hand.pixel_landmarks();
    let b = hand.pixel_landmarks();
    assert_eq!(a, b);
    assert_eq!(a.fingers_up(), b.fingers_up());
    assert_eq!(a.bounding_rect(), b.bounding_rect());
}
