//! Per-frame hand detection results and the geometric features derived from them.
//!
//! A [`Detections`] value is the complete output of one detection call. Everything in this module
//! is a pure function of that value: extraction, classification and measurement can be repeated
//! any number of times with identical results, and nothing is carried over between frames.

use crate::image::{draw, Color, Image, Rect};
use crate::landmark::{LandmarkIdx, Landmarks, CONNECTIVITY, FINGERTIPS};
use crate::resolution::Resolution;
use crate::Error;

/// Pixel margin added on every side of a hand's bounding rectangle.
const BOUNDING_RECT_MARGIN: i32 = 10;

/// Which hand a detection belongs to, as reported by the model.
///
/// This assumes that the camera image is passed in as-is (not mirrored), and should only be relied
/// on when the detection's confidence is reasonably high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// All hands detected in a single frame.
///
/// Produced by [`HandDetector::detect`][crate::detector::HandDetector::detect]. When no hand is in
/// view this container is simply empty; that is not an error.
#[derive(Debug, Clone)]
pub struct Detections {
    hands: Vec<Detection>,
    resolution: Resolution,
}

impl Detections {
    pub(crate) fn new(hands: Vec<Detection>, resolution: Resolution) -> Self {
        Self { hands, resolution }
    }

    /// Returns the number of detected hands.
    #[inline]
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    /// Returns `true` when no hand was detected in the frame.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    /// Returns the resolution of the frame these detections were computed on.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.hands.iter()
    }

    /// Returns the detected hand with the given index.
    ///
    /// Returns [`None`] when fewer than `index + 1` hands were detected; requesting a hand that
    /// isn't there yields an empty result rather than a fault.
    pub fn hand(&self, index: usize) -> Option<&Detection> {
        self.hands.get(index)
    }

    /// Classifies the fingers of the hand with the given index.
    ///
    /// Returns [`None`] when no hand with that index was detected, which is the "no landmarks
    /// available" case.
    pub fn fingers_up(&self, index: usize) -> Option<FingerState> {
        self.hand(index).map(|h| h.pixel_landmarks().fingers_up())
    }

    /// Draws every detected hand onto `image`.
    pub fn draw(&self, image: &mut Image) {
        for hand in &self.hands {
            hand.draw(image);
        }
    }
}

/// One detected hand in one frame.
#[derive(Debug, Clone)]
pub struct Detection {
    landmarks: Landmarks,
    handedness: Handedness,
    confidence: f32,
    resolution: Resolution,
}

impl Detection {
    pub(crate) fn new(
        landmarks: Landmarks,
        handedness: Handedness,
        confidence: f32,
        resolution: Resolution,
    ) -> Self {
        Self {
            landmarks,
            handedness,
            confidence,
            resolution,
        }
    }

    /// Returns the hand's landmarks in normalized coordinates.
    #[inline]
    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    /// Returns the estimated handedness of the hand in the image.
    #[inline]
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Confidence value indicating how certain the model is that this is a hand, in range
    /// 0.0 to 1.0.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Converts the hand's normalized landmarks to `(index, x, y)` pixel triples.
    ///
    /// Normalized coordinates are multiplied by the frame dimensions and truncated.
    pub fn pixel_landmarks(&self) -> PixelLandmarks {
        let width = self.resolution.width() as f32;
        let height = self.resolution.height() as f32;
        PixelLandmarks {
            points: self
                .landmarks
                .iter()
                .enumerate()
                .map(|(index, lm)| PixelLandmark {
                    index,
                    x: (lm.x() * width) as i32,
                    y: (lm.y() * height) as i32,
                })
                .collect(),
        }
    }

    /// Draws the hand's skeleton, landmarks and a handedness label onto `image`.
    pub fn draw(&self, image: &mut Image) {
        let pixels = self.pixel_landmarks();
        pixels.draw(image);

        let hand = match self.handedness {
            Handedness::Left => "L",
            Handedness::Right => "R",
        };
        let rect = pixels.bounding_rect();
        draw::text(
            image,
            rect.center().0,
            rect.y(),
            &format!("{hand} {:.2}", self.confidence),
        )
        .align_bottom();
    }
}

/// One landmark of a hand as an `(index, x, y)` pixel triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLandmark {
    /// The landmark index, see [`LandmarkIdx`].
    pub index: usize,
    pub x: i32,
    pub y: i32,
}

/// A hand's landmarks converted to pixel coordinates.
///
/// The list always contains one entry per landmark
/// ([`NUM_LANDMARKS`][crate::landmark::NUM_LANDMARKS] of them), in model order, so the entry at
/// position `i` has `index == i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelLandmarks {
    points: Vec<PixelLandmark>,
}

impl PixelLandmarks {
    pub fn points(&self) -> &[PixelLandmark] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = PixelLandmark> + '_ {
        self.points.iter().copied()
    }

    /// Returns the pixel position of the landmark `index`.
    ///
    /// Accepts a plain `usize` or a [`LandmarkIdx`]. An index of
    /// [`NUM_LANDMARKS`][crate::landmark::NUM_LANDMARKS] or above is reported as
    /// [`Error::InvalidLandmark`].
    pub fn get(&self, index: impl Into<usize>) -> Result<PixelLandmark, Error> {
        let index = index.into();
        self.points
            .get(index)
            .copied()
            .ok_or(Error::InvalidLandmark(index))
    }

    /// Computes the axis-aligned bounding rectangle of all landmarks, with a fixed
    /// 10-pixel margin added on every side.
    pub fn bounding_rect(&self) -> Rect {
        Rect::bounding(self.points.iter().map(|p| (p.x, p.y)))
            .expect("landmark list is never empty")
            .grow_sides(
                BOUNDING_RECT_MARGIN,
                BOUNDING_RECT_MARGIN,
                BOUNDING_RECT_MARGIN,
                BOUNDING_RECT_MARGIN,
            )
    }

    /// Classifies each finger as extended or folded.
    ///
    /// A finger counts as extended when its tip lies above its PIP joint in image coordinates.
    /// The thumb is compared *horizontally* against its IP joint instead, in the direction away
    /// from the pinky side of the hand (decided by comparing the thumb tip's and pinky tip's X
    /// coordinates).
    ///
    /// These are direct geometric comparisons that assume an upright, camera-facing hand; rotated
    /// or sideways poses will misclassify. The thumb rule in particular is a known limitation and
    /// is kept compatible with the original heuristic.
    pub fn fingers_up(&self) -> FingerState {
        use LandmarkIdx::*;

        let thumb_tip = self.points[ThumbTip as usize];
        let thumb_ip = self.points[ThumbIp as usize];
        let pinky_tip = self.points[PinkyTip as usize];
        let thumb = if thumb_tip.x < pinky_tip.x {
            thumb_tip.x < thumb_ip.x
        } else {
            thumb_tip.x > thumb_ip.x
        };

        let mut fingers = [thumb, false, false, false, false];
        for (state, tip) in fingers[1..].iter_mut().zip(&FINGERTIPS[1..]) {
            let tip = *tip as usize;
            // The PIP joint sits 2 indices below the tip.
            *state = self.points[tip].y < self.points[tip - 2].y;
        }

        FingerState(fingers)
    }

    /// Measures the straight-line pixel distance between the landmarks `a` and `b`.
    ///
    /// An index of [`NUM_LANDMARKS`][crate::landmark::NUM_LANDMARKS] or above is reported as
    /// [`Error::InvalidLandmark`].
    pub fn span(&self, a: impl Into<usize>, b: impl Into<usize>) -> Result<Span, Error> {
        let start = self.get(a)?;
        let end = self.get(b)?;
        let length = ((end.x - start.x) as f32).hypot((end.y - start.y) as f32);
        Ok(Span {
            length,
            start: (start.x, start.y),
            end: (end.x, end.y),
            midpoint: (
                (start.x + end.x).div_euclid(2),
                (start.y + end.y).div_euclid(2),
            ),
        })
    }

    /// Draws the hand onto `image`: a filled circle per landmark, connected by the skeleton.
    pub fn draw(&self, image: &mut Image) {
        for &(a, b) in CONNECTIVITY {
            let a = self.points[a as usize];
            let b = self.points[b as usize];
            draw::line(image, a.x, a.y, b.x, b.y).color(Color::GREEN);
        }
        for point in &self.points {
            draw::circle(image, point.x, point.y, 9)
                .color(Color::MAGENTA)
                .filled();
        }
    }

    /// Draws the hand's bounding rectangle (including margin) onto `image`.
    pub fn draw_bounding_rect(&self, image: &mut Image) {
        draw::rect(image, self.bounding_rect())
            .color(Color::GREEN)
            .stroke_width(2);
    }
}

/// The extended/folded state of the five fingers of one hand, thumb to pinky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerState(pub [bool; 5]);

impl FingerState {
    #[inline]
    pub fn thumb(&self) -> bool {
        self.0[0]
    }

    #[inline]
    pub fn index_finger(&self) -> bool {
        self.0[1]
    }

    #[inline]
    pub fn middle_finger(&self) -> bool {
        self.0[2]
    }

    #[inline]
    pub fn ring_finger(&self) -> bool {
        self.0[3]
    }

    #[inline]
    pub fn pinky(&self) -> bool {
        self.0[4]
    }

    /// Returns the number of extended fingers.
    pub fn count_up(&self) -> usize {
        self.0.iter().filter(|up| **up).count()
    }

    pub fn all_up(&self) -> bool {
        self.0.iter().all(|up| *up)
    }

    pub fn all_down(&self) -> bool {
        self.0.iter().all(|up| !*up)
    }
}

/// The measurement between two landmarks returned by [`PixelLandmarks::span`].
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    length: f32,
    start: (i32, i32),
    end: (i32, i32),
    midpoint: (i32, i32),
}

impl Span {
    /// The Euclidean distance between the two landmarks, in pixels.
    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    #[inline]
    pub fn start(&self) -> (i32, i32) {
        self.start
    }

    #[inline]
    pub fn end(&self) -> (i32, i32) {
        self.end
    }

    /// The midpoint between the two landmarks (integer floor division).
    #[inline]
    pub fn midpoint(&self) -> (i32, i32) {
        self.midpoint
    }

    /// Draws both endpoints, the connecting line, and the midpoint onto `image`.
    pub fn draw(&self, image: &mut Image) {
        draw::line(image, self.start.0, self.start.1, self.end.0, self.end.1)
            .color(Color::MAGENTA)
            .stroke_width(3);
        for (x, y) in [self.start, self.end, self.midpoint] {
            draw::circle(image, x, y, 15).color(Color::MAGENTA).filled();
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::landmark::NUM_LANDMARKS;

    /// Landmark positions in 64ths of the frame; the 128x128 test frame makes every pixel
    /// coordinate an exact integer (twice the stored value).
    type HandPoints = [(i32, i32); NUM_LANDMARKS];

    /// Upright open right palm facing the camera (thumb on the +X side).
    const OPEN_PALM: HandPoints = [
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

    /// Fist with the same orientation as [`OPEN_PALM`]: every tip curls below its PIP joint and
    /// the thumb tip pulls back towards the palm.
    const FIST: HandPoints = [
        (32, 58), // wrist
        (40, 52),
        (43, 46),
        (44, 43),
        (41, 41), // thumb
        (37, 35),
        (37, 30),
        (37, 34),
        (37, 38), // index
        (32, 34),
        (32, 29),
        (32, 33),
        (32, 38), // middle
        (27, 35),
        (27, 30),
        (27, 34),
        (27, 38), // ring
        (22, 37),
        (22, 32),
        (22, 35),
        (22, 39), // pinky
    ];

    fn detection(points: HandPoints) -> Detection {
        let mut positions = [[0.0; 3]; NUM_LANDMARKS];
        for (pos, (x, y)) in positions.iter_mut().zip(points) {
            *pos = [x as f32 / 64.0, y as f32 / 64.0, 0.0];
        }
        Detection::new(
            Landmarks::from_positions(positions),
            Handedness::Right,
            0.95,
            Resolution::new(128, 128),
        )
    }

    fn mirrored(points: HandPoints) -> HandPoints {
        points.map(|(x, y)| (64 - x, y))
    }

    #[test]
    fn pixel_conversion_truncates() {
        let hand = detection(OPEN_PALM);
        let pixels = hand.pixel_landmarks();
        assert_eq!(pixels.points().len(), NUM_LANDMARKS);
        for (i, point) in pixels.iter().enumerate() {
            assert_eq!(point.index, i);
            assert_eq!(point.x, OPEN_PALM[i].0 * 2);
            assert_eq!(point.y, OPEN_PALM[i].1 * 2);
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let hand = detection(OPEN_PALM);
        assert_eq!(hand.pixel_landmarks(), hand.pixel_landmarks());
    }

    #[test]
    fn bounding_rect_adds_margin() {
        let pixels = detection(OPEN_PALM).pixel_landmarks();

        // min/max over the synthetic coordinates: x in 44..=100, y in 26..=116.
        assert_eq!(
            pixels.bounding_rect(),
            Rect::from_corners((44 - 10, 26 - 10), (100 + 10, 116 + 10)),
        );
    }

    #[test]
    fn open_palm_is_all_up() {
        let state = detection(OPEN_PALM).pixel_landmarks().fingers_up();
        assert!(state.all_up(), "{state:?}");
        assert_eq!(state.count_up(), 5);
    }

    #[test]
    fn fist_is_all_down() {
        let state = detection(FIST).pixel_landmarks().fingers_up();
        assert!(state.all_down(), "{state:?}");
        assert_eq!(state.count_up(), 0);
    }

    #[test]
    fn thumb_rule_flips_for_mirrored_hand() {
        let state = detection(mirrored(OPEN_PALM)).pixel_landmarks().fingers_up();
        assert!(state.all_up(), "{state:?}");

        let state = detection(mirrored(FIST)).pixel_landmarks().fingers_up();
        assert!(state.all_down(), "{state:?}");
    }

    #[test]
    fn span_between_landmarks() {
        let mut points = OPEN_PALM;
        points[LandmarkIdx::Wrist as usize] = (0, 0);
        points[LandmarkIdx::ThumbTip as usize] = (1, 2); // pixel (2, 4)
        let pixels = detection(points).pixel_landmarks();

        let span = pixels
            .span(LandmarkIdx::Wrist, LandmarkIdx::ThumbTip)
            .unwrap();
        assert_relative_eq!(span.length(), (2.0f32 * 2.0 + 4.0 * 4.0).sqrt());
        assert_eq!(span.midpoint(), (1, 2));

        let zero = pixels.span(LandmarkIdx::Wrist, LandmarkIdx::Wrist).unwrap();
        assert_relative_eq!(zero.length(), 0.0);
        assert_eq!(zero.start(), zero.end());
    }

    #[test]
    fn span_three_four_five() {
        let mut points = OPEN_PALM;
        points[0] = (0, 0);
        points[1] = (0, 0);
        let mut hand = detection(points);
        // Overwrite with raw positions for exact (0,0) and (3,4) pixels.
        hand.landmarks.positions_mut()[1] =
            crate::landmark::Landmark::new(3.0 / 128.0, 4.0 / 128.0, 0.0);
        let pixels = hand.pixel_landmarks();

        let span = pixels.span(0usize, 1usize).unwrap();
        assert_relative_eq!(span.length(), 5.0);
        assert_eq!(span.midpoint(), (1, 2));
    }

    #[test]
    fn invalid_landmark_index_is_reported() {
        let pixels = detection(OPEN_PALM).pixel_landmarks();
        assert!(matches!(
            pixels.get(NUM_LANDMARKS),
            Err(Error::InvalidLandmark(21)),
        ));
        assert!(matches!(
            pixels.span(0usize, 42usize),
            Err(Error::InvalidLandmark(42)),
        ));
    }

    #[test]
    fn absent_hand_is_empty_result() {
        let detections = Detections::new(vec![detection(OPEN_PALM)], Resolution::new(128, 128));
        assert_eq!(detections.len(), 1);
        assert!(detections.hand(0).is_some());
        assert!(detections.hand(1).is_none());
        assert!(detections.fingers_up(1).is_none());

        let empty = Detections::new(Vec::new(), Resolution::new(128, 128));
        assert!(empty.is_empty());
        assert!(empty.hand(0).is_none());
        assert!(empty.fingers_up(0).is_none());
    }

    #[test]
    fn drawing_annotates_frame() {
        let mut image = Image::new(128, 128);
        let detections = Detections::new(vec![detection(OPEN_PALM)], Resolution::new(128, 128));
        detections.draw(&mut image);
        let pixels = detections.hand(0).unwrap().pixel_landmarks();
        pixels.draw_bounding_rect(&mut image);

        let wrist = pixels.get(LandmarkIdx::Wrist).unwrap();
        assert_eq!(image.get(wrist.x as u32, wrist.y as u32), Color::MAGENTA);
    }
}
