//! The hand landmark model: 21 points with fixed anatomical meaning.

/// Number of landmarks predicted per hand.
pub const NUM_LANDMARKS: usize = 21;

/// One predicted hand landmark.
///
/// X and Y are normalized to `0..=1` relative to the width and height of the frame the prediction
/// was made on. Z is the depth relative to the wrist, in roughly the same scale as X; it is passed
/// through from the model and not otherwise interpreted by this crate.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct Landmark {
    x: f32,
    y: f32,
    z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.z
    }
}

/// The ordered collection of exactly [`NUM_LANDMARKS`] landmarks making up one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    positions: [Landmark; NUM_LANDMARKS],
}

impl Default for Landmarks {
    /// Creates a [`Landmarks`] collection with all coordinates at `0.0`.
    fn default() -> Self {
        Self {
            positions: [Landmark::default(); NUM_LANDMARKS],
        }
    }
}

impl Landmarks {
    /// Creates a [`Landmarks`] collection from raw `[x, y, z]` triples.
    pub fn from_positions(positions: [[f32; 3]; NUM_LANDMARKS]) -> Self {
        Self {
            positions: positions.map(|[x, y, z]| Landmark::new(x, y, z)),
        }
    }

    /// Returns the landmark at `index`, or [`None`] if `index` is not below [`NUM_LANDMARKS`].
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.positions.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Landmark> + Clone + '_ {
        self.positions.iter().copied()
    }

    pub fn positions(&self) -> &[Landmark] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Landmark] {
        &mut self.positions
    }
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl From<LandmarkIdx> for usize {
    #[inline]
    fn from(idx: LandmarkIdx) -> usize {
        idx as usize
    }
}

/// The fingertip landmark of each finger, thumb to pinky.
pub const FINGERTIPS: [LandmarkIdx; 5] = {
    use LandmarkIdx::*;
    [ThumbTip, IndexFingerTip, MiddleFingerTip, RingFingerTip, PinkyTip]
};

/// Landmark pairs connected by the hand skeleton, for visualization.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Surround the palm:
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_model_order() {
        assert_eq!(LandmarkIdx::Wrist as usize, 0);
        assert_eq!(LandmarkIdx::ThumbTip as usize, 4);
        assert_eq!(LandmarkIdx::IndexFingerTip as usize, 8);
        assert_eq!(LandmarkIdx::PinkyTip as usize, NUM_LANDMARKS - 1);
    }

    #[test]
    fn connectivity_stays_in_range() {
        for &(a, b) in CONNECTIVITY {
            assert!((a as usize) < NUM_LANDMARKS);
            assert!((b as usize) < NUM_LANDMARKS);
        }
    }
}
