//! Frame packing for the 4-gray panel.
//!
//! Each 8-bit grayscale sample is quantized to a level in `0..=3` with the
//! ascending thresholds 64/128/192 (level 3 is white). Four horizontally
//! adjacent pixels share one byte, first pixel in the high bits:
//!
//! ```text
//!  bit:  7 6 │ 5 4 │ 3 2 │ 1 0
//!        p0  │ p1  │ p2  │ p3
//! ```
//!
//! The panel driver reads pixels back with [`level_at`], so this module is
//! the single place the bit order is defined.

use crate::{FRAME_SIZE, PIXELS_PER_BYTE};

/// Quantization thresholds, ascending
pub const THRESHOLDS: [u8; 3] = [64, 128, 192];

/// Highest gray level (white)
pub const MAX_LEVEL: u8 = 3;

/// Errors from frame packing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Raster or output length does not match what the frame requires
    SizeMismatch { expected: usize, actual: usize },
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {expected} bytes, got {actual}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// A row-major grid of 8-bit grayscale samples
#[derive(Debug, Clone, Copy)]
pub struct Raster<'a> {
    width: usize,
    height: usize,
    samples: &'a [u8],
}

impl<'a> Raster<'a> {
    /// Wrap `samples` as a `width` × `height` grid
    pub fn new(width: usize, height: usize, samples: &'a [u8]) -> Result<Self, FrameError> {
        let expected = width * height;
        if samples.len() != expected {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples(&self) -> &'a [u8] {
        self.samples
    }

    /// Bytes this raster occupies once packed
    pub fn packed_len(&self) -> usize {
        (self.width * self.height).div_ceil(PIXELS_PER_BYTE)
    }
}

/// Quantize one grayscale sample to a 2-bit level
///
/// Monotonic: a larger sample never yields a smaller level.
pub fn quantize(sample: u8) -> u8 {
    THRESHOLDS.iter().filter(|&&t| sample >= t).count() as u8
}

/// Pack four levels (in pixel order) into one byte
pub fn pack(levels: [u8; PIXELS_PER_BYTE]) -> u8 {
    levels
        .iter()
        .enumerate()
        .fold(0, |byte, (i, &level)| byte | ((level & MAX_LEVEL) << shift(i)))
}

/// Read the level of pixel `index` (row-major) from a packed frame
pub fn level_at(frame: &[u8], index: usize) -> u8 {
    (frame[index / PIXELS_PER_BYTE] >> shift(index % PIXELS_PER_BYTE)) & MAX_LEVEL
}

/// Bit offset of the pixel at `position` within its byte
fn shift(position: usize) -> usize {
    6 - 2 * position
}

/// Quantize and pack a raster into `out`
///
/// Both the packed raster and `out` must be exactly [`FRAME_SIZE`] bytes.
pub fn encode(raster: &Raster<'_>, out: &mut [u8]) -> Result<(), FrameError> {
    let packed = raster.packed_len();
    if packed != FRAME_SIZE || raster.samples.len() % PIXELS_PER_BYTE != 0 {
        return Err(FrameError::SizeMismatch {
            expected: FRAME_SIZE,
            actual: packed,
        });
    }
    if out.len() != FRAME_SIZE {
        return Err(FrameError::SizeMismatch {
            expected: FRAME_SIZE,
            actual: out.len(),
        });
    }

    for (byte, run) in out
        .iter_mut()
        .zip(raster.samples.chunks_exact(PIXELS_PER_BYTE))
    {
        *byte = pack([
            quantize(run[0]),
            quantize(run[1]),
            quantize(run[2]),
            quantize(run[3]),
        ]);
    }
    Ok(())
}

/// Quantize and pack a raster into a new frame buffer
#[cfg(feature = "std")]
pub fn encode_to_vec(raster: &Raster<'_>) -> Result<std::vec::Vec<u8>, FrameError> {
    let mut frame = std::vec![0u8; FRAME_SIZE];
    encode(raster, &mut frame)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PANEL_HEIGHT, PANEL_WIDTH};
    use proptest::prelude::*;

    #[test]
    fn test_quantize_thresholds() {
        assert_eq!(quantize(0), 0);
        assert_eq!(quantize(63), 0);
        assert_eq!(quantize(64), 1);
        assert_eq!(quantize(127), 1);
        assert_eq!(quantize(128), 2);
        assert_eq!(quantize(191), 2);
        assert_eq!(quantize(192), 3);
        assert_eq!(quantize(255), 3);
    }

    #[test]
    fn test_pack_places_first_pixel_high() {
        assert_eq!(pack([3, 0, 0, 0]), 0b1100_0000);
        assert_eq!(pack([0, 0, 0, 3]), 0b0000_0011);
        assert_eq!(pack([0, 1, 2, 3]), 0b0001_1011);
    }

    #[test]
    fn test_level_at_reads_back_pack_order() {
        let frame = [pack([0, 1, 2, 3]), pack([3, 2, 1, 0])];
        let levels: Vec<u8> = (0..8).map(|i| level_at(&frame, i)).collect();
        assert_eq!(levels, [0, 1, 2, 3, 3, 2, 1, 0]);
    }

    #[test]
    fn test_encode_gradient_row() {
        let mut samples = vec![255u8; PANEL_WIDTH * PANEL_HEIGHT];
        samples[..4].copy_from_slice(&[0, 100, 150, 200]);
        let raster = Raster::new(PANEL_WIDTH, PANEL_HEIGHT, &samples).unwrap();

        let mut frame = vec![0u8; FRAME_SIZE];
        encode(&raster, &mut frame).unwrap();

        assert_eq!(frame[0], pack([0, 1, 2, 3]));
        assert!(frame[1..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_raster_rejects_wrong_sample_count() {
        let samples = [0u8; 10];
        assert_eq!(
            Raster::new(4, 4, &samples).unwrap_err(),
            FrameError::SizeMismatch {
                expected: 16,
                actual: 10
            }
        );
    }

    #[test]
    fn test_encode_rejects_wrong_dimensions() {
        let samples = vec![0u8; 400 * 240];
        let raster = Raster::new(400, 240, &samples).unwrap();
        let mut frame = vec![0u8; FRAME_SIZE];

        assert_eq!(
            encode(&raster, &mut frame),
            Err(FrameError::SizeMismatch {
                expected: FRAME_SIZE,
                actual: 400 * 240 / 4
            })
        );
    }

    #[test]
    fn test_encode_rejects_short_output() {
        let samples = vec![0u8; PANEL_WIDTH * PANEL_HEIGHT];
        let raster = Raster::new(PANEL_WIDTH, PANEL_HEIGHT, &samples).unwrap();
        let mut frame = vec![0u8; FRAME_SIZE - 1];

        assert!(encode(&raster, &mut frame).is_err());
    }

    proptest! {
        #[test]
        fn prop_quantize_is_monotonic(a in any::<u8>(), b in any::<u8>()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(quantize(lo) <= quantize(hi));
            prop_assert!(quantize(hi) <= MAX_LEVEL);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_encoded_frame_has_fixed_size(seed in any::<u8>(), step in 1u8..=255) {
            let samples: Vec<u8> = (0..PANEL_WIDTH * PANEL_HEIGHT)
                .map(|i| seed.wrapping_add((i as u8).wrapping_mul(step)))
                .collect();
            let raster = Raster::new(PANEL_WIDTH, PANEL_HEIGHT, &samples).unwrap();
            let mut frame = vec![0u8; FRAME_SIZE];
            encode(&raster, &mut frame).unwrap();

            prop_assert_eq!(frame.len(), FRAME_SIZE);
            for i in (0..samples.len()).step_by(997) {
                prop_assert_eq!(level_at(&frame, i), quantize(samples[i]));
            }
        }
    }
}
