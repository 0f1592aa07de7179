//! Raster producer
//!
//! Loads an image, converts it to 8-bit grayscale, fits it to the panel and
//! packs it into a frame.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use inkwire_protocol::frame::{self, Raster};
use inkwire_protocol::{FrameError, PANEL_HEIGHT, PANEL_WIDTH};

use crate::error::RasterError;

/// Load an image file and pack it into a frame
pub fn load_frame(path: &Path) -> Result<Vec<u8>, RasterError> {
    let image = image::open(path)?;
    Ok(frame_from_image(&image)?)
}

/// Convert any image to an 800×480 grayscale raster
///
/// Images of a different size are resampled (Lanczos3) without keeping the
/// aspect ratio.
pub fn panel_raster(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    if gray.dimensions() == (PANEL_WIDTH as u32, PANEL_HEIGHT as u32) {
        return gray;
    }
    imageops::resize(
        &gray,
        PANEL_WIDTH as u32,
        PANEL_HEIGHT as u32,
        FilterType::Lanczos3,
    )
}

/// Pack an image into a frame
pub fn frame_from_image(image: &DynamicImage) -> Result<Vec<u8>, FrameError> {
    let gray = panel_raster(image);
    let raster = Raster::new(PANEL_WIDTH, PANEL_HEIGHT, gray.as_raw())?;
    frame::encode_to_vec(&raster)
}
