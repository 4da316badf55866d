//! Captured region artifact

use std::io;

use chrono::{DateTime, TimeZone};
use image::RgbaImage;

use crate::domain::{CaptureRect, TileGrid};

/// Raster of a finished capture together with the rectangle it covers
#[derive(Clone, Debug)]
pub struct CapturedRegion {
    rgba: RgbaImage,
    rect: CaptureRect,
}

impl CapturedRegion {
    pub fn new(rgba: RgbaImage, rect: CaptureRect) -> Self {
        log::debug!(
            "CapturedRegion stitched: {}x{} pixels",
            rgba.width(),
            rgba.height()
        );
        Self { rgba, rect }
    }

    /// Get the width of the image
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    /// Get the height of the image
    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// Encode as PNG, consuming the raster
    pub fn into_png(self) -> Result<Vec<u8>, png::EncodingError> {
        let mut buffer = Vec::new();
        write_png(&mut buffer, &self.rgba)?;
        Ok(buffer)
    }

    /// Deterministic name from the top-left coordinate, the size and a timestamp
    pub fn file_name<Tz: TimeZone>(&self, grid: TileGrid, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let origin = grid.to_tile_local(self.rect.top_left());
        format!(
            "tilesnap_{}-{}_{}-{}_{}x{}_{}.png",
            origin.tile_x,
            origin.tile_y,
            origin.px,
            origin.py,
            self.width(),
            self.height(),
            at.format("%Y-%m-%d_%H-%M-%S")
        )
    }
}

pub fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GlobalPixel;
    use chrono::Utc;

    #[test]
    fn test_file_name_from_top_left_and_size() {
        let grid = TileGrid::default();
        let rect = CaptureRect::normalize(GlobalPixel::new(1050, 2060), GlobalPixel::new(1010, 2020));
        let region = CapturedRegion::new(RgbaImage::new(41, 41), rect);
        let at = Utc.with_ymd_and_hms(2026, 10, 14, 9, 5, 3).unwrap();
        assert_eq!(
            region.file_name(grid, &at),
            "tilesnap_1-2_10-20_41x41_2026-10-14_09-05-03.png"
        );
    }

    #[test]
    fn test_png_round_trip_preserves_pixels() {
        let mut rgba = RgbaImage::new(3, 2);
        rgba.put_pixel(2, 1, image::Rgba([200, 100, 50, 128]));
        let rect = CaptureRect::from_origin(GlobalPixel::new(0, 0), 3, 2);
        let bytes = CapturedRegion::new(rgba.clone(), rect).into_png().unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, rgba);
    }
}
