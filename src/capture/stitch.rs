//! Reconstruction of a capture rectangle from individually served tiles

use image::RgbaImage;

use super::error::CaptureError;
use super::fetch::TileSource;
use crate::domain::{CaptureRect, GlobalPixel, TileGrid, TileIndex};

/// Largest accepted width or height of a capture
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Bounds on capture size, keeping memory and fetch count bounded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureLimits {
    pub max_dimension: u32,
    pub max_pixels: u64,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_pixels: u64::from(DEFAULT_MAX_DIMENSION) * u64::from(DEFAULT_MAX_DIMENSION),
        }
    }
}

impl CaptureLimits {
    /// Check a rectangle and return its size as raster dimensions
    pub fn validate(&self, rect: &CaptureRect) -> Result<(u32, u32), CaptureError> {
        let (width, height) = (rect.width(), rect.height());
        if width <= 0 || height <= 0 {
            return Err(CaptureError::InvalidRegion { width, height });
        }
        let max = i64::from(self.max_dimension);
        if width > max || height > max {
            return Err(CaptureError::RegionTooLarge {
                width,
                height,
                limit: format!("{}px per side", self.max_dimension),
            });
        }
        if (width as u64) * (height as u64) > self.max_pixels {
            return Err(CaptureError::RegionTooLarge {
                width,
                height,
                limit: format!("{} pixels", self.max_pixels),
            });
        }
        Ok((width as u32, height as u32))
    }
}

/// Copy of one tile's clipped sub-rectangle into the output raster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileBlit {
    pub tile: TileIndex,
    /// Source offset inside the tile
    pub src_x: u32,
    pub src_y: u32,
    pub width: u32,
    pub height: u32,
    /// Destination offset inside the output raster
    pub dst_x: u32,
    pub dst_y: u32,
}

impl TileBlit {
    /// Copy the blit's region of `tile_image` into `output`, without blending
    pub fn apply(&self, tile_image: &RgbaImage, output: &mut RgbaImage) {
        let region =
            image::imageops::crop_imm(tile_image, self.src_x, self.src_y, self.width, self.height)
                .to_image();
        if region.dimensions() != (self.width, self.height) {
            log::warn!(
                "Tile {} is {}x{}, only {}x{} of the expected {}x{} region was available",
                self.tile,
                tile_image.width(),
                tile_image.height(),
                region.width(),
                region.height(),
                self.width,
                self.height
            );
        }
        image::imageops::replace(
            output,
            &region,
            i64::from(self.dst_x),
            i64::from(self.dst_y),
        );
    }
}

/// Every tile overlapped by `rect`, in row-major order, with its clip math
pub fn plan_tiles(grid: TileGrid, rect: CaptureRect) -> Vec<TileBlit> {
    if rect.width() <= 0 || rect.height() <= 0 {
        return Vec::new();
    }
    let size = u64::from(grid.tile_size);
    let min_tile = grid.tile_of(rect.top_left());
    let max_tile = grid.tile_of(GlobalPixel::new(rect.right, rect.bottom));

    let mut plan = Vec::new();
    for ty in min_tile.y..=max_tile.y {
        for tx in min_tile.x..=max_tile.x {
            let tile = TileIndex::new(tx, ty);
            let origin = grid.tile_origin(tile);
            let sx = rect.left.saturating_sub(origin.x);
            let sy = rect.top.saturating_sub(origin.y);
            let ex = size.min((rect.right + 1).saturating_sub(origin.x));
            let ey = size.min((rect.bottom + 1).saturating_sub(origin.y));
            if ex <= sx || ey <= sy {
                continue;
            }
            plan.push(TileBlit {
                tile,
                src_x: sx as u32,
                src_y: sy as u32,
                width: (ex - sx) as u32,
                height: (ey - sy) as u32,
                dst_x: (origin.x + sx - rect.left) as u32,
                dst_y: (origin.y + sy - rect.top) as u32,
            });
        }
    }
    plan
}

/// Fetch every covered tile in order and composite the capture rectangle
///
/// Tiles are requested one at a time; the first failed fetch aborts the
/// stitch and the partially drawn raster is dropped.
pub async fn stitch<S: TileSource>(
    source: &S,
    grid: TileGrid,
    rect: CaptureRect,
    limits: &CaptureLimits,
) -> Result<RgbaImage, CaptureError> {
    let (width, height) = limits.validate(&rect)?;
    let plan = plan_tiles(grid, rect);
    log::info!(
        "Stitching {}x{} region from {} tile(s)",
        width,
        height,
        plan.len()
    );

    // New buffers are zeroed, i.e. fully transparent
    let mut output = RgbaImage::new(width, height);
    for blit in &plan {
        match source.fetch_tile(blit.tile).await? {
            Some(tile_image) => blit.apply(&tile_image, &mut output),
            None => log::debug!("Tile {} missing, footprint left blank", blit.tile),
        }
    }
    Ok(output)
}
