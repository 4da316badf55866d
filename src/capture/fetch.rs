//! Retrieval of single canvas tiles

use std::time::Duration;

use image::RgbaImage;

use super::error::CaptureError;
use crate::domain::TileIndex;

/// Base URL used when none is configured
pub const FALLBACK_TILE_BASE_URL: &str = "https://backend.wplace.live/files/s0/tiles";

/// Source of decoded tile bitmaps
///
/// `Ok(None)` means the tile does not exist on the server and its footprint
/// stays blank.
pub trait TileSource {
    async fn fetch_tile(&self, tile: TileIndex) -> Result<Option<RgbaImage>, CaptureError>;
}

/// Address of a tile: `{base}/{x}/{y}.png`
pub fn tile_url(base_url: &str, tile: TileIndex) -> String {
    format!("{}/{}/{}.png", base_url.trim_end_matches('/'), tile.x, tile.y)
}

/// Decode a tile payload into RGBA
pub fn decode_tile(tile: TileIndex, bytes: &[u8]) -> Result<RgbaImage, CaptureError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| CaptureError::Decode { tile, source })
}

/// Tiles served over HTTP(S)
pub struct HttpTileSource {
    client: reqwest::Client,
    base_url: String,
    blank_missing_tiles: bool,
}

impl HttpTileSource {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        blank_missing_tiles: bool,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tilesnap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            blank_missing_tiles,
        })
    }
}

impl TileSource for HttpTileSource {
    async fn fetch_tile(&self, tile: TileIndex) -> Result<Option<RgbaImage>, CaptureError> {
        let url = tile_url(&self.base_url, tile);
        log::debug!("Fetching tile {} from {}", tile, url);

        let network = |reason: String| CaptureError::Network { tile, reason };
        let response = self
            .client
            .get(&url)
            .header("Accept", "image/png,image/*")
            .send()
            .await
            .map_err(|e| network(format!("request error: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND && self.blank_missing_tiles {
            log::info!("Tile {} does not exist, leaving it blank", tile);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(network(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| network(format!("invalid body: {e}")))?;
        decode_tile(tile, &bytes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url() {
        let tile = TileIndex::new(1017, 650);
        assert_eq!(
            tile_url("https://example.test/tiles", tile),
            "https://example.test/tiles/1017/650.png"
        );
        assert_eq!(
            tile_url("https://example.test/tiles/", tile),
            "https://example.test/tiles/1017/650.png"
        );
    }

    #[test]
    fn test_decode_tile_reads_png() {
        let mut img = RgbaImage::new(2, 3);
        img.put_pixel(1, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let decoded = decode_tile(TileIndex::new(0, 0), &bytes).unwrap();
        assert_eq!(decoded.dimensions(), (2, 3));
        assert_eq!(decoded.get_pixel(1, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_tile_rejects_garbage() {
        let err = decode_tile(TileIndex::new(7, 8), b"<html>not found</html>").unwrap_err();
        assert!(matches!(err, CaptureError::Decode { tile, .. } if tile == TileIndex::new(7, 8)));
    }
}
