//! Parsing of the overlay's "last clicked pixel" readout
//!
//! The overlay renders the readout as `(Tl X: 1, Tl Y: 2, Px X: 3, Px Y: 4)`.
//! The text is owned and mutated by a third party, so every parse is
//! parse-or-reject: anything that is not exactly four labeled non-negative
//! integers yields `None`.

use super::geometry::TileCoord;

const LABELS: [&str; 4] = ["tl x", "tl y", "px x", "px y"];

/// Extract the coordinate tuple from readout text
pub fn parse_readout(text: &str) -> Option<TileCoord> {
    // ASCII lowercasing keeps byte offsets aligned with the original text
    let lower = text.to_ascii_lowercase();
    let mut search = 0;
    while let Some(found) = lower[search..].find(LABELS[0]) {
        let start = search + found;
        if let Some(coord) = parse_tuple(&lower[start..]) {
            return Some(coord);
        }
        search = start + LABELS[0].len();
    }
    None
}

fn parse_tuple(s: &str) -> Option<TileCoord> {
    let mut rest = s;
    let mut values = [0u32; 4];
    for (i, label) in LABELS.iter().enumerate() {
        if i > 0 {
            rest = rest.strip_prefix(',')?.trim_start();
        }
        rest = rest.strip_prefix(label)?.strip_prefix(':')?.trim_start();
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        values[i] = rest[..end].parse().ok()?;
        rest = &rest[end..];
    }
    let [tile_x, tile_y, px, py] = values;
    Some(TileCoord::new(tile_x, tile_y, px, py))
}
