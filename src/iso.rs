//! Isometric tile cutting from pre-rendered sheets
//!
//! Sheets hold a 2:1 isometric grid. Grid cell (0, 0) has the top-left corner
//! of its bounding box at the sheet origin; cell (gx, gy) sits at the usual
//! isometric projection from there.

use image::{GrayImage, Luma, Rgb};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::rc::Rc;

use crate::raster::SourceFile;
use crate::sprite::{Bpp, Layers, RenderContext, Sprite, SpriteError, SpriteMeta, Zoom};

/// Ground tile width at base zoom.
pub const TILE_WIDTH: u32 = 64;
/// Ground tile height at base zoom.
pub const TILE_HEIGHT: u32 = 32;

/// Tile width and height at `zoom`.
pub fn tile_size(zoom: Zoom) -> (u32, u32) {
    (TILE_WIDTH * zoom.factor(), TILE_HEIGHT * zoom.factor())
}

/// Top-left of the bounding box of grid cell (`gx`, `gy`), relative to the
/// sheet origin.
pub fn tile_position(gx: i32, gy: i32, zoom: Zoom) -> (i64, i64) {
    let (tw, th) = tile_size(zoom);
    let (gx, gy) = (i64::from(gx), i64::from(gy));
    let sx = (gx - gy) * i64::from(tw) / 2;
    let sy = (gx + gy) * i64::from(th) / 2;
    (sx, sy)
}

/// Whether pixel (`x`, `y`) of a `tw` x `th` cell lies on the ground diamond.
///
/// Row `y` is narrowed by `d` pixels per side, twice over: `d` counts rows
/// away from the middle line, so the middle two rows span the full width.
pub fn diamond_contains(x: u32, y: u32, tw: u32, th: u32) -> bool {
    let half = th / 2;
    let d = if y < half { half - 1 - y } else { y - half };
    let (x, d, tw) = (u64::from(x), u64::from(d), u64::from(tw));
    2 * d <= x && x < tw.saturating_sub(2 * d)
}

/// Zero every plane outside the ground diamond.
///
/// Opaque data gets an alpha plane so the cut-away corners are transparent.
pub fn apply_diamond(layers: &mut Layers) {
    let (tw, th) = layers.dimensions();
    let alpha = layers.alpha.get_or_insert_with(|| GrayImage::from_pixel(tw, th, Luma([255])));
    for y in 0..th {
        for x in 0..tw {
            if diamond_contains(x, y, tw, th) {
                continue;
            }
            layers.rgb.put_pixel(x, y, Rgb([0, 0, 0]));
            alpha.put_pixel(x, y, Luma([0]));
            if let Some(mask) = layers.mask.as_mut() {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
    }
    layers.bpp = Bpp::Bpp32;
}

/// What part of a grid cell to cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IsoCut {
    /// One tile-sized diamond
    Ground,
    /// A rectangle as wide as a tile, `height` pixels tall, standing on the
    /// tile's bottom edge
    Building { height: u32 },
}

/// One grid cell cut out of an isometric sheet.
#[derive(Debug, Clone)]
pub struct IsoCutSprite {
    meta: SpriteMeta,
    source: Rc<SourceFile>,
    origin: (u32, u32),
    gx: i32,
    gy: i32,
    cut: IsoCut,
}

impl IsoCutSprite {
    /// Ground tile at (`gx`, `gy`), placed with the default ground offsets.
    pub fn ground(
        name: impl Into<String>,
        source: Rc<SourceFile>,
        origin: (u32, u32),
        gx: i32,
        gy: i32,
        zoom: Zoom,
    ) -> Self {
        let (tw, th) = tile_size(zoom);
        let z = zoom.factor() as i32;
        let meta = SpriteMeta::new(name, tw, th, zoom).with_offset(-31 * z, 0);
        Self { meta, source, origin, gx, gy, cut: IsoCut::Ground }
    }

    /// Building piece of `height` pixels over cell (`gx`, `gy`).
    ///
    /// Anything taller than a tile is lifted by the extra height.
    pub fn building(
        name: impl Into<String>,
        source: Rc<SourceFile>,
        origin: (u32, u32),
        gx: i32,
        gy: i32,
        height: u32,
        zoom: Zoom,
    ) -> Self {
        let (tw, th) = tile_size(zoom);
        let z = zoom.factor() as i32;
        let lift = i64::from(th) - i64::from(height);
        let yofs = i32::try_from(lift).unwrap_or(i32::MIN);
        let meta = SpriteMeta::new(name, tw, height, zoom).with_offset(-31 * z, yofs);
        Self { meta, source, origin, gx, gy, cut: IsoCut::Building { height } }
    }

    pub fn with_offset(mut self, xofs: i32, yofs: i32) -> Self {
        self.meta = self.meta.with_offset(xofs, yofs);
        self
    }

    pub fn cut(&self) -> IsoCut {
        self.cut
    }

    /// Requested rectangle in sheet coordinates: x, y, width, height.
    pub fn region(&self) -> (i64, i64, u32, u32) {
        let (sx, sy) = tile_position(self.gx, self.gy, self.meta.zoom);
        let (_, th) = tile_size(self.meta.zoom);
        let x = i64::from(self.origin.0) + sx;
        let y = i64::from(self.origin.1) + sy;
        match self.cut {
            IsoCut::Ground => (x, y, self.meta.width, self.meta.height),
            IsoCut::Building { height } => (x, y + i64::from(th) - i64::from(height), self.meta.width, height),
        }
    }
}

impl Sprite for IsoCutSprite {
    fn meta(&self) -> &SpriteMeta {
        &self.meta
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        let sheet = self.source.load(ctx)?;
        let (src_w, src_h) = sheet.dimensions();
        let (x, y, w, h) = self.region();
        let inside = x >= 0
            && y >= 0
            && x + i64::from(w) <= i64::from(src_w)
            && y + i64::from(h) <= i64::from(src_h);
        if !inside {
            return Err(SpriteError::OutOfBounds {
                sprite: self.meta.name.clone(),
                x,
                y,
                w,
                h,
                source_size: (src_w, src_h),
            });
        }

        // Both coordinates are within the sheet, so they fit in u32.
        let mut layers = sheet.crop(x as u32, y as u32, w, h).with_offset(self.meta.xofs, self.meta.yofs);
        if self.cut == IsoCut::Ground {
            apply_diamond(&mut layers);
        }
        Ok(layers)
    }

    fn fingerprint(&self) -> Value {
        json!({
            "class": "IsoCutSprite",
            "meta": self.meta,
            "source": self.source.fingerprint(),
            "origin": self.origin,
            "cell": [self.gx, self.gy],
            "cut": self.cut,
        })
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        vec![self.source.path().to_path_buf()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SourceKey;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn sheet(temp: &TempDir, w: u32, h: u32) -> Rc<SourceFile> {
        let path = temp.path().join("ground.png");
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255]))
            .save(&path)
            .expect("should write png");
        Rc::new(SourceFile::new(SourceKey::image(path)))
    }

    #[test]
    fn test_diamond_boundaries_zoom1() {
        let (tw, th) = tile_size(Zoom::Normal);
        assert!(diamond_contains(0, 16, tw, th));
        assert!(diamond_contains(63, 16, tw, th));
        assert!(diamond_contains(0, 15, tw, th));
        assert!(!diamond_contains(0, 0, tw, th));
        assert!(!diamond_contains(63, 0, tw, th));
        assert!(diamond_contains(30, 0, tw, th));
        assert!(diamond_contains(33, 0, tw, th));
        assert!(!diamond_contains(29, 0, tw, th));
        assert!(!diamond_contains(34, 0, tw, th));
        assert!(diamond_contains(30, 31, tw, th));
        assert!(!diamond_contains(34, 31, tw, th));
    }

    #[test]
    fn test_diamond_is_symmetric_at_zoom4() {
        let (tw, th) = tile_size(Zoom::X4);
        for y in 0..th {
            for x in 0..tw {
                assert_eq!(diamond_contains(x, y, tw, th), diamond_contains(tw - 1 - x, y, tw, th));
                assert_eq!(diamond_contains(x, y, tw, th), diamond_contains(x, th - 1 - y, tw, th));
            }
        }
    }

    #[test]
    fn test_projection() {
        assert_eq!(tile_position(0, 0, Zoom::Normal), (0, 0));
        assert_eq!(tile_position(1, 0, Zoom::Normal), (32, 16));
        assert_eq!(tile_position(0, 1, Zoom::X2), (-64, 32));
        assert_eq!(tile_position(2, 1, Zoom::X2), (64, 96));
    }

    #[test]
    fn test_projection_at_grid_extremes() {
        let (max, min) = (i64::from(i32::MAX), i64::from(i32::MIN));
        assert_eq!(tile_position(i32::MAX, i32::MIN, Zoom::Normal), ((max - min) * 32, -16));
        assert_eq!(tile_position(i32::MAX, i32::MAX, Zoom::X4), (0, max * 128));
        assert_eq!(tile_position(i32::MIN, i32::MIN, Zoom::Normal), (0, min * 32));
    }

    #[test]
    fn test_ground_cut_masks_corners() {
        let temp = TempDir::new().expect("should create temp dir");
        let sprite = IsoCutSprite::ground("grass", sheet(&temp, 200, 100), (40, 2), 1, 0, Zoom::Normal);
        assert_eq!((sprite.meta().xofs, sprite.meta().yofs), (-31, 0));
        let layers = sprite.layers(&RenderContext::default()).expect("cut should succeed");
        assert_eq!(layers.dimensions(), (64, 32));
        // Middle row, left edge: sheet pixel (40 + 32, 2 + 16 + 16).
        assert_eq!(layers.rgb.get_pixel(0, 16).0, [72, 34, 7]);
        assert_eq!(layers.alpha_at(0, 16), 255);
        assert_eq!(layers.rgb.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(layers.alpha_at(0, 0), 0);
        assert_eq!(layers.alpha_at(63, 0), 0);
    }

    #[test]
    fn test_building_cut_is_rectangular_and_lifted() {
        let temp = TempDir::new().expect("should create temp dir");
        let sprite = IsoCutSprite::building("depot", sheet(&temp, 200, 200), (40, 60), 0, 0, 50, Zoom::Normal);
        assert_eq!(sprite.meta().yofs, -18);
        assert_eq!(sprite.region(), (40, 42, 64, 50));
        let layers = sprite.layers(&RenderContext::default()).expect("cut should succeed");
        assert_eq!(layers.dimensions(), (64, 50));
        assert_eq!(layers.alpha_at(0, 0), 255);
        assert_eq!(layers.rgb.get_pixel(0, 0).0, [40, 42, 7]);
    }

    #[test]
    fn test_out_of_bounds_reports_rectangle() {
        let temp = TempDir::new().expect("should create temp dir");
        let sprite = IsoCutSprite::ground("edge", sheet(&temp, 100, 100), (10, 0), 0, 1, Zoom::Normal);
        match sprite.layers(&RenderContext::default()) {
            Err(SpriteError::OutOfBounds { x, y, w, h, source_size, .. }) => {
                assert_eq!((x, y, w, h), (-22, 16, 64, 32));
                assert_eq!(source_size, (100, 100));
            }
            other => panic!("expected out of bounds, got {:?}", other),
        }
    }
}
