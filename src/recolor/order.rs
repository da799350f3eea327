//! Light-cycle phase extraction driven by an ordering bitmap

use image::GrayImage;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{check_same_size, is_marker};
use crate::sprite::{Layers, RenderContext, Sprite, SpriteError, SpriteMeta, SpriteRef};

/// Mask index of the brightest light phase; the others follow it.
pub const LIGHT_PHASE_BASE: u8 = 0xF1;

const PHASE_COUNT: usize = 4;

/// Marker pixels become light-cycle phases.
///
/// The `order` sprite paints each marker pixel of `sprite` with one of four
/// colours. The brightest colour is phase 0 and maps to [`LIGHT_PHASE_BASE`];
/// the RGB plane is kept as is.
#[derive(Debug, Clone)]
pub struct LightOrderSprite {
    sprite: SpriteRef,
    order: SpriteRef,
}

impl LightOrderSprite {
    pub fn new(sprite: SpriteRef, order: SpriteRef) -> Self {
        Self { sprite, order }
    }
}

/// The four ordering colours, brightest first.
///
/// Brightness is the channel sum; equal sums fall back to the colour value.
fn ranked_colours(control: &str, order: &Layers) -> Result<Vec<[u8; 3]>, SpriteError> {
    let colours: BTreeSet<[u8; 3]> = order
        .rgb
        .enumerate_pixels()
        .filter(|(x, y, _)| order.alpha_at(*x, *y) > 0)
        .map(|(_, _, px)| px.0)
        .collect();

    if colours.len() != PHASE_COUNT {
        return Err(SpriteError::ColourCountError {
            control: control.to_string(),
            expected: PHASE_COUNT,
            found: colours.len(),
        });
    }

    let mut ranked: Vec<[u8; 3]> = colours.into_iter().collect();
    ranked.sort_by_key(|c| std::cmp::Reverse(c.iter().map(|&v| u32::from(v)).sum::<u32>()));
    Ok(ranked)
}

impl Sprite for LightOrderSprite {
    fn meta(&self) -> &SpriteMeta {
        self.sprite.meta()
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        let layers = self.sprite.layers(ctx)?;
        if !layers.bpp.has_rgb() {
            return Err(SpriteError::UnsupportedFormat { sprite: self.sprite.name().to_string(), bpp: layers.bpp });
        }
        let order = self.order.layers(ctx)?;
        check_same_size(self.sprite.name(), &layers, self.order.name(), &order)?;

        let ranked = ranked_colours(self.order.name(), &order)?;

        let (width, height) = layers.dimensions();
        let mut mask = GrayImage::new(width, height);
        let mut missing = 0usize;
        for (x, y, px) in layers.rgb.enumerate_pixels() {
            if !is_marker(px.0) {
                continue;
            }
            if order.alpha_at(x, y) == 0 {
                missing += 1;
                continue;
            }
            let colour = order.rgb.get_pixel(x, y).0;
            // Every covered pixel carries one of the ranked colours.
            if let Some(rank) = ranked.iter().position(|c| *c == colour) {
                mask.get_pixel_mut(x, y)[0] = LIGHT_PHASE_BASE + rank as u8;
            }
        }

        if missing > 0 {
            return Err(SpriteError::OrderMismatch {
                sprite: self.sprite.name().to_string(),
                control: self.order.name().to_string(),
                missing,
            });
        }

        Ok(layers.with_mask(mask))
    }

    fn fingerprint(&self) -> Value {
        json!({
            "class": "LightOrderSprite",
            "sprite": self.sprite.fingerprint(),
            "order": self.order.fingerprint(),
        })
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        let mut deps = self.sprite.dependencies();
        deps.extend(self.order.dependencies());
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Zoom;
    use image::{Rgba, RgbaImage};
    use std::rc::Rc;

    #[derive(Debug)]
    struct Fixed {
        meta: SpriteMeta,
        layers: Layers,
    }

    fn fixed(name: &str, img: RgbaImage) -> SpriteRef {
        let meta = SpriteMeta::new(name, img.width(), img.height(), Zoom::Normal);
        Rc::new(Fixed { meta, layers: Layers::from_rgba(&img) })
    }

    impl Sprite for Fixed {
        fn meta(&self) -> &SpriteMeta {
            &self.meta
        }

        fn layers(&self, _ctx: &RenderContext) -> Result<Layers, SpriteError> {
            Ok(self.layers.clone())
        }
    }

    const MAGENTA: Rgba<u8> = Rgba([255, 0, 255, 255]);

    fn lamp_row() -> SpriteRef {
        let mut img = RgbaImage::from_pixel(5, 1, MAGENTA);
        img.put_pixel(4, 0, Rgba([20, 20, 20, 255]));
        fixed("lamps", img)
    }

    fn order_row(colours: &[[u8; 3]]) -> SpriteRef {
        let mut img = RgbaImage::new(5, 1);
        for (x, c) in colours.iter().enumerate() {
            img.put_pixel(x as u32, 0, Rgba([c[0], c[1], c[2], 255]));
        }
        fixed("lamps_order", img)
    }

    #[test]
    fn test_phases_ranked_by_brightness() {
        let order = order_row(&[[10, 10, 10], [250, 250, 250], [100, 0, 0], [0, 200, 0]]);
        let sprite = LightOrderSprite::new(lamp_row(), order);
        let layers = sprite.layers(&RenderContext::default()).unwrap();
        let phases: Vec<u8> = (0..5).map(|x| layers.mask_at(x, 0)).collect();
        assert_eq!(phases, vec![0xF4, 0xF1, 0xF3, 0xF2, 0]);
        // RGB is not grayed.
        assert_eq!(layers.rgb.get_pixel(0, 0).0, [255, 0, 255]);
    }

    #[test]
    fn test_equal_brightness_tie_broken_by_colour() {
        let order = order_row(&[[0, 0, 90], [90, 0, 0], [0, 90, 0], [1, 1, 1]]);
        let layers = LightOrderSprite::new(lamp_row(), order).layers(&RenderContext::default()).unwrap();
        assert_eq!(layers.mask_at(0, 0), 0xF1);
        assert_eq!(layers.mask_at(2, 0), 0xF2);
        assert_eq!(layers.mask_at(1, 0), 0xF3);
        assert_eq!(layers.mask_at(3, 0), 0xF4);
    }

    #[test]
    fn test_wrong_colour_count() {
        let order = order_row(&[[10, 10, 10], [250, 250, 250], [10, 10, 10], [250, 250, 250]]);
        let err = LightOrderSprite::new(lamp_row(), order).layers(&RenderContext::default()).unwrap_err();
        assert!(matches!(err, SpriteError::ColourCountError { expected: 4, found: 2, .. }));
    }

    #[test]
    fn test_uncovered_marker() {
        let mut img = RgbaImage::new(5, 1);
        for (x, v) in [10u8, 60, 110, 160].iter().enumerate() {
            img.put_pixel(x as u32 + 1, 0, Rgba([*v, *v, *v, 255]));
        }
        let err = LightOrderSprite::new(lamp_row(), fixed("o", img)).layers(&RenderContext::default()).unwrap_err();
        assert!(matches!(err, SpriteError::OrderMismatch { missing: 1, .. }));
    }

    #[test]
    fn test_size_mismatch() {
        let order = fixed("small", RgbaImage::new(2, 1));
        let err = LightOrderSprite::new(lamp_row(), order).layers(&RenderContext::default()).unwrap_err();
        assert!(matches!(err, SpriteError::SizeMismatch { .. }));
    }
}
