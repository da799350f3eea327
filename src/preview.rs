//! Recolour previews of finished sprites
//!
//! Renders sprites the way the engine would show them after remapping their
//! recolour indices, one row (or column) per recolour map. Used to eyeball
//! company colour and light-cycle masks.

use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::recolor::{Palette, RecolorScheme, LIGHT_PHASE_BASE};
use crate::sprite::FinishedSprite;

/// Gap between sprites and around the preview.
pub const PADDING: u32 = 10;

/// Lamp colour of the active light-cycle phase.
pub const LIGHT_ON: [u8; 3] = [240, 208, 0];
/// Lamp colour of inactive light-cycle phases.
pub const LIGHT_OFF: [u8; 3] = [0, 0, 0];

/// Recolour index to replacement colour.
pub type Recolour = BTreeMap<u8, [u8; 3]>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreviewError {
    /// Sprite carries no recolour index plane
    #[error("Sprite '{0}' has no mask")]
    NoMask(String),
    /// Nothing to draw
    #[error("Preview needs at least one sprite and one recolour map")]
    Empty,
}

/// Engine brightness adjustment: scale `colour` by `brightness / 128`.
///
/// Channels pushed over 255 spill half of their excess into the other
/// channels, so overbright colours drift toward white.
pub fn adjust_brightness(colour: [u8; 3], brightness: u8) -> [u8; 3] {
    if brightness == 128 {
        return colour;
    }

    let [r, g, b] = colour.map(u64::from);
    let combined = ((r << 32) | (g << 16) | b) * u64::from(brightness);

    let r = ((combined >> 39) & 0x1ff) as u32;
    let g = ((combined >> 23) & 0x1ff) as u32;
    let b = ((combined >> 7) & 0x1ff) as u32;

    if combined & 0x8000_8000_8000 == 0 {
        return [r as u8, g as u8, b as u8];
    }

    let overbright = [r, g, b].iter().map(|&c| c.saturating_sub(255)).sum::<u32>() / 2;
    let spill = |c: u32| -> u8 {
        if c >= 255 {
            255
        } else {
            (c + overbright * (255 - c) / 256).min(255) as u8
        }
    };
    [spill(r), spill(g), spill(b)]
}

/// The four light-cycle phases, each with one lamp on.
///
/// The cycle runs from the dimmest phase to the brightest.
pub fn light_cycle_recolours() -> Vec<Recolour> {
    (0..4u8)
        .rev()
        .map(|on| {
            (0..4u8)
                .map(|phase| (LIGHT_PHASE_BASE + phase, if phase == on { LIGHT_ON } else { LIGHT_OFF }))
                .collect()
        })
        .collect()
}

/// Company colour remap: the eight recolour indices take the palette
/// colours of `ramp`.
pub fn company_colour_recolour(palette: &Palette, ramp: &[u8; 8]) -> Recolour {
    let base = RecolorScheme::CompanyColour.base_index();
    ramp.iter().enumerate().map(|(i, &index)| (base + i as u8, palette.colour(index))).collect()
}

/// Draw every sprite once per recolour map.
///
/// Maps run down the preview with sprites left to right; `horizontal` swaps
/// the two. Recoloured pixels take the mapped colour at the pixel's own
/// brightness (its brightest channel).
pub fn recolour_preview(
    sprites: &[FinishedSprite],
    recolours: &[Recolour],
    horizontal: bool,
) -> Result<RgbaImage, PreviewError> {
    if sprites.is_empty() || recolours.is_empty() {
        return Err(PreviewError::Empty);
    }
    if let Some(s) = sprites.iter().find(|s| s.mask.is_none()) {
        return Err(PreviewError::NoMask(s.name.clone()));
    }

    // Sprites stack along one axis; recolour copies repeat along the other
    // at a stride of the largest sprite.
    let along_size = |s: &FinishedSprite| if horizontal { s.height } else { s.width };
    let across_size = |s: &FinishedSprite| if horizontal { s.width } else { s.height };
    let stride = sprites.iter().map(across_size).max().unwrap_or(0) + PADDING;
    let along_total = PADDING + sprites.iter().map(|s| along_size(s) + PADDING).sum::<u32>();
    let across_total = PADDING + recolours.len() as u32 * stride;
    let (width, height) = if horizontal { (across_total, along_total) } else { (along_total, across_total) };

    let mut out = RgbaImage::new(width, height);
    for (copy, recolour) in recolours.iter().enumerate() {
        let across = PADDING + copy as u32 * stride;
        let mut along = PADDING;
        for sprite in sprites {
            let (x0, y0) = if horizontal { (across, along) } else { (along, across) };
            draw_recoloured(&mut out, sprite, recolour, x0, y0);
            along += along_size(sprite) + PADDING;
        }
    }
    Ok(out)
}

fn draw_recoloured(out: &mut RgbaImage, sprite: &FinishedSprite, recolour: &Recolour, x0: u32, y0: u32) {
    for (x, y, px) in sprite.rgb.enumerate_pixels() {
        let index = sprite.mask.as_ref().map_or(0, |m| m.get_pixel(x, y)[0]);
        let rgb = match recolour.get(&index) {
            Some(&colour) => adjust_brightness(colour, px.0.iter().copied().max().unwrap_or(0)),
            None => px.0,
        };
        let alpha = sprite.alpha.as_ref().map_or(255, |a| a.get_pixel(x, y)[0]);
        out.put_pixel(x0 + x, y0 + y, Rgba([rgb[0], rgb[1], rgb[2], alpha]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::{Bpp, Zoom};
    use image::{GrayImage, Rgb, RgbImage};
    use std::path::PathBuf;

    fn finished(name: &str, w: u32, h: u32, mask: Option<GrayImage>) -> FinishedSprite {
        FinishedSprite {
            name: name.to_string(),
            width: w,
            height: h,
            xofs: 0,
            yofs: 0,
            zoom: Zoom::Normal,
            bpp: Bpp::Bpp24,
            rgb: RgbImage::from_pixel(w, h, Rgb([128, 0, 0])),
            alpha: None,
            mask,
            fingerprint: String::new(),
            dependencies: Vec::<PathBuf>::new(),
        }
    }

    #[test]
    fn test_adjust_brightness() {
        assert_eq!(adjust_brightness([10, 20, 30], 128), [10, 20, 30]);
        assert_eq!(adjust_brightness([100, 50, 0], 64), [50, 25, 0]);
        assert_eq!(adjust_brightness([100, 50, 0], 0), [0, 0, 0]);
        assert_eq!(adjust_brightness([100, 50, 0], 255), [199, 99, 0]);
        // Red reaches 478: half of the 223 excess spills into green and blue.
        assert_eq!(adjust_brightness([240, 100, 0], 255), [255, 223, 110]);
    }

    #[test]
    fn test_light_cycle_maps() {
        let maps = light_cycle_recolours();
        assert_eq!(maps.len(), 4);
        assert_eq!(maps[0][&0xF4], LIGHT_ON);
        assert_eq!(maps[0][&0xF1], LIGHT_OFF);
        assert_eq!(maps[3][&0xF1], LIGHT_ON);
        assert!(maps.iter().all(|m| m.values().filter(|&&c| c == LIGHT_ON).count() == 1));
    }

    #[test]
    fn test_company_colour_recolour() {
        let palette = Palette::new((0..=255u8).map(|v| [v, 0, 0]).collect()).unwrap();
        let map = company_colour_recolour(&palette, &[10, 11, 12, 13, 14, 15, 16, 17]);
        assert_eq!(map.len(), 8);
        assert_eq!(map[&0xC6], [10, 0, 0]);
        assert_eq!(map[&0xCD], [17, 0, 0]);
    }

    #[test]
    fn test_preview_layout_and_recolour() {
        let mask = GrayImage::from_raw(2, 1, vec![0xF1, 0]).unwrap();
        let sprites = vec![finished("lamp", 2, 1, Some(mask)), finished("pole", 3, 4, Some(GrayImage::new(3, 4)))];
        let maps = light_cycle_recolours();

        let vertical = recolour_preview(&sprites, &maps, false).unwrap();
        assert_eq!(vertical.dimensions(), (10 + 2 + 10 + 3 + 10, 10 + 4 * (4 + 10)));
        // Last map has phase 0xF1 on, scaled by the pixel's brightness 128.
        let last_row = 10 + 3 * 14;
        assert_eq!(vertical.get_pixel(10, last_row).0, [240, 208, 0, 255]);
        assert_eq!(vertical.get_pixel(11, last_row).0, [128, 0, 0, 255]);
        assert_eq!(vertical.get_pixel(10, 10).0, [0, 0, 0, 255]);
        assert_eq!(vertical.get_pixel(0, 0).0, [0, 0, 0, 0]);

        let horizontal = recolour_preview(&sprites, &maps, true).unwrap();
        assert_eq!(horizontal.dimensions(), (10 + 4 * (3 + 10), 10 + 1 + 10 + 4 + 10));
    }

    #[test]
    fn test_preview_requires_mask() {
        let sprites = vec![finished("plain", 1, 1, None)];
        match recolour_preview(&sprites, &light_cycle_recolours(), false) {
            Err(PreviewError::NoMask(name)) => assert_eq!(name, "plain"),
            other => panic!("expected missing mask, got {:?}", other.map(|i| i.dimensions())),
        }
        assert!(matches!(recolour_preview(&[], &light_cycle_recolours(), false), Err(PreviewError::Empty)));
    }
}
