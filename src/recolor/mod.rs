//! Recolour-mask extraction from placeholder-coloured artwork
//!
//! Artists paint recolourable areas in a reserved magenta-like gamut. These
//! marker pixels are turned into a brightness value in the RGB plane and a
//! palette index in the mask plane, which the engine remaps at runtime
//! (company colours, structure colours, light cycles).
//!
//! Legitimate artwork colours inside the reserved gamut are classified as
//! markers too; the gamut is reserved for that reason.

mod order;
mod palette;
mod tables;

pub use order::{LightOrderSprite, LIGHT_PHASE_BASE};
pub use palette::{Palette, PaletteError, PaletteMaskSprite};

use image::{GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::sprite::{Layers, RenderContext, Sprite, SpriteError, SpriteMeta, SpriteRef};

/// True if the pixel belongs to the reserved marker gamut.
///
/// A marker has equal red and blue, and either full red with green below
/// 255, or zero green with non-zero red.
pub fn is_marker(px: [u8; 3]) -> bool {
    let [r, g, b] = px;
    r == b && ((r == 255 && g != 255) || (g == 0 && r != 0))
}

/// Per-pixel marker classification of an RGB plane.
pub fn marker_plane(rgb: &RgbImage) -> Vec<bool> {
    rgb.pixels().map(|p| is_marker(p.0)).collect()
}

/// Encoded marker value: red plus green, 0..=510.
pub fn marker_value(px: [u8; 3]) -> usize {
    usize::from(px[0]) + usize::from(px[1])
}

/// Which runtime recolour table a sprite's markers map into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecolorScheme {
    /// Player company colour
    #[default]
    CompanyColour,
    /// Structure (material) colour
    Structure,
    /// Company colour with the house brightness curve
    HouseCompanyColour,
}

impl RecolorScheme {
    /// First palette index of the remap range.
    pub fn base_index(self) -> u8 {
        match self {
            RecolorScheme::CompanyColour | RecolorScheme::HouseCompanyColour => 0xC6,
            RecolorScheme::Structure => 0x46,
        }
    }

    /// Replacement brightness for a marker value.
    pub fn brightness(self, value: usize) -> u8 {
        match self {
            RecolorScheme::HouseCompanyColour => tables::HOUSE_BRIGHTNESS[value],
            _ => tables::BRIGHTNESS[value],
        }
    }

    /// Mask index for a marker value.
    pub fn index(self, value: usize) -> u8 {
        let offset = match self {
            RecolorScheme::HouseCompanyColour => tables::HOUSE_INDEX_OFFSET[value],
            _ => tables::INDEX_OFFSET[value],
        };
        self.base_index() + offset
    }
}

/// Replace marker pixels by brightness + palette index.
///
/// Marker pixels get the scheme's brightness in the red channel with green
/// and blue cleared, and the scheme's index in the mask plane. Every other
/// pixel keeps its colour and gets index 0. Alpha is left alone.
pub fn extract_markers(name: &str, layers: Layers, scheme: RecolorScheme) -> Result<Layers, SpriteError> {
    if !layers.bpp.has_rgb() {
        return Err(SpriteError::UnsupportedFormat { sprite: name.to_string(), bpp: layers.bpp });
    }

    let Layers { xofs, yofs, bpp, mut rgb, alpha, .. } = layers;
    let (width, height) = rgb.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (x, y, px) in rgb.enumerate_pixels_mut() {
        if is_marker(px.0) {
            let value = marker_value(px.0);
            *px = Rgb([scheme.brightness(value), 0, 0]);
            mask.put_pixel(x, y, Luma([scheme.index(value)]));
        }
    }

    Ok(Layers { xofs, yofs, bpp, rgb, alpha, mask: Some(mask) })
}

/// Check that a control bitmap matches its sprite's size.
pub(crate) fn check_same_size(
    sprite: &str,
    layers: &Layers,
    control: &str,
    control_layers: &Layers,
) -> Result<(), SpriteError> {
    if layers.dimensions() != control_layers.dimensions() {
        return Err(SpriteError::SizeMismatch {
            base: sprite.to_string(),
            layer: control.to_string(),
            expected: layers.dimensions(),
            found: control_layers.dimensions(),
        });
    }
    Ok(())
}

/// A sprite whose marker pixels are turned into company or structure colour
/// indices.
#[derive(Debug, Clone)]
pub struct CompanyColourSprite {
    inner: SpriteRef,
    scheme: RecolorScheme,
}

impl CompanyColourSprite {
    pub fn new(inner: SpriteRef, scheme: RecolorScheme) -> Self {
        Self { inner, scheme }
    }

    pub fn company_colour(inner: SpriteRef) -> Self {
        Self::new(inner, RecolorScheme::CompanyColour)
    }

    pub fn scheme(&self) -> RecolorScheme {
        self.scheme
    }
}

impl Sprite for CompanyColourSprite {
    fn meta(&self) -> &SpriteMeta {
        self.inner.meta()
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        let layers = self.inner.layers(ctx)?;
        extract_markers(self.inner.name(), layers, self.scheme)
    }

    fn fingerprint(&self) -> Value {
        json!({ "class": "CompanyColourSprite", "scheme": self.scheme, "sprite": self.inner.fingerprint() })
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        self.inner.dependencies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Bpp;
    use image::{Rgba, RgbaImage};

    fn solid(px: [u8; 3]) -> Layers {
        Layers::opaque(RgbImage::from_pixel(2, 2, Rgb(px)))
    }

    #[test]
    fn test_marker_detection() {
        assert!(is_marker([255, 0, 255]));
        assert!(is_marker([255, 128, 255]));
        assert!(is_marker([80, 0, 80]));
        assert!(!is_marker([255, 255, 255]));
        assert!(!is_marker([0, 0, 0]));
        assert!(!is_marker([80, 10, 80]));
        assert!(!is_marker([255, 0, 254]));
    }

    #[test]
    fn test_company_colour_scenario() {
        let out = extract_markers("cc", solid([255, 0, 255]), RecolorScheme::CompanyColour).unwrap();
        let mask = out.mask.as_ref().unwrap();
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(out.rgb.get_pixel(x, y).0, [tables::BRIGHTNESS[255], 0, 0]);
                assert_eq!(mask.get_pixel(x, y)[0], 0xC6 + tables::INDEX_OFFSET[255]);
            }
        }
        assert_eq!(out.rgb.get_pixel(0, 0).0, [125, 0, 0]);
        assert_eq!(mask.get_pixel(0, 0)[0], 0xCA);
    }

    #[test]
    fn test_structure_scheme_uses_own_base() {
        let out = extract_markers("st", solid([255, 255 - 45, 255]), RecolorScheme::Structure).unwrap();
        let value = 255 + 210;
        assert_eq!(out.mask_at(1, 1), 0x46 + tables::INDEX_OFFSET[value]);
    }

    #[test]
    fn test_house_scheme_differs_at_high_values() {
        let value = 440;
        assert_ne!(
            RecolorScheme::HouseCompanyColour.brightness(value),
            RecolorScheme::CompanyColour.brightness(value)
        );
        assert_eq!(RecolorScheme::HouseCompanyColour.base_index(), 0xC6);
    }

    #[test]
    fn test_marker_free_is_pure_and_idempotent() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(0, 0, Rgba([10, 200, 30, 255]));
        img.put_pixel(2, 1, Rgba([255, 255, 255, 90]));
        let input = Layers::from_rgba(&img);

        let once = extract_markers("art", input.clone(), RecolorScheme::CompanyColour).unwrap();
        let again = extract_markers("art", input.clone(), RecolorScheme::CompanyColour).unwrap();
        let twice = extract_markers("art", once.clone(), RecolorScheme::CompanyColour).unwrap();
        assert_eq!(once, again);
        assert_eq!(once, twice);
        assert_eq!(once.rgb, input.rgb);
        assert_eq!(once.alpha, input.alpha);
        assert!(once.mask.unwrap().pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_alpha_is_untouched() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 255, 77]));
        let out = extract_markers("a", Layers::from_rgba(&img), RecolorScheme::CompanyColour).unwrap();
        assert_eq!(out.alpha_at(0, 0), 77);
    }

    #[test]
    fn test_rejects_paletted_data() {
        let mut layers = solid([255, 0, 255]);
        layers.bpp = Bpp::Bpp8;
        let err = extract_markers("pal", layers, RecolorScheme::CompanyColour).unwrap_err();
        assert!(matches!(err, SpriteError::UnsupportedFormat { bpp: Bpp::Bpp8, .. }));
    }
}
