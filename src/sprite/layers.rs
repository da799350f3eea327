//! Decoded pixel planes of a sprite

use image::{imageops, DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

use super::Bpp;

/// The three pixel planes a sprite produces, plus its effective placement.
///
/// `alpha` is `None` for fully opaque 24-bit data and `mask` is `None` when
/// the sprite carries no recolour indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Layers {
    pub xofs: i32,
    pub yofs: i32,
    pub bpp: Bpp,
    pub rgb: RgbImage,
    pub alpha: Option<GrayImage>,
    pub mask: Option<GrayImage>,
}

impl Layers {
    /// Opaque 24-bit planes.
    pub fn opaque(rgb: RgbImage) -> Self {
        Self { xofs: 0, yofs: 0, bpp: Bpp::Bpp24, rgb, alpha: None, mask: None }
    }

    /// Fully transparent 32-bit planes.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            xofs: 0,
            yofs: 0,
            bpp: Bpp::Bpp32,
            rgb: RgbImage::new(width, height),
            alpha: Some(GrayImage::new(width, height)),
            mask: None,
        }
    }

    /// Split an RGBA image into RGB and alpha planes.
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let mut rgb = RgbImage::new(width, height);
        let mut alpha = GrayImage::new(width, height);
        for (x, y, px) in image.enumerate_pixels() {
            rgb.put_pixel(x, y, Rgb([px[0], px[1], px[2]]));
            alpha.put_pixel(x, y, Luma([px[3]]));
        }
        Self { xofs: 0, yofs: 0, bpp: Bpp::Bpp32, rgb, alpha: Some(alpha), mask: None }
    }

    /// Convert a decoded image: RGB stays 24-bit, everything else becomes
    /// 32-bit RGBA.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(rgb) => Self::opaque(rgb),
            DynamicImage::ImageRgba8(rgba) => Self::from_rgba(&rgba),
            other => Self::from_rgba(&other.to_rgba8()),
        }
    }

    pub fn with_offset(mut self, xofs: i32, yofs: i32) -> Self {
        self.xofs = xofs;
        self.yofs = yofs;
        self
    }

    pub fn with_mask(mut self, mask: GrayImage) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    /// Alpha at a pixel; 255 when there is no alpha plane.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.alpha.as_ref().map_or(255, |a| a.get_pixel(x, y)[0])
    }

    /// Recolour index at a pixel; 0 when there is no mask plane.
    pub fn mask_at(&self, x: u32, y: u32) -> u8 {
        self.mask.as_ref().map_or(0, |m| m.get_pixel(x, y)[0])
    }

    /// True when the planes contribute nothing: every pixel is transparent
    /// and no recolour index is set.
    pub fn is_blank(&self) -> bool {
        let transparent = match &self.alpha {
            Some(alpha) => alpha.pixels().all(|p| p[0] == 0),
            None => false,
        };
        let unmasked = match &self.mask {
            Some(mask) => mask.pixels().all(|p| p[0] == 0),
            None => true,
        };
        transparent && unmasked
    }

    /// Cut a region out of every plane. The region must lie inside the planes.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            xofs: self.xofs,
            yofs: self.yofs,
            bpp: self.bpp,
            rgb: imageops::crop_imm(&self.rgb, x, y, width, height).to_image(),
            alpha: self.alpha.as_ref().map(|a| imageops::crop_imm(a, x, y, width, height).to_image()),
            mask: self.mask.as_ref().map(|m| imageops::crop_imm(m, x, y, width, height).to_image()),
        }
    }

    /// Make pixels exactly matching `key` transparent, creating an alpha
    /// plane if the data was opaque.
    pub fn apply_colourkey(&mut self, key: [u8; 3]) {
        let (width, height) = self.dimensions();
        let alpha = self.alpha.get_or_insert_with(|| GrayImage::from_pixel(width, height, Luma([255])));
        for (x, y, px) in self.rgb.enumerate_pixels() {
            if px.0 == key {
                alpha.put_pixel(x, y, Luma([0]));
            }
        }
        self.bpp = Bpp::Bpp32;
    }

    /// Crop fully transparent borders, moving the offsets so the visible
    /// pixels stay in place. Pixels carrying a recolour index count as
    /// visible. A sprite with no visible pixel shrinks to 1x1.
    pub fn trim(self) -> Self {
        let Some(alpha) = &self.alpha else {
            return self;
        };
        let (width, height) = self.dimensions();
        let visible = |x: u32, y: u32| alpha.get_pixel(x, y)[0] != 0 || self.mask_at(x, y) != 0;

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..height {
            for x in 0..width {
                if visible(x, y) {
                    bounds = Some(match bounds {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }

        let (x0, y0, x1, y1) = bounds.unwrap_or((0, 0, 0, 0));
        if (x0, y0, x1, y1) == (0, 0, width.saturating_sub(1), height.saturating_sub(1)) {
            return self;
        }
        let mut trimmed = self.crop(x0, y0, x1 - x0 + 1, y1 - y0 + 1);
        trimmed.xofs += x0 as i32;
        trimmed.yofs += y0 as i32;
        trimmed
    }

    /// Flatten RGB and alpha into a single RGBA image.
    pub fn to_rgba(&self) -> RgbaImage {
        let (width, height) = self.dimensions();
        RgbaImage::from_fn(width, height, |x, y| {
            let px = self.rgb.get_pixel(x, y);
            Rgba([px[0], px[1], px[2], self.alpha_at(x, y)])
        })
    }
}
