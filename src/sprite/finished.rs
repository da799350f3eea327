//! Finalized sprite data handed to the container encoder

use image::{GrayImage, RgbImage};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use super::{Bpp, RenderContext, Sprite, SpriteError, Zoom};

/// Everything an encoder needs to serialize one sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSprite {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub xofs: i32,
    pub yofs: i32,
    pub zoom: Zoom,
    pub bpp: Bpp,
    pub rgb: RgbImage,
    pub alpha: Option<GrayImage>,
    pub mask: Option<GrayImage>,
    /// Hex SHA-256 of the sprite's canonical description
    pub fingerprint: String,
    /// Source files the pixels come from, sorted and deduplicated
    pub dependencies: Vec<PathBuf>,
}

impl FinishedSprite {
    /// Render a sprite, optionally trimming transparent borders.
    pub fn render(sprite: &dyn Sprite, ctx: &RenderContext, trim: bool) -> Result<Self, SpriteError> {
        let layers = sprite.layers(ctx)?;
        let layers = if trim { layers.trim() } else { layers };

        let mut dependencies = sprite.dependencies();
        dependencies.sort();
        dependencies.dedup();

        let meta = sprite.meta();
        Ok(Self {
            name: meta.name.clone(),
            width: layers.width(),
            height: layers.height(),
            xofs: layers.xofs,
            yofs: layers.yofs,
            zoom: meta.zoom,
            bpp: layers.bpp,
            rgb: layers.rgb,
            alpha: layers.alpha,
            mask: layers.mask,
            fingerprint: fingerprint_digest(&sprite.fingerprint()),
            dependencies,
        })
    }
}

/// Hex SHA-256 of a canonical JSON description.
///
/// `serde_json` keeps object keys sorted, so equal descriptions always hash
/// equally.
pub fn fingerprint_digest(description: &Value) -> String {
    let digest = Sha256::digest(description.to_string().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::{EmptySprite, Layers, SpriteMeta};
    use image::{Luma, Rgb};
    use serde_json::json;

    #[derive(Debug)]
    struct Dot {
        meta: SpriteMeta,
    }

    impl Sprite for Dot {
        fn meta(&self) -> &SpriteMeta {
            &self.meta
        }

        fn layers(&self, _ctx: &RenderContext) -> Result<Layers, SpriteError> {
            let mut layers = Layers::transparent(5, 5).with_offset(self.meta.xofs, self.meta.yofs);
            layers.rgb.put_pixel(2, 3, Rgb([9, 8, 7]));
            if let Some(alpha) = layers.alpha.as_mut() {
                alpha.put_pixel(2, 3, Luma([255]));
            }
            Ok(layers)
        }

        fn dependencies(&self) -> Vec<PathBuf> {
            vec![PathBuf::from("b.png"), PathBuf::from("a.png"), PathBuf::from("b.png")]
        }
    }

    #[test]
    fn test_render_trimmed() {
        let dot = Dot { meta: SpriteMeta::new("dot", 5, 5, Zoom::X2).with_offset(-2, -2) };
        let finished = FinishedSprite::render(&dot, &RenderContext::default(), true).unwrap();
        assert_eq!((finished.width, finished.height), (1, 1));
        assert_eq!((finished.xofs, finished.yofs), (0, 1));
        assert_eq!(finished.zoom, Zoom::X2);
        assert_eq!(finished.dependencies, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(finished.fingerprint.len(), 64);
    }

    #[test]
    fn test_render_untrimmed_keeps_size() {
        let dot = Dot { meta: SpriteMeta::new("dot", 5, 5, Zoom::Normal) };
        let finished = FinishedSprite::render(&dot, &RenderContext::default(), false).unwrap();
        assert_eq!((finished.width, finished.height), (5, 5));
    }

    #[test]
    fn test_fingerprint_depends_on_description() {
        let a = EmptySprite::new("a", 4, 4, Zoom::Normal);
        let b = EmptySprite::new("a", 4, 4, Zoom::X2);
        assert_eq!(fingerprint_digest(&a.fingerprint()), fingerprint_digest(&a.fingerprint()));
        assert_ne!(fingerprint_digest(&a.fingerprint()), fingerprint_digest(&b.fingerprint()));
        assert_eq!(
            fingerprint_digest(&json!({"b": 1, "a": 2})),
            fingerprint_digest(&json!({"a": 2, "b": 1}))
        );
    }
}
