//! Composition - stacking same-sized sprite layers back to front

mod blend;

use serde_json::{json, Value};
use std::path::PathBuf;

use crate::sprite::{Layers, RenderContext, Sprite, SpriteError, SpriteMeta, SpriteRef};

/// Merge layers back to front into one set of planes.
///
/// Every input must have the size of the first one. Layers that contribute
/// nothing (fully transparent, no recolour index) are skipped, so an empty
/// layer is an identity. Output offsets are those of the first input.
///
/// With a `colourkey`, merged pixels of exactly that colour become
/// transparent.
pub fn compose_layers(
    name: &str,
    inputs: &[(String, Layers)],
    colourkey: Option<[u8; 3]>,
) -> Result<Layers, SpriteError> {
    let Some((base_name, base)) = inputs.first() else {
        return Err(SpriteError::EmptyComposite(name.to_string()));
    };

    for (layer_name, layer) in &inputs[1..] {
        if layer.dimensions() != base.dimensions() {
            return Err(SpriteError::SizeMismatch {
                base: base_name.clone(),
                layer: layer_name.clone(),
                expected: base.dimensions(),
                found: layer.dimensions(),
            });
        }
    }

    let mut contributing = inputs.iter().map(|(_, l)| l).filter(|l| !l.is_blank());
    let mut acc = match contributing.next() {
        Some(first) => first.clone(),
        None => base.clone(),
    };
    for layer in contributing {
        blend::merge_onto(&mut acc, layer);
    }
    acc.xofs = base.xofs;
    acc.yofs = base.yofs;

    if let Some(key) = colourkey {
        acc.apply_colourkey(key);
    }
    Ok(acc)
}

/// Several sprites of the same size and zoom drawn on top of each other.
#[derive(Debug, Clone)]
pub struct CompositeSprite {
    meta: SpriteMeta,
    sprites: Vec<SpriteRef>,
    colourkey: Option<[u8; 3]>,
}

impl CompositeSprite {
    /// Stack `sprites`, the first one at the bottom.
    ///
    /// Size and offsets are taken from the bottom sprite.
    pub fn new(name: impl Into<String>, sprites: Vec<SpriteRef>) -> Result<Self, SpriteError> {
        let name = name.into();
        let Some(base) = sprites.first() else {
            return Err(SpriteError::EmptyComposite(name));
        };
        if sprites.iter().any(|s| s.zoom() != base.zoom()) {
            return Err(SpriteError::ZoomMismatch {
                sprite: name,
                layers: sprites.iter().map(|s| (s.name().to_string(), s.zoom())).collect(),
            });
        }

        let meta = SpriteMeta { name, ..base.meta().clone() };
        Ok(Self { meta, sprites, colourkey: None })
    }

    pub fn with_colourkey(mut self, colourkey: [u8; 3]) -> Self {
        self.colourkey = Some(colourkey);
        self
    }

    pub fn sprites(&self) -> &[SpriteRef] {
        &self.sprites
    }
}

impl Sprite for CompositeSprite {
    fn meta(&self) -> &SpriteMeta {
        &self.meta
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        let inputs = self
            .sprites
            .iter()
            .map(|s| Ok((s.name().to_string(), s.layers(ctx)?)))
            .collect::<Result<Vec<_>, SpriteError>>()?;
        let mut layers = compose_layers(&self.meta.name, &inputs, self.colourkey)?;
        layers.xofs = self.meta.xofs;
        layers.yofs = self.meta.yofs;
        Ok(layers)
    }

    fn fingerprint(&self) -> Value {
        json!({
            "class": "CompositeSprite",
            "sprites": self.sprites.iter().map(|s| s.fingerprint()).collect::<Vec<_>>(),
            "colourkey": self.colourkey,
        })
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        self.sprites.iter().flat_map(|s| s.dependencies()).collect()
    }
}
