//! Zoom alternatives of one logical sprite

use serde_json::{json, Value};
use std::rc::Rc;

use super::{shift, SpriteError, SpriteRef, Zoom};

/// The same logical tile rendered at several zoom levels.
///
/// Holds at most one sprite per zoom level, kept sorted by zoom.
#[derive(Debug, Clone)]
pub struct AlternativeSprites {
    sprites: Vec<SpriteRef>,
}

impl AlternativeSprites {
    /// Group sprites, rejecting two sprites for the same zoom level.
    pub fn new(sprites: Vec<SpriteRef>) -> Result<Self, SpriteError> {
        let mut sorted = sprites;
        sorted.sort_by_key(|s| s.zoom());
        for pair in sorted.windows(2) {
            if pair[0].zoom() == pair[1].zoom() {
                return Err(SpriteError::DuplicateZoom {
                    zoom: pair[0].zoom(),
                    first: pair[0].name().to_string(),
                    second: pair[1].name().to_string(),
                });
            }
        }
        Ok(Self { sprites: sorted })
    }

    pub fn sprites(&self) -> &[SpriteRef] {
        &self.sprites
    }

    pub fn get(&self, zoom: Zoom) -> Option<&SpriteRef> {
        self.sprites.iter().find(|s| s.zoom() == zoom)
    }

    pub fn zooms(&self) -> Vec<Zoom> {
        self.sprites.iter().map(|s| s.zoom()).collect()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// What a replacement slot holds: one sprite or its zoom alternatives.
#[derive(Debug, Clone)]
pub enum SlotSprite {
    Single(SpriteRef),
    Alternatives(AlternativeSprites),
}

impl SlotSprite {
    /// Every sprite in the slot, lowest zoom first.
    pub fn sprites(&self) -> Vec<SpriteRef> {
        match self {
            SlotSprite::Single(sprite) => vec![Rc::clone(sprite)],
            SlotSprite::Alternatives(alts) => alts.sprites().to_vec(),
        }
    }

    /// Collapse a group of one into a plain sprite.
    pub fn from_alternatives(alts: AlternativeSprites) -> Self {
        if alts.len() == 1 {
            SlotSprite::Single(Rc::clone(&alts.sprites()[0]))
        } else {
            SlotSprite::Alternatives(alts)
        }
    }

    pub fn fingerprint(&self) -> Value {
        match self {
            SlotSprite::Single(sprite) => sprite.fingerprint(),
            SlotSprite::Alternatives(alts) => json!({
                "class": "AlternativeSprites",
                "sprites": alts.sprites().iter().map(|s| s.fingerprint()).collect::<Vec<_>>(),
            }),
        }
    }
}

impl From<SpriteRef> for SlotSprite {
    fn from(sprite: SpriteRef) -> Self {
        SlotSprite::Single(sprite)
    }
}

impl From<AlternativeSprites> for SlotSprite {
    fn from(alts: AlternativeSprites) -> Self {
        SlotSprite::Alternatives(alts)
    }
}

/// Zip the outputs of one template run at two zoom levels into alternatives.
pub fn zoom_pairs(
    first: Vec<SpriteRef>,
    second: Vec<SpriteRef>,
) -> Result<Vec<AlternativeSprites>, SpriteError> {
    if first.len() != second.len() {
        return Err(SpriteError::ZoomLengthMismatch { left: first.len(), right: second.len() });
    }
    first.into_iter().zip(second).map(|(a, b)| AlternativeSprites::new(vec![a, b])).collect()
}

/// Move every sprite of every slot; see [`shift`].
pub fn shift_slots(slots: &[SlotSprite], xofs: i32, yofs: i32) -> Vec<SlotSprite> {
    slots
        .iter()
        .map(|slot| match slot {
            SlotSprite::Single(sprite) => SlotSprite::Single(shift(sprite, xofs, yofs)),
            SlotSprite::Alternatives(alts) => SlotSprite::Alternatives(AlternativeSprites {
                sprites: alts.sprites().iter().map(|s| shift(s, xofs, yofs)).collect(),
            }),
        })
        .collect()
}
