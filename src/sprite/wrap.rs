//! Small sprite kinds: empty layers, offset shifts and plane caching

use serde_json::{json, Value};
use std::cell::OnceCell;
use std::path::PathBuf;
use std::rc::Rc;

use super::{Layers, RenderContext, Sprite, SpriteError, SpriteMeta, SpriteRef, Zoom};

/// A fully transparent sprite; compositing it is a no-op.
#[derive(Debug, Clone)]
pub struct EmptySprite {
    meta: SpriteMeta,
}

impl EmptySprite {
    pub fn new(name: impl Into<String>, width: u32, height: u32, zoom: Zoom) -> Self {
        Self { meta: SpriteMeta::new(name, width, height, zoom) }
    }
}

impl Sprite for EmptySprite {
    fn meta(&self) -> &SpriteMeta {
        &self.meta
    }

    fn layers(&self, _ctx: &RenderContext) -> Result<Layers, SpriteError> {
        Ok(Layers::transparent(self.meta.width, self.meta.height)
            .with_offset(self.meta.xofs, self.meta.yofs))
    }

    fn fingerprint(&self) -> Value {
        json!({ "class": "EmptySprite", "meta": self.meta })
    }
}

/// A sprite placed at different offsets than the sprite it wraps.
#[derive(Debug, Clone)]
pub struct Shifted {
    meta: SpriteMeta,
    inner: SpriteRef,
    dx: i32,
    dy: i32,
}

impl Sprite for Shifted {
    fn meta(&self) -> &SpriteMeta {
        &self.meta
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        let mut layers = self.inner.layers(ctx)?;
        layers.xofs += self.dx;
        layers.yofs += self.dy;
        Ok(layers)
    }

    fn fingerprint(&self) -> Value {
        json!({ "class": "Shifted", "sprite": self.inner.fingerprint(), "dx": self.dx, "dy": self.dy })
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        self.inner.dependencies()
    }
}

/// Move a sprite by `xofs`/`yofs` base-resolution pixels; the shift is
/// multiplied by the sprite's zoom factor.
pub fn shift(sprite: &SpriteRef, xofs: i32, yofs: i32) -> SpriteRef {
    let z = sprite.zoom().factor() as i32;
    let (dx, dy) = (xofs * z, yofs * z);
    let meta = sprite.meta().clone();
    let meta = SpriteMeta { xofs: meta.xofs + dx, yofs: meta.yofs + dy, ..meta };
    Rc::new(Shifted { meta, inner: Rc::clone(sprite), dx, dy })
}

/// Keeps the planes of the wrapped sprite after the first successful render.
#[derive(Debug)]
pub struct Cached {
    inner: SpriteRef,
    planes: OnceCell<Layers>,
}

impl Cached {
    pub fn new(inner: SpriteRef) -> Self {
        Self { inner, planes: OnceCell::new() }
    }

    pub fn is_rendered(&self) -> bool {
        self.planes.get().is_some()
    }
}

impl Sprite for Cached {
    fn meta(&self) -> &SpriteMeta {
        self.inner.meta()
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        if let Some(layers) = self.planes.get() {
            return Ok(layers.clone());
        }
        let layers = self.inner.layers(ctx)?;
        let _ = self.planes.set(layers.clone());
        Ok(layers)
    }

    fn fingerprint(&self) -> Value {
        self.inner.fingerprint()
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        self.inner.dependencies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Counting {
        meta: SpriteMeta,
        renders: Cell<usize>,
    }

    impl Sprite for Counting {
        fn meta(&self) -> &SpriteMeta {
            &self.meta
        }

        fn layers(&self, _ctx: &RenderContext) -> Result<Layers, SpriteError> {
            self.renders.set(self.renders.get() + 1);
            Ok(Layers::transparent(self.meta.width, self.meta.height))
        }
    }

    #[test]
    fn test_empty_sprite_is_blank() {
        let sprite = EmptySprite::new("empty", 4, 2, Zoom::Normal);
        let layers = sprite.layers(&RenderContext::default()).unwrap();
        assert_eq!(layers.dimensions(), (4, 2));
        assert!(layers.is_blank());
    }

    #[test]
    fn test_shift_scales_with_zoom() {
        let base: SpriteRef = Rc::new(EmptySprite {
            meta: SpriteMeta::new("bus", 8, 8, Zoom::X4).with_offset(-3, -15),
        });
        let moved = shift(&base, 1, -2);
        assert_eq!((moved.meta().xofs, moved.meta().yofs), (1, -23));

        let layers = moved.layers(&RenderContext::default()).unwrap();
        assert_eq!((layers.xofs, layers.yofs), (1, -23));
    }

    #[test]
    fn test_cached_renders_once() {
        let inner = Rc::new(Counting { meta: SpriteMeta::new("c", 2, 2, Zoom::Normal), renders: Cell::new(0) });
        let cached = Cached::new(Rc::clone(&inner) as SpriteRef);
        let ctx = RenderContext::default();

        assert!(!cached.is_rendered());
        let first = cached.layers(&ctx).unwrap();
        let second = cached.layers(&ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.renders.get(), 1);
        assert!(cached.is_rendered());
    }
}
