//! Sprite primitives - descriptors plus lazily produced pixel planes
//!
//! A [`Sprite`] is an immutable rectangle of pixels with placement metadata.
//! Its planes ([`Layers`]) are produced on demand from a shared
//! [`RenderContext`]; every concrete kind (file crops, recolour wrappers,
//! composites, isometric cuts) implements the same trait and holds only the
//! data it needs.

mod alternative;
mod context;
mod error;
mod file;
mod finished;
mod layers;
mod wrap;

pub use alternative::{shift_slots, zoom_pairs, AlternativeSprites, SlotSprite};
pub use context::RenderContext;
pub use error::SpriteError;
pub use file::FileSprite;
pub use finished::FinishedSprite;
pub use layers::Layers;
pub use wrap::{shift, Cached, EmptySprite, Shifted};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Shared handle to a sprite.
///
/// Sprites are owned by the collection entries that declare them and shared
/// with the replacement table and with composites built on top of them.
pub type SpriteRef = Rc<dyn Sprite>;

/// Output zoom level of a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zoom {
    /// Base resolution
    #[serde(rename = "1x")]
    Normal,
    /// Twice the base resolution
    #[serde(rename = "2x")]
    X2,
    /// Four times the base resolution
    #[serde(rename = "4x")]
    X4,
}

impl Zoom {
    /// All zoom levels, lowest resolution first.
    pub const ALL: [Zoom; 3] = [Zoom::Normal, Zoom::X2, Zoom::X4];

    /// Pixel scale factor relative to the base resolution.
    pub fn factor(self) -> u32 {
        match self {
            Zoom::Normal => 1,
            Zoom::X2 => 2,
            Zoom::X4 => 4,
        }
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

/// Bit depth of sprite pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bpp {
    /// Palette indices only
    #[serde(rename = "8")]
    Bpp8,
    /// RGB without alpha
    #[serde(rename = "24")]
    Bpp24,
    /// RGB with alpha
    #[serde(rename = "32")]
    Bpp32,
}

impl Bpp {
    pub fn bits(self) -> u32 {
        match self {
            Bpp::Bpp8 => 8,
            Bpp::Bpp24 => 24,
            Bpp::Bpp32 => 32,
        }
    }

    /// Whether the data carries RGB channels usable for marker detection.
    pub fn has_rgb(self) -> bool {
        matches!(self, Bpp::Bpp24 | Bpp::Bpp32)
    }
}

impl fmt::Display for Bpp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Placement metadata shared by every sprite kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteMeta {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub xofs: i32,
    pub yofs: i32,
    pub zoom: Zoom,
    pub bpp: Bpp,
}

impl SpriteMeta {
    pub fn new(name: impl Into<String>, width: u32, height: u32, zoom: Zoom) -> Self {
        Self { name: name.into(), width, height, xofs: 0, yofs: 0, zoom, bpp: Bpp::Bpp32 }
    }

    pub fn with_offset(mut self, xofs: i32, yofs: i32) -> Self {
        self.xofs = xofs;
        self.yofs = yofs;
        self
    }

    pub fn with_bpp(mut self, bpp: Bpp) -> Self {
        self.bpp = bpp;
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A rectangular pixel region that can produce its pixel planes.
pub trait Sprite: fmt::Debug {
    /// Placement metadata of this sprite.
    fn meta(&self) -> &SpriteMeta;

    /// Produce the RGB, alpha and recolour-index planes.
    ///
    /// Planes are recomputed on every call; wrap the sprite in [`Cached`] to
    /// keep them.
    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError>;

    /// Canonical description of how the planes are produced, used for build
    /// caching.
    fn fingerprint(&self) -> Value {
        json!({ "class": "Sprite", "meta": self.meta() })
    }

    /// Source files the planes are read from.
    fn dependencies(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn zoom(&self) -> Zoom {
        self.meta().zoom
    }
}
