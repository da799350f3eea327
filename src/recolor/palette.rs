//! Engine palette and palette-lookup mask extraction

use image::GrayImage;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use super::{check_same_size, is_marker};
use crate::sprite::{Layers, RenderContext, Sprite, SpriteError, SpriteMeta, SpriteRef};

/// Number of entries in an engine palette.
pub const PALETTE_SIZE: usize = 256;

const JASC_MAGIC: &str = "JASC-PAL";

/// Error loading a palette file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PaletteError {
    /// Failed to read the palette file
    #[error("Failed to read palette {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// File is neither a raw 768-byte palette nor a valid JASC-PAL file
    #[error("Invalid palette: {0}")]
    Format(String),
}

/// 256 RGB colours indexed by palette slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colours: Vec<[u8; 3]>,
    lookup: BTreeMap<[u8; 3], u8>,
    /// File the palette was loaded from, if any.
    source: Option<PathBuf>,
}

impl Palette {
    /// Build a palette from exactly 256 colours.
    pub fn new(colours: Vec<[u8; 3]>) -> Result<Self, PaletteError> {
        if colours.len() != PALETTE_SIZE {
            return Err(PaletteError::Format(format!(
                "expected {} colours, found {}",
                PALETTE_SIZE,
                colours.len()
            )));
        }
        let mut lookup = BTreeMap::new();
        for (index, colour) in colours.iter().enumerate() {
            // The lowest index wins for repeated colours.
            lookup.entry(*colour).or_insert(index as u8);
        }
        Ok(Self { colours, lookup, source: None })
    }

    /// Raw palette: 768 bytes of packed RGB triples.
    pub fn from_raw(bytes: &[u8]) -> Result<Self, PaletteError> {
        if bytes.len() != PALETTE_SIZE * 3 {
            return Err(PaletteError::Format(format!(
                "raw palette must be {} bytes, found {}",
                PALETTE_SIZE * 3,
                bytes.len()
            )));
        }
        Self::new(bytes.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
    }

    /// JASC-PAL text palette (`JASC-PAL`, version, count, then one `r g b` per line).
    pub fn parse_jasc(text: &str) -> Result<Self, PaletteError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next() != Some(JASC_MAGIC) {
            return Err(PaletteError::Format("missing JASC-PAL header".to_string()));
        }
        // Version line, conventionally "0100".
        lines.next().ok_or_else(|| PaletteError::Format("missing version line".to_string()))?;
        let count: usize = lines
            .next()
            .and_then(|l| l.parse().ok())
            .ok_or_else(|| PaletteError::Format("missing or invalid colour count".to_string()))?;
        if count != PALETTE_SIZE {
            return Err(PaletteError::Format(format!("expected {} colours, found {}", PALETTE_SIZE, count)));
        }

        let colours = lines
            .take(count)
            .enumerate()
            .map(|(i, line)| parse_jasc_colour(line).ok_or_else(|| PaletteError::Format(format!("bad colour line {}: '{}'", i, line))))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colours)
    }

    /// Load a palette file, detecting JASC-PAL by its header.
    pub fn load(path: &Path) -> Result<Self, PaletteError> {
        let bytes = fs::read(path).map_err(|source| PaletteError::Io { path: path.to_path_buf(), source })?;
        let mut palette = if bytes.starts_with(JASC_MAGIC.as_bytes()) {
            Self::parse_jasc(&String::from_utf8_lossy(&bytes))?
        } else {
            Self::from_raw(&bytes)?
        };
        palette.source = Some(path.to_path_buf());
        Ok(palette)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Hex SHA-256 of the 256 colours in slot order.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for colour in &self.colours {
            hasher.update(colour);
        }
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Index of an exactly matching colour.
    pub fn index_of(&self, colour: [u8; 3]) -> Option<u8> {
        self.lookup.get(&colour).copied()
    }

    pub fn colour(&self, index: u8) -> [u8; 3] {
        self.colours[usize::from(index)]
    }
}

fn parse_jasc_colour(line: &str) -> Option<[u8; 3]> {
    let mut parts = line.split_whitespace().map(|p| p.parse::<u8>().ok());
    let colour = [parts.next()??, parts.next()??, parts.next()??];
    parts.next().is_none().then_some(colour)
}

/// Marker pixels take their recolour index from a hand-painted mask bitmap.
///
/// Each marker pixel's colour in `mask` is looked up in the palette; the RGB
/// plane is kept as is.
#[derive(Debug, Clone)]
pub struct PaletteMaskSprite {
    sprite: SpriteRef,
    mask: SpriteRef,
    palette: Rc<Palette>,
}

impl PaletteMaskSprite {
    pub fn new(sprite: SpriteRef, mask: SpriteRef, palette: Rc<Palette>) -> Self {
        Self { sprite, mask, palette }
    }
}

impl Sprite for PaletteMaskSprite {
    fn meta(&self) -> &SpriteMeta {
        self.sprite.meta()
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        let layers = self.sprite.layers(ctx)?;
        if !layers.bpp.has_rgb() {
            return Err(SpriteError::UnsupportedFormat { sprite: self.sprite.name().to_string(), bpp: layers.bpp });
        }
        let control = self.mask.layers(ctx)?;
        check_same_size(self.sprite.name(), &layers, self.mask.name(), &control)?;

        let (width, height) = layers.dimensions();
        let mut mask = GrayImage::new(width, height);
        let mut missing = 0usize;
        for (x, y, px) in layers.rgb.enumerate_pixels() {
            if !is_marker(px.0) {
                continue;
            }
            if control.alpha_at(x, y) == 0 {
                missing += 1;
                continue;
            }
            let colour = control.rgb.get_pixel(x, y).0;
            let index = self.palette.index_of(colour).ok_or_else(|| SpriteError::PaletteLookupError {
                control: self.mask.name().to_string(),
                colour,
            })?;
            mask.get_pixel_mut(x, y)[0] = index;
        }

        if missing > 0 {
            return Err(SpriteError::OrderMismatch {
                sprite: self.sprite.name().to_string(),
                control: self.mask.name().to_string(),
                missing,
            });
        }

        Ok(layers.with_mask(mask))
    }

    fn fingerprint(&self) -> Value {
        json!({
            "class": "PaletteMaskSprite",
            "sprite": self.sprite.fingerprint(),
            "mask": self.mask.fingerprint(),
            "palette": self.palette.digest(),
        })
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        let mut deps = self.sprite.dependencies();
        deps.extend(self.mask.dependencies());
        deps.extend(self.palette.source().map(Path::to_path_buf));
        deps
    }
}
