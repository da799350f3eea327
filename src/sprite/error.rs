//! Error types for producing sprite pixel planes

use thiserror::Error;

use super::{Bpp, Zoom};
use crate::raster::RasterError;

/// Error raised while building or rendering a sprite.
///
/// Every variant is fatal for the build: the source art or the coordinate
/// tables have to be fixed and the build rerun.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpriteError {
    /// Marker detection needs 24-bit or 32-bit RGB data
    #[error("Sprite '{sprite}' has {bpp} data, only 24/32-bit RGB(A) supports recolour markers")]
    UnsupportedFormat { sprite: String, bpp: Bpp },
    /// Marker pixels without a matching pixel in the control bitmap
    #[error("{missing} marker pixel(s) of sprite '{sprite}' have no defined value in '{control}'")]
    OrderMismatch { sprite: String, control: String, missing: usize },
    /// Control bitmap colour that is not part of the engine palette
    #[error("Colour ({r}, {g}, {b}) in '{control}' is not in the palette", r = colour[0], g = colour[1], b = colour[2])]
    PaletteLookupError { control: String, colour: [u8; 3] },
    /// Order bitmap does not define exactly the expected number of colours
    #[error("Expected {expected} colours in order mask '{control}', found {found}")]
    ColourCountError { control: String, expected: usize, found: usize },
    /// Layers of a composite (or a sprite and its control bitmap) differ in size
    #[error("Layer '{layer}' ({found_w}x{found_h}) does not match '{base}' ({expected_w}x{expected_h})", expected_w = expected.0, expected_h = expected.1, found_w = found.0, found_h = found.1)]
    SizeMismatch { base: String, layer: String, expected: (u32, u32), found: (u32, u32) },
    /// Layers of a composite use different zoom levels
    #[error("Composite '{sprite}' mixes zoom levels: {}", layers.iter().map(|(n, z)| format!("{}<zoom={}>", n, z)).collect::<Vec<_>>().join(", "))]
    ZoomMismatch { sprite: String, layers: Vec<(String, Zoom)> },
    /// Composite built from an empty layer list
    #[error("Composite '{0}' requires a non-empty list of layers")]
    EmptyComposite(String),
    /// Requested crop region leaves its source bitmap
    #[error("Region ({x}, {y}) {w}x{h} of '{sprite}' is out of bounds of its {src_w}x{src_h} source", src_w = source_size.0, src_h = source_size.1)]
    OutOfBounds { sprite: String, x: i64, y: i64, w: u32, h: u32, source_size: (u32, u32) },
    /// Two alternatives for the same zoom level
    #[error("Alternative sprites contain two sprites for zoom {zoom}: '{first}' and '{second}'")]
    DuplicateZoom { zoom: Zoom, first: String, second: String },
    /// Per-zoom template outputs have different lengths
    #[error("Zoom variants differ in length: {left} vs {right}")]
    ZoomLengthMismatch { left: usize, right: usize },
    /// External rasterizer or image decoding failure
    #[error(transparent)]
    Raster(#[from] RasterError),
}
