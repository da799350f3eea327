//! tilegfx - sprite image-processing pipeline for tile-based game graphics
//!
//! This library provides functionality to:
//! - Cut sprites out of source sheets and layered documents
//! - Extract recolour masks from placeholder-coloured artwork
//! - Composite sprite layers and cut isometric ground tiles
//! - Match sprite variants by climate, zoom and other attributes
//! - Collect slot replacements and finalize them into an ordered plan for a
//!   container encoder

pub mod build;
pub mod composition;
pub mod config;
pub mod iso;
pub mod preview;
pub mod raster;
pub mod recolor;
pub mod sprite;
pub mod table;
pub mod variant;
