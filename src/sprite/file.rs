//! Rectangular crops out of a source bitmap

use serde_json::{json, Value};
use std::path::PathBuf;
use std::rc::Rc;

use super::{Layers, RenderContext, Sprite, SpriteError, SpriteMeta, Zoom};
use crate::raster::SourceFile;

/// A sprite cut out of a source sheet at fixed pixel coordinates.
#[derive(Debug, Clone)]
pub struct FileSprite {
    meta: SpriteMeta,
    source: Rc<SourceFile>,
    x: u32,
    y: u32,
}

impl FileSprite {
    /// Crop `width` x `height` pixels at (`x`, `y`) of `source`.
    pub fn new(
        name: impl Into<String>,
        source: Rc<SourceFile>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        zoom: Zoom,
    ) -> Self {
        Self { meta: SpriteMeta::new(name, width, height, zoom), source, x, y }
    }

    pub fn with_offset(mut self, xofs: i32, yofs: i32) -> Self {
        self.meta = self.meta.with_offset(xofs, yofs);
        self
    }

    pub fn source(&self) -> &Rc<SourceFile> {
        &self.source
    }

    /// Top-left corner of the crop in the source bitmap.
    pub fn origin(&self) -> (u32, u32) {
        (self.x, self.y)
    }
}

impl Sprite for FileSprite {
    fn meta(&self) -> &SpriteMeta {
        &self.meta
    }

    fn layers(&self, ctx: &RenderContext) -> Result<Layers, SpriteError> {
        let sheet = self.source.load(ctx)?;
        let (src_w, src_h) = sheet.dimensions();
        let fits_x = u64::from(self.x) + u64::from(self.meta.width) <= u64::from(src_w);
        let fits_y = u64::from(self.y) + u64::from(self.meta.height) <= u64::from(src_h);
        if !fits_x || !fits_y {
            return Err(SpriteError::OutOfBounds {
                sprite: self.meta.name.clone(),
                x: i64::from(self.x),
                y: i64::from(self.y),
                w: self.meta.width,
                h: self.meta.height,
                source_size: (src_w, src_h),
            });
        }

        Ok(sheet
            .crop(self.x, self.y, self.meta.width, self.meta.height)
            .with_offset(self.meta.xofs, self.meta.yofs))
    }

    fn fingerprint(&self) -> Value {
        json!({
            "class": "FileSprite",
            "meta": self.meta,
            "source": self.source.fingerprint(),
            "x": self.x,
            "y": self.y,
        })
    }

    fn dependencies(&self) -> Vec<PathBuf> {
        vec![self.source.path().to_path_buf()]
    }
}
