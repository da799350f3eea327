//! Source bitmaps - plain image files and externally rasterized layered art
//!
//! Loading is lazy: a [`SourceFile`] only decodes (or runs the rasterizer)
//! the first time a sprite asks for its pixels, then keeps the bitmap for the
//! rest of the build. [`SourceCache`] hands out one shared handle per
//! distinct (path, frame, layers, ignored layers, colour key) tuple.

mod aseprite;

use log::debug;
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::sprite::{Layers, RenderContext};

/// Error loading a source bitmap.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RasterError {
    /// The rasterizer could not be started or its output could not be staged
    #[error("Failed to run '{command}' for '{}': {source}", path.display())]
    Io {
        command: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The rasterizer ran but reported failure
    #[error("'{command}' returned non-zero code {} for '{}'", code.map_or_else(|| "<signal>".to_string(), |c| c.to_string()), path.display())]
    ExitStatus { command: String, path: PathBuf, code: Option<i32> },
    /// The bitmap could not be decoded
    #[error("Failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// How a source file is turned into a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Decoded directly (PNG and other formats the image crate reads)
    Image,
    /// Layered document flattened by the external rasterizer
    Aseprite,
}

/// Identity of a loaded bitmap; equal keys share one loaded bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceKey {
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Single frame to export; `None` exports the document's first frame
    pub frame: Option<u32>,
    /// Layers to include; empty includes every visible layer
    pub layers: Vec<String>,
    /// Layers to hide
    pub ignore_layers: Vec<String>,
    /// Pixels of this exact colour become transparent
    pub colourkey: Option<[u8; 3]>,
}

impl SourceKey {
    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Image,
            frame: None,
            layers: Vec::new(),
            ignore_layers: Vec::new(),
            colourkey: None,
        }
    }

    pub fn aseprite(path: impl Into<PathBuf>) -> Self {
        Self { kind: SourceKind::Aseprite, ..Self::image(path) }
    }

    pub fn with_frame(mut self, frame: u32) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layers.push(layer.into());
        self
    }

    pub fn with_ignored_layer(mut self, layer: impl Into<String>) -> Self {
        self.ignore_layers.push(layer.into());
        self
    }

    pub fn with_colourkey(mut self, colourkey: [u8; 3]) -> Self {
        self.colourkey = Some(colourkey);
        self
    }
}

/// A lazily loaded, memoised source bitmap.
#[derive(Debug)]
pub struct SourceFile {
    key: SourceKey,
    loaded: OnceCell<Rc<Layers>>,
}

impl SourceFile {
    pub fn new(key: SourceKey) -> Self {
        Self { key, loaded: OnceCell::new() }
    }

    pub fn key(&self) -> &SourceKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.key.path
    }

    /// Whether the bitmap has already been produced.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Produce the bitmap, decoding or rasterizing it on first use.
    pub fn load(&self, ctx: &RenderContext) -> Result<Rc<Layers>, RasterError> {
        if let Some(layers) = self.loaded.get() {
            return Ok(Rc::clone(layers));
        }

        let mut layers = match self.key.kind {
            SourceKind::Image => decode_file(&self.key.path)?,
            SourceKind::Aseprite => {
                aseprite::rasterize(&ctx.rasterizer().resolved_executable(), &self.key)?
            }
        };
        if let Some(colourkey) = self.key.colourkey {
            layers.apply_colourkey(colourkey);
        }
        debug!(
            "loaded {} ({}x{}, {})",
            self.key.path.display(),
            layers.width(),
            layers.height(),
            layers.bpp
        );

        let layers = Rc::new(layers);
        let _ = self.loaded.set(Rc::clone(&layers));
        Ok(layers)
    }

    pub fn fingerprint(&self) -> Value {
        json!({ "class": "SourceFile", "key": self.key })
    }
}

/// Decode an image file into planes.
pub fn decode_file(path: &Path) -> Result<Layers, RasterError> {
    let image = image::open(path)
        .map_err(|source| RasterError::Decode { path: path.to_path_buf(), source })?;
    Ok(Layers::from_dynamic(image))
}

/// Registry of source handles, one per distinct [`SourceKey`].
#[derive(Debug, Default)]
pub struct SourceCache {
    files: BTreeMap<SourceKey, Rc<SourceFile>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the shared handle for a key, creating it on first request.
    pub fn get(&mut self, key: SourceKey) -> Rc<SourceFile> {
        if let Some(file) = self.files.get(&key) {
            debug!("source cache hit for {}", key.path.display());
            return Rc::clone(file);
        }
        let file = Rc::new(SourceFile::new(key.clone()));
        self.files.insert(key, Rc::clone(&file));
        file
    }

    /// Handle for a plain image file.
    pub fn image(&mut self, path: impl Into<PathBuf>, colourkey: Option<[u8; 3]>) -> Rc<SourceFile> {
        let mut key = SourceKey::image(path);
        key.colourkey = colourkey;
        self.get(key)
    }

    /// Handle for a layered document with an explicit layer filter.
    pub fn aseprite(
        &mut self,
        path: impl Into<PathBuf>,
        frame: Option<u32>,
        layers: &[&str],
        ignore_layers: &[&str],
    ) -> Rc<SourceFile> {
        let mut key = SourceKey::aseprite(path);
        key.frame = frame;
        key.layers = layers.iter().map(|l| l.to_string()).collect();
        key.ignore_layers = ignore_layers.iter().map(|l| l.to_string()).collect();
        self.get(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of handles whose bitmap has been produced.
    pub fn loaded_count(&self) -> usize {
        self.files.values().filter(|f| f.is_loaded()).count()
    }
}
