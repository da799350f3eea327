//! Build context holding configuration and collected registrations.

use log::{debug, info};
use std::cell::OnceCell;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::error::BuildError;
use super::plan::FinalPlan;
use crate::config::GfxConfig;
use crate::raster::{SourceCache, SourceFile};
use crate::recolor::Palette;
use crate::sprite::{FinishedSprite, RenderContext, SlotSprite, Sprite, SpriteError};
use crate::table::ReplacementTable;
use crate::variant::VariantKey;

/// Lifecycle of the replacement table.
#[derive(Debug)]
enum Phase {
    /// Registrations allowed
    Collect(ReplacementTable),
    /// Table consumed into the final plan
    Finalized(FinalPlan),
}

/// State of one build run.
///
/// Sprite definitions register into the context while collecting; a single
/// call to [`finalize`](Self::finalize) then turns the registrations into the
/// [`FinalPlan`]. Sources opened through the context are shared for its
/// lifetime.
#[derive(Debug)]
pub struct BuildContext {
    /// The loaded configuration
    config: GfxConfig,
    /// Context handed to sprites when producing planes
    render: RenderContext,
    sources: SourceCache,
    palette: OnceCell<Rc<Palette>>,
    phase: Phase,
}

impl BuildContext {
    /// Create a new build context in the collecting phase.
    pub fn new(config: GfxConfig) -> Self {
        let render = RenderContext::new(config.rasterizer.clone());
        Self {
            config,
            render,
            sources: SourceCache::new(),
            palette: OnceCell::new(),
            phase: Phase::Collect(ReplacementTable::new()),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.render
    }

    pub fn sources(&self) -> &SourceCache {
        &self.sources
    }

    /// Shared handle to a plain image source.
    pub fn image(&mut self, path: impl Into<PathBuf>, colourkey: Option<[u8; 3]>) -> Rc<SourceFile> {
        self.sources.image(path, colourkey)
    }

    /// Shared handle to one frame of a layered document.
    pub fn aseprite(
        &mut self,
        path: impl Into<PathBuf>,
        frame: Option<u32>,
        layers: &[&str],
        ignore_layers: &[&str],
    ) -> Rc<SourceFile> {
        self.sources.aseprite(path, frame, layers, ignore_layers)
    }

    /// The configured engine palette, loaded on first use.
    pub fn palette(&self) -> Result<Rc<Palette>, BuildError> {
        if let Some(palette) = self.palette.get() {
            return Ok(Rc::clone(palette));
        }
        let path: &Path = self.config.palette.path.as_deref().ok_or(BuildError::NoPalette)?;
        debug!("Loading palette {}", path.display());
        let palette = Rc::new(Palette::load(path)?);
        let _ = self.palette.set(Rc::clone(&palette));
        Ok(palette)
    }

    fn table_mut(&mut self) -> Result<&mut ReplacementTable, BuildError> {
        match &mut self.phase {
            Phase::Collect(table) => Ok(table),
            Phase::Finalized(_) => Err(BuildError::Finalized),
        }
    }

    /// Register a replacement for base-set slot `slot` under `key`.
    pub fn register_old(&mut self, key: VariantKey, slot: u32, sprite: SlotSprite) -> Result<(), BuildError> {
        self.table_mut()?.insert_old(key, slot, sprite);
        Ok(())
    }

    /// Register sprite `offset` of new sprite set `set_type` under `key`.
    pub fn register_new(
        &mut self,
        key: VariantKey,
        set_type: u8,
        offset: u32,
        sprite: SlotSprite,
    ) -> Result<(), BuildError> {
        self.table_mut()?.insert_new(key, set_type, offset, sprite);
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.phase, Phase::Finalized(_))
    }

    /// Turn the collected registrations into the final plan. Only once.
    pub fn finalize(&mut self) -> Result<&FinalPlan, BuildError> {
        let table = match mem::replace(&mut self.phase, Phase::Finalized(FinalPlan::default())) {
            Phase::Collect(table) => table,
            finalized @ Phase::Finalized(_) => {
                self.phase = finalized;
                return Err(BuildError::AlreadyFinalized);
            }
        };

        let plan = match FinalPlan::build(&table, &self.config.guards) {
            Ok(plan) => plan,
            Err(e) => {
                self.phase = Phase::Collect(table);
                return Err(e.into());
            }
        };
        info!(
            "Finalized replacement table: {} blocks, {} runs, {} sprites ({} sources)",
            plan.blocks().len(),
            plan.run_count(),
            plan.sprite_count(),
            self.sources.len()
        );
        self.phase = Phase::Finalized(plan);
        self.plan()
    }

    /// The final plan; only available after [`finalize`](Self::finalize).
    pub fn plan(&self) -> Result<&FinalPlan, BuildError> {
        match &self.phase {
            Phase::Finalized(plan) => Ok(plan),
            Phase::Collect(_) => Err(BuildError::NotFinalized),
        }
    }

    /// Render a sprite for the encoder, trimming per configuration.
    pub fn finish(&self, sprite: &dyn Sprite) -> Result<FinishedSprite, SpriteError> {
        FinishedSprite::render(sprite, &self.render, self.config.output.trim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::{EmptySprite, SpriteRef, Zoom};
    use std::fs;
    use tempfile::TempDir;

    fn slot() -> SlotSprite {
        let sprite: SpriteRef = Rc::new(EmptySprite::new("e", 2, 2, Zoom::Normal));
        SlotSprite::from(sprite)
    }

    #[test]
    fn test_two_phase_lifecycle() {
        let mut ctx = BuildContext::new(GfxConfig::default());
        assert!(matches!(ctx.plan(), Err(BuildError::NotFinalized)));

        ctx.register_old(VariantKey::new(), 1420, slot()).unwrap();
        assert!(!ctx.is_finalized());
        assert_eq!(ctx.finalize().unwrap().blocks().len(), 1);
        assert!(ctx.is_finalized());

        assert!(matches!(ctx.finalize(), Err(BuildError::AlreadyFinalized)));
        assert!(matches!(ctx.register_old(VariantKey::new(), 1, slot()), Err(BuildError::Finalized)));
        assert!(matches!(ctx.register_new(VariantKey::new(), 5, 0, slot()), Err(BuildError::Finalized)));
        // The plan survives a rejected second finalize.
        assert_eq!(ctx.plan().unwrap().sprite_count(), 1);
    }

    #[test]
    fn test_sources_are_shared() {
        let mut ctx = BuildContext::new(GfxConfig::default());
        let a = ctx.image("sprites/ground.png", Some([0, 0, 255]));
        let b = ctx.image("sprites/ground.png", Some([0, 0, 255]));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(ctx.sources().len(), 1);
    }

    #[test]
    fn test_palette_loading() {
        let ctx = BuildContext::new(GfxConfig::default());
        assert!(matches!(ctx.palette(), Err(BuildError::NoPalette)));

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ttd.bin");
        fs::write(&path, vec![3u8; 768]).unwrap();
        let mut config = GfxConfig::default();
        config.palette.path = Some(path);
        let ctx = BuildContext::new(config);
        let first = ctx.palette().unwrap();
        assert!(Rc::ptr_eq(&first, &ctx.palette().unwrap()));
        assert_eq!(first.index_of([3, 3, 3]), Some(0));
    }

    #[test]
    fn test_finish_respects_trim_setting() {
        let mut config = GfxConfig::default();
        config.output.trim = false;
        let ctx = BuildContext::new(config);
        let finished = ctx.finish(&EmptySprite::new("e", 4, 3, Zoom::Normal)).unwrap();
        assert_eq!((finished.width, finished.height), (4, 3));

        let trimmed = BuildContext::new(GfxConfig::default()).finish(&EmptySprite::new("e", 4, 3, Zoom::Normal)).unwrap();
        assert_eq!((trimmed.width, trimmed.height), (1, 1));
    }
}
