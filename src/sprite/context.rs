//! Shared immutable context handed to every sprite while producing planes

use crate::config::RasterizerConfig;

/// Context for producing sprite planes.
///
/// Holds what the lazy sources need at render time. It is shared read-only
/// by every sprite of a build; per-source memoisation lives on the sources
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    rasterizer: RasterizerConfig,
}

impl RenderContext {
    pub fn new(rasterizer: RasterizerConfig) -> Self {
        Self { rasterizer }
    }

    /// Rasterizer settings used by layered sources.
    pub fn rasterizer(&self) -> &RasterizerConfig {
        &self.rasterizer
    }
}
