//! Build lifecycle errors

use thiserror::Error;

use crate::recolor::PaletteError;
use crate::table::TableError;

/// Error raised by the build context.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// Registration attempted after the table was finalized
    #[error("Cannot register sprites after the replacement table was finalized")]
    Finalized,
    /// `finalize()` called a second time
    #[error("Replacement table is already finalized")]
    AlreadyFinalized,
    /// Final plan requested while still collecting
    #[error("Replacement table is not finalized yet")]
    NotFinalized,
    /// A palette-lookup sprite needs a palette but none is configured
    #[error("No palette configured (set [palette] path in tilegfx.toml)")]
    NoPalette,
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error(transparent)]
    Table(#[from] TableError),
}
