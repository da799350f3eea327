//! Interface to the container encoder

use super::plan::{NewSpriteRun, SkipGuard, SpriteRun};

/// Receives the finalized plan, block by block.
///
/// Implemented by the encoder that writes the graphics container. For each
/// block the calls arrive as: guards, base-set replacements, new sprite sets,
/// then `end_block`.
pub trait Sink {
    type Error;

    /// One replacement action covering several runs of base-set slots,
    /// followed by their sprites.
    fn replace_old(&mut self, runs: &[SpriteRun]) -> Result<(), Self::Error>;

    /// One new-sprite-set action followed by its sprites.
    fn replace_new(&mut self, run: &NewSpriteRun) -> Result<(), Self::Error>;

    /// Conditional skip over the entries that follow.
    fn skip_if(&mut self, guard: &SkipGuard) -> Result<(), Self::Error>;

    /// End of one key's block.
    fn end_block(&mut self) -> Result<(), Self::Error>;
}
