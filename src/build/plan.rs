//! Final emission plan built from the replacement table

use serde::Serialize;
use std::fmt;

use super::sink::Sink;
use crate::config::GuardConfig;
use crate::sprite::SlotSprite;
use crate::table::{coalesce_runs, order_keys, ReplacementTable, TableError};
use crate::variant::VariantKey;

/// Consecutive base-set slots replaced together.
#[derive(Debug, Clone)]
pub struct SpriteRun {
    pub first_id: u32,
    pub sprites: Vec<SlotSprite>,
}

impl SpriteRun {
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// Consecutive sprites of a new sprite set.
#[derive(Debug, Clone)]
pub struct NewSpriteRun {
    pub set_type: u8,
    pub offset: u32,
    pub sprites: Vec<SlotSprite>,
}

impl NewSpriteRun {
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// Comparison of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Condition {
    NotEqual,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::NotEqual => f.write_str("!="),
        }
    }
}

/// Skip `skip` entries when `variable <condition> value` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkipGuard {
    pub variable: u8,
    pub condition: Condition,
    pub value: u32,
    pub skip: usize,
}

impl fmt::Display for SkipGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skip {} if 0x{:02X} {} {}", self.skip, self.variable, self.condition, self.value)
    }
}

/// Everything registered under one variant key.
#[derive(Debug, Clone)]
pub struct Block {
    pub key: VariantKey,
    pub guards: Vec<SkipGuard>,
    pub old_runs: Vec<SpriteRun>,
    pub new_runs: Vec<NewSpriteRun>,
}

impl Block {
    /// Entries after the guards: one per action plus one per sprite.
    pub fn body_entries(&self) -> usize {
        let old = if self.old_runs.is_empty() { 0 } else { 1 + self.old_runs.iter().map(SpriteRun::len).sum::<usize>() };
        let new: usize = self.new_runs.iter().map(|r| 1 + r.len()).sum();
        old + new
    }

    pub fn sprite_count(&self) -> usize {
        self.old_runs.iter().map(SpriteRun::len).sum::<usize>() + self.new_runs.iter().map(NewSpriteRun::len).sum::<usize>()
    }
}

/// Guards gating a block on the key's climate and thin-lines attributes.
///
/// Each guard skips the block body plus the guards after it.
fn guards_for(key: &VariantKey, body: usize, config: &GuardConfig) -> Vec<SkipGuard> {
    let mut checks = Vec::new();
    if let Some(climate) = key.climate {
        checks.push((config.climate_variable, u32::from(climate.id())));
    }
    if let Some(thin) = key.thin {
        checks.push((config.thin_lines_parameter, u32::from(thin)));
    }

    let count = checks.len();
    checks
        .into_iter()
        .enumerate()
        .map(|(i, (variable, value))| SkipGuard {
            variable,
            condition: Condition::NotEqual,
            value,
            skip: body + (count - 1 - i),
        })
        .collect()
}

/// Ordered blocks ready for the encoder.
#[derive(Debug, Clone, Default)]
pub struct FinalPlan {
    blocks: Vec<Block>,
}

impl FinalPlan {
    /// Coalesce and order every key of the table.
    pub fn build(table: &ReplacementTable, config: &GuardConfig) -> Result<Self, TableError> {
        let order = order_keys(&table.keys())?;
        let mut blocks = Vec::with_capacity(order.len());
        for key in order {
            let old_runs = table
                .old_slots(&key)
                .map(|slots| {
                    coalesce_runs(slots)
                        .into_iter()
                        .map(|(first_id, sprites)| SpriteRun { first_id, sprites })
                        .collect()
                })
                .unwrap_or_default();

            let mut new_runs = Vec::new();
            if let Some(sets) = table.new_sets(&key) {
                for (&set_type, offsets) in sets {
                    new_runs.extend(
                        coalesce_runs(offsets)
                            .into_iter()
                            .map(|(offset, sprites)| NewSpriteRun { set_type, offset, sprites }),
                    );
                }
            }

            let mut block = Block { key, guards: Vec::new(), old_runs, new_runs };
            block.guards = guards_for(&block.key, block.body_entries(), config);
            blocks.push(block);
        }
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn run_count(&self) -> usize {
        self.blocks.iter().map(|b| b.old_runs.len() + b.new_runs.len()).sum()
    }

    pub fn sprite_count(&self) -> usize {
        self.blocks.iter().map(Block::sprite_count).sum()
    }

    /// Hand every block to `sink`, most specific key first.
    pub fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<(), S::Error> {
        for block in &self.blocks {
            for guard in &block.guards {
                sink.skip_if(guard)?;
            }
            if !block.old_runs.is_empty() {
                sink.replace_old(&block.old_runs)?;
            }
            for run in &block.new_runs {
                sink.replace_new(run)?;
            }
            sink.end_block()?;
        }
        Ok(())
    }
}
