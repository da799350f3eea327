//! Keyed sprite collections, variant matching and composition

use log::debug;
use std::collections::BTreeSet;
use std::rc::Rc;
use thiserror::Error;

use super::VariantKey;
use crate::build::{BuildContext, BuildError};
use crate::composition::CompositeSprite;
use crate::sprite::{AlternativeSprites, SlotSprite, SpriteError, SpriteRef, Zoom};

/// Error raised by collection operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VariantError {
    /// Same key registered twice at one zoom level
    #[error("Collection '{name}' already has a {zoom} variant keyed {key}")]
    DuplicateVariant { name: String, key: String, zoom: Zoom },
    /// Key carries a zoom attribute that disagrees with the entry zoom
    #[error("Collection '{name}': key {key} does not match entry zoom {zoom}")]
    ZoomConflict { name: String, key: String, zoom: Zoom },
    /// Zoom levels of one variant hold different numbers of sprites
    #[error("Collection '{name}', variant {key}: zoom levels hold {expected} and {found} sprites")]
    LengthMismatch { name: String, key: String, expected: usize, found: usize },
    /// Composition pattern refers to a sprite that does not exist
    #[error("Composition '{name}': {side} index {index} out of range (length {len})")]
    PatternIndex { name: String, side: &'static str, index: usize, len: usize },
    /// Sprite `index` past `start` does not fit a 32-bit slot number
    #[error("Collection '{name}': slot {start} + {index} is out of range")]
    SlotOverflow { name: String, start: u32, index: usize },
    #[error(transparent)]
    Sprite(#[from] SpriteError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// One registered variant: its sprites at one zoom level.
#[derive(Debug, Clone)]
pub struct VariantEntry {
    pub zoom: Zoom,
    pub key: VariantKey,
    pub sprites: Vec<SpriteRef>,
}

/// Same-named sprite lists in several variants.
#[derive(Debug, Clone)]
pub struct VariantCollection {
    name: String,
    entries: Vec<VariantEntry>,
}

fn pick<'a>(sprites: &'a [SpriteRef], index: usize, name: &str, side: &'static str) -> Result<&'a SpriteRef, VariantError> {
    sprites.get(index).ok_or_else(|| VariantError::PatternIndex {
        name: name.to_string(),
        side,
        index,
        len: sprites.len(),
    })
}

impl VariantCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[VariantEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `sprites` as the `zoom` variant for `key`.
    pub fn add(&mut self, zoom: Zoom, key: VariantKey, sprites: Vec<SpriteRef>) -> Result<(), VariantError> {
        if key.zoom.is_some_and(|z| z != zoom) {
            return Err(VariantError::ZoomConflict { name: self.name.clone(), key: key.to_string(), zoom });
        }
        let bare = key.without_zoom();
        if self.entries.iter().any(|e| e.zoom == zoom && e.key.without_zoom() == bare) {
            return Err(VariantError::DuplicateVariant { name: self.name.clone(), key: key.to_string(), zoom });
        }
        self.entries.push(VariantEntry { zoom, key, sprites });
        Ok(())
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, zoom: Zoom, key: VariantKey, sprites: Vec<SpriteRef>) -> Result<Self, VariantError> {
        self.add(zoom, key, sprites)?;
        Ok(self)
    }

    /// Distinct keys, zoom attribute removed.
    pub fn keys(&self) -> BTreeSet<VariantKey> {
        self.entries.iter().map(|e| e.key.without_zoom()).collect()
    }

    /// Most specific entry at `zoom` whose key is a subset of `query`.
    ///
    /// Equally specific entries resolve to the first one registered.
    pub fn lookup(&self, zoom: Zoom, query: &VariantKey) -> Option<&VariantEntry> {
        let query = query.without_zoom();
        let mut best: Option<(&VariantEntry, usize)> = None;
        for entry in self.entries.iter().filter(|e| e.zoom == zoom) {
            let key = entry.key.without_zoom();
            if !key.is_subset_of(&query) {
                continue;
            }
            if best.map_or(true, |(_, n)| key.len() > n) {
                best = Some((entry, key.len()));
            }
        }
        best.map(|(entry, _)| entry)
    }

    /// Entry at `zoom` covering every attribute of `query` except zoom.
    pub fn lookup_exact(&self, zoom: Zoom, query: &VariantKey) -> Option<&VariantEntry> {
        let query = query.without_zoom();
        self.lookup(zoom, &query).filter(|e| query.is_subset_of(&e.key.without_zoom()))
    }

    /// Draw this collection's sprites on top of `dest`.
    ///
    /// Every compatible pair of keys yields a variant keyed by their union.
    /// For each `(d, s)` in `pattern`, result sprite `i` is `dest[d]` with
    /// `self[s]` composited over it, or plain `dest[d]` when `s` is `None`.
    pub fn compose_on(
        &self,
        dest: &VariantCollection,
        pattern: &[(usize, Option<usize>)],
        name: impl Into<String>,
    ) -> Result<VariantCollection, VariantError> {
        let mut result = VariantCollection::new(name);

        let own_keys = self.keys();
        let dest_keys = dest.keys();
        let unions: BTreeSet<VariantKey> =
            own_keys.iter().flat_map(|s| dest_keys.iter().filter_map(move |d| s.union(d))).collect();

        for key in unions {
            for zoom in Zoom::ALL {
                let (Some(src), Some(dst)) = (self.lookup(zoom, &key), dest.lookup(zoom, &key)) else {
                    continue;
                };
                let mut sprites = Vec::with_capacity(pattern.len());
                for &(d, s) in pattern {
                    let below = pick(&dst.sprites, d, &result.name, "destination")?;
                    let sprite: SpriteRef = match s {
                        None => Rc::clone(below),
                        Some(s) => {
                            let above = pick(&src.sprites, s, &result.name, "source")?;
                            let name = format!("{}+{}", below.name(), above.name());
                            Rc::new(CompositeSprite::new(name, vec![Rc::clone(below), Rc::clone(above)])?)
                        }
                    };
                    sprites.push(sprite);
                }
                result.add(zoom, key.clone(), sprites)?;
            }
        }

        debug!(
            "Composed '{}' onto '{}': {} variants as '{}'",
            self.name,
            dest.name,
            result.entries.len(),
            result.name
        );
        Ok(result)
    }

    /// Per key, the exact matches at every zoom zipped into slots.
    fn slots_per_key(&self) -> Result<Vec<(VariantKey, Vec<SlotSprite>)>, VariantError> {
        let mut out = Vec::new();
        for key in self.keys() {
            let per_zoom: Vec<&VariantEntry> =
                Zoom::ALL.iter().filter_map(|&zoom| self.lookup_exact(zoom, &key)).collect();
            let Some(first) = per_zoom.first() else {
                continue;
            };
            let len = first.sprites.len();
            if let Some(other) = per_zoom.iter().find(|e| e.sprites.len() != len) {
                return Err(VariantError::LengthMismatch {
                    name: self.name.clone(),
                    key: key.to_string(),
                    expected: len,
                    found: other.sprites.len(),
                });
            }

            let slots = (0..len)
                .map(|i| {
                    let alts = AlternativeSprites::new(per_zoom.iter().map(|e| Rc::clone(&e.sprites[i])).collect())?;
                    Ok(SlotSprite::from_alternatives(alts))
                })
                .collect::<Result<Vec<_>, SpriteError>>()?;
            out.push((key, slots));
        }
        Ok(out)
    }

    fn slot_id(&self, start: u32, index: usize) -> Result<u32, VariantError> {
        u32::try_from(index)
            .ok()
            .and_then(|i| start.checked_add(i))
            .ok_or_else(|| VariantError::SlotOverflow { name: self.name.clone(), start, index })
    }

    /// Register every variant as replacement for base-set slots starting at
    /// `first_id`.
    pub fn replace_old(&self, ctx: &mut BuildContext, first_id: u32) -> Result<(), VariantError> {
        for (key, slots) in self.slots_per_key()? {
            for (i, slot) in slots.into_iter().enumerate() {
                ctx.register_old(key.clone(), self.slot_id(first_id, i)?, slot)?;
            }
        }
        Ok(())
    }

    /// Register every variant into new sprite set `set_type` starting at
    /// `offset`.
    pub fn replace_new(&self, ctx: &mut BuildContext, set_type: u8, offset: u32) -> Result<(), VariantError> {
        for (key, slots) in self.slots_per_key()? {
            for (i, slot) in slots.into_iter().enumerate() {
                ctx.register_new(key.clone(), set_type, self.slot_id(offset, i)?, slot)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GfxConfig;
    use crate::sprite::{EmptySprite, Sprite};
    use crate::variant::Climate;

    fn sprites(prefix: &str, n: usize, zoom: Zoom) -> Vec<SpriteRef> {
        (0..n)
            .map(|i| Rc::new(EmptySprite::new(format!("{}{}_{}", prefix, i, zoom), 4, 4, zoom)) as SpriteRef)
            .collect()
    }

    fn tropical() -> VariantKey {
        VariantKey::new().with_climate(Climate::Tropical)
    }

    fn temperate() -> VariantKey {
        VariantKey::new().with_climate(Climate::Temperate)
    }

    #[test]
    fn test_lookup_most_specific_subset() {
        let mut coll = VariantCollection::new("rail");
        coll.add(Zoom::Normal, VariantKey::new(), sprites("any", 1, Zoom::Normal)).unwrap();
        coll.add(Zoom::Normal, tropical(), sprites("trop", 1, Zoom::Normal)).unwrap();

        let query = tropical().with_thin(true);
        let found = coll.lookup(Zoom::Normal, &query).unwrap();
        assert_eq!(found.key, tropical());
        assert!(coll.lookup_exact(Zoom::Normal, &query).is_none());

        assert_eq!(coll.lookup_exact(Zoom::Normal, &tropical()).unwrap().key, tropical());
        assert!(coll.lookup(Zoom::X2, &query).is_none());
        assert_eq!(coll.lookup(Zoom::Normal, &temperate()).unwrap().key, VariantKey::new());
    }

    #[test]
    fn test_lookup_tie_goes_to_first_registered() {
        let mut coll = VariantCollection::new("tie");
        coll.add(Zoom::Normal, VariantKey::new().with_thin(true), sprites("thin", 1, Zoom::Normal)).unwrap();
        coll.add(Zoom::Normal, tropical(), sprites("trop", 1, Zoom::Normal)).unwrap();
        let found = coll.lookup(Zoom::Normal, &tropical().with_thin(true)).unwrap();
        assert_eq!(found.sprites[0].name(), "thin0_1x");
    }

    #[test]
    fn test_add_rejects_conflicts() {
        let mut coll = VariantCollection::new("c");
        coll.add(Zoom::X2, tropical(), vec![]).unwrap();
        let dup = coll.add(Zoom::X2, tropical().with_zoom(Zoom::X2), vec![]).unwrap_err();
        assert!(matches!(dup, VariantError::DuplicateVariant { zoom: Zoom::X2, .. }));
        let conflict = coll.add(Zoom::Normal, VariantKey::new().with_zoom(Zoom::X4), vec![]).unwrap_err();
        assert!(matches!(conflict, VariantError::ZoomConflict { .. }));
        coll.add(Zoom::Normal, tropical(), vec![]).unwrap();
    }

    #[test]
    fn test_compose_onto_generic_destination() {
        let src = VariantCollection::new("fence").with(Zoom::Normal, temperate(), sprites("f", 2, Zoom::Normal)).unwrap();
        let dst = VariantCollection::new("ground").with(Zoom::Normal, VariantKey::new(), sprites("g", 2, Zoom::Normal)).unwrap();

        let out = src.compose_on(&dst, &[(0, Some(1)), (1, None)], "fenced").unwrap();
        assert_eq!(out.entries().len(), 1);
        let entry = &out.entries()[0];
        assert_eq!(entry.key, temperate());
        assert_eq!(entry.sprites[0].name(), "g0_1x+f1_1x");
        assert_eq!(entry.sprites[1].name(), "g1_1x");
    }

    #[test]
    fn test_compose_skips_conflicting_pairs() {
        let src = VariantCollection::new("fence").with(Zoom::Normal, temperate(), sprites("f", 1, Zoom::Normal)).unwrap();
        let dst = VariantCollection::new("ground").with(Zoom::Normal, tropical(), sprites("g", 1, Zoom::Normal)).unwrap();
        let out = src.compose_on(&dst, &[(0, Some(0))], "none").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_compose_per_zoom_and_bad_index() {
        let src = VariantCollection::new("s")
            .with(Zoom::Normal, VariantKey::new(), sprites("s", 1, Zoom::Normal))
            .unwrap()
            .with(Zoom::X2, VariantKey::new(), sprites("s", 1, Zoom::X2))
            .unwrap();
        let dst = VariantCollection::new("d")
            .with(Zoom::Normal, VariantKey::new(), sprites("d", 1, Zoom::Normal))
            .unwrap()
            .with(Zoom::X2, tropical(), sprites("dt", 1, Zoom::X2))
            .unwrap();

        let out = src.compose_on(&dst, &[(0, Some(0))], "both").unwrap();
        let keys: Vec<(Zoom, VariantKey)> = out.entries().iter().map(|e| (e.zoom, e.key.clone())).collect();
        assert_eq!(
            keys,
            vec![(Zoom::Normal, VariantKey::new()), (Zoom::Normal, tropical()), (Zoom::X2, tropical())]
        );
        let x2 = out.lookup(Zoom::X2, &tropical()).unwrap();
        assert_eq!(x2.sprites[0].zoom(), Zoom::X2);

        let err = src.compose_on(&dst, &[(0, Some(3))], "bad").unwrap_err();
        assert!(matches!(err, VariantError::PatternIndex { side: "source", index: 3, len: 1, .. }));
    }

    #[test]
    fn test_replace_old_registers_alternatives() {
        let coll = VariantCollection::new("ground")
            .with(Zoom::Normal, VariantKey::new(), sprites("g", 3, Zoom::Normal))
            .unwrap()
            .with(Zoom::X2, VariantKey::new(), sprites("g", 3, Zoom::X2))
            .unwrap()
            .with(Zoom::Normal, tropical(), sprites("t", 3, Zoom::Normal))
            .unwrap();

        let mut ctx = BuildContext::new(GfxConfig::default());
        coll.replace_old(&mut ctx, 3924).unwrap();
        let plan = ctx.finalize().unwrap();
        assert_eq!(plan.blocks().len(), 2);

        let tropical_block = &plan.blocks()[0];
        assert_eq!(tropical_block.key, tropical());
        assert_eq!(tropical_block.old_runs[0].first_id, 3924);
        assert_eq!(tropical_block.old_runs[0].sprites[0].sprites().len(), 1);

        let generic = &plan.blocks()[1];
        assert_eq!(generic.old_runs[0].len(), 3);
        assert!(matches!(generic.old_runs[0].sprites[2], SlotSprite::Alternatives(_)));
    }

    #[test]
    fn test_replace_new_and_length_mismatch() {
        let coll = VariantCollection::new("signals")
            .with(Zoom::Normal, VariantKey::new(), sprites("s", 2, Zoom::Normal))
            .unwrap();
        let mut ctx = BuildContext::new(GfxConfig::default());
        coll.replace_new(&mut ctx, 0x04, 8).unwrap();
        let plan = ctx.finalize().unwrap();
        let run = &plan.blocks()[0].new_runs[0];
        assert_eq!((run.set_type, run.offset, run.len()), (0x04, 8, 2));

        let uneven = VariantCollection::new("uneven")
            .with(Zoom::Normal, VariantKey::new(), sprites("u", 2, Zoom::Normal))
            .unwrap()
            .with(Zoom::X4, VariantKey::new(), sprites("u", 3, Zoom::X4))
            .unwrap();
        let mut ctx = BuildContext::new(GfxConfig::default());
        let err = uneven.replace_old(&mut ctx, 0).unwrap_err();
        assert!(matches!(err, VariantError::LengthMismatch { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_replace_after_finalize_fails() {
        let coll = VariantCollection::new("late")
            .with(Zoom::Normal, VariantKey::new(), sprites("l", 1, Zoom::Normal))
            .unwrap();
        let mut ctx = BuildContext::new(GfxConfig::default());
        ctx.finalize().unwrap();
        let err = coll.replace_old(&mut ctx, 1).unwrap_err();
        assert!(matches!(err, VariantError::Build(BuildError::Finalized)));
    }

    #[test]
    fn test_replace_rejects_slot_overflow() {
        let coll = VariantCollection::new("edge")
            .with(Zoom::Normal, VariantKey::new(), sprites("e", 2, Zoom::Normal))
            .unwrap();

        let mut ctx = BuildContext::new(GfxConfig::default());
        let err = coll.replace_old(&mut ctx, u32::MAX).unwrap_err();
        assert!(matches!(err, VariantError::SlotOverflow { start: u32::MAX, index: 1, .. }));

        coll.replace_new(&mut ctx, 0x04, u32::MAX - 1).unwrap();
        let err = coll.replace_new(&mut ctx, 0x04, u32::MAX).unwrap_err();
        assert!(err.to_string().contains("edge"), "unexpected error: {}", err);
    }
}
