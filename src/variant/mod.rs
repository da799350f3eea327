//! Variant keys and keyed sprite collections
//!
//! Same-named sprites come in variants: per climate, per zoom level, with or
//! without thin lines, per vehicle generation. A [`VariantKey`] tags each
//! variant with the attributes that distinguish it; a [`VariantCollection`]
//! selects and pairs variants by those tags.

mod collection;

pub use collection::{VariantCollection, VariantEntry, VariantError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::sprite::Zoom;

/// Regional art ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Climate {
    Temperate,
    Arctic,
    Tropical,
    Toyland,
}

impl Climate {
    pub const ALL: [Climate; 4] = [Climate::Temperate, Climate::Arctic, Climate::Tropical, Climate::Toyland];

    /// Value of the engine's climate variable for this climate.
    pub fn id(self) -> u8 {
        match self {
            Climate::Temperate => 0,
            Climate::Arctic => 1,
            Climate::Tropical => 2,
            Climate::Toyland => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Climate::Temperate => "temperate",
            Climate::Arctic => "arctic",
            Climate::Tropical => "tropical",
            Climate::Toyland => "toyland",
        }
    }
}

impl fmt::Display for Climate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of attribute/value pairs distinguishing sprite variants.
///
/// Recognised attributes are typed fields; anything else goes into `extra`.
/// An unset attribute means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<Climate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<Zoom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Both present and different.
fn differs<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x != y)
}

/// Unset, or equal to the other side.
fn within<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    a.is_none() || a == b
}

impl VariantKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_climate(mut self, climate: Climate) -> Self {
        self.climate = Some(climate);
        self
    }

    pub fn with_zoom(mut self, zoom: Zoom) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn with_thin(mut self, thin: bool) -> Self {
        self.thin = Some(thin);
        self
    }

    pub fn with_generation(mut self, generation: u8) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Number of set attributes.
    pub fn len(&self) -> usize {
        usize::from(self.climate.is_some())
            + usize::from(self.zoom.is_some())
            + usize::from(self.thin.is_some())
            + usize::from(self.generation.is_some())
            + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every attribute set here is set to the same value in `other`.
    pub fn is_subset_of(&self, other: &VariantKey) -> bool {
        within(&self.climate, &other.climate)
            && within(&self.zoom, &other.zoom)
            && within(&self.thin, &other.thin)
            && within(&self.generation, &other.generation)
            && self.extra.iter().all(|(k, v)| other.extra.get(k) == Some(v))
    }

    /// `other`'s attributes plus at least one more.
    pub fn is_strict_superset_of(&self, other: &VariantKey) -> bool {
        other.is_subset_of(self) && self.len() > other.len()
    }

    /// Some attribute is set on both sides with different values.
    pub fn conflicts_with(&self, other: &VariantKey) -> bool {
        differs(&self.climate, &other.climate)
            || differs(&self.zoom, &other.zoom)
            || differs(&self.thin, &other.thin)
            || differs(&self.generation, &other.generation)
            || self.extra.iter().any(|(k, v)| other.extra.get(k).is_some_and(|o| o != v))
    }

    /// All attributes of both keys, or `None` if they conflict.
    pub fn union(&self, other: &VariantKey) -> Option<VariantKey> {
        if self.conflicts_with(other) {
            return None;
        }
        let mut extra = self.extra.clone();
        extra.extend(other.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(VariantKey {
            climate: self.climate.or(other.climate),
            zoom: self.zoom.or(other.zoom),
            thin: self.thin.or(other.thin),
            generation: self.generation.or(other.generation),
            extra,
        })
    }

    /// The same key without its zoom attribute.
    pub fn without_zoom(&self) -> VariantKey {
        VariantKey { zoom: None, ..self.clone() }
    }

    /// Attributes as sorted `(name, value)` strings.
    pub fn attributes(&self) -> Vec<(String, String)> {
        let mut attrs = BTreeMap::new();
        if let Some(climate) = self.climate {
            attrs.insert("climate".to_string(), climate.to_string());
        }
        if let Some(zoom) = self.zoom {
            attrs.insert("zoom".to_string(), zoom.to_string());
        }
        if let Some(thin) = self.thin {
            attrs.insert("thin".to_string(), thin.to_string());
        }
        if let Some(generation) = self.generation {
            attrs.insert("generation".to_string(), generation.to_string());
        }
        for (k, v) in &self.extra {
            attrs.insert(k.clone(), v.clone());
        }
        attrs.into_iter().collect()
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attrs: Vec<String> = self.attributes().into_iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", attrs.join(", "))
    }
}
