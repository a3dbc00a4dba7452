//! Bounded cache of font instances.
//!
//! Keys combine path, pixel size and the three style axes. The table has a
//! fixed capacity and never evicts: a font may still be referenced anywhere
//! in the UI, so a full cache is reported as [`FontError::CapacityExceeded`]
//! instead of reusing a slot. Lookups for keys already present always succeed.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FontError, FontResult};
use crate::face::StyleAxes;
use crate::font::FontInstance;
use crate::logging::targets;
use crate::table::{ProbeHash, ProbeTable, djb2};

/// Everything that distinguishes one font instance from another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    /// Font file.
    pub path: PathBuf,
    /// Pixel size.
    pub pixel_size: u32,
    /// Requested style axes.
    pub axes: StyleAxes,
}

impl FontKey {
    /// A key with no style axes requested.
    pub fn new(path: impl Into<PathBuf>, pixel_size: u32) -> Self {
        Self {
            path: path.into(),
            pixel_size,
            axes: StyleAxes::DEFAULT,
        }
    }

    /// Replace the style axes.
    pub fn with_axes(mut self, axes: StyleAxes) -> Self {
        self.axes = axes;
        self
    }

    /// Request a weight.
    pub fn weight(mut self, weight: i32) -> Self {
        self.axes.weight = Some(weight);
        self
    }

    /// Request a slant.
    pub fn slant(mut self, slant: i32) -> Self {
        self.axes.slant = Some(slant);
        self
    }

    /// Request a width.
    pub fn width(mut self, width: i32) -> Self {
        self.axes.width = Some(width);
        self
    }

    /// Same path and axes at another pixel size.
    pub fn with_size(&self, pixel_size: u32) -> Self {
        Self {
            pixel_size,
            ..self.clone()
        }
    }

    /// The font file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Unset axes hash as `i32::MIN`, which no real axis value uses.
fn axis_or_sentinel(value: Option<i32>) -> i32 {
    value.unwrap_or(i32::MIN)
}

impl ProbeHash for FontKey {
    fn probe_hash(&self) -> u64 {
        let joined = format!(
            "{}{}{}{}{}",
            self.path.display(),
            self.pixel_size,
            axis_or_sentinel(self.axes.weight),
            axis_or_sentinel(self.axes.slant),
            axis_or_sentinel(self.axes.width),
        );
        u64::from(djb2(joined.as_bytes()))
    }
}

impl fmt::Display for FontKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}", self.path.display(), self.pixel_size)?;
        if self.axes.any() {
            let mut parts = Vec::new();
            if let Some(w) = self.axes.weight {
                parts.push(format!("weight = {w}"));
            }
            if let Some(s) = self.axes.slant {
                parts.push(format!("slant = {s}"));
            }
            if let Some(w) = self.axes.width {
                parts.push(format!("width = {w}"));
            }
            write!(f, " ({})", parts.join(", "))?;
        }
        write!(f, "]")
    }
}

/// Handle to a font instance owned by a [`FontCache`].
///
/// Handles are plain indices: cheap to copy, and valid for the lifetime of the
/// cache that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(u32);

impl FontId {
    /// Handle for slot `index`.
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Slot index of this handle.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font#{}", self.0)
    }
}

/// Fixed-capacity, deduplicating store of font instances.
pub struct FontCache {
    index: ProbeTable<FontKey, FontId>,
    fonts: Vec<FontInstance>,
    capacity: usize,
}

impl FontCache {
    /// A cache holding at most `capacity` fonts.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: ProbeTable::with_capacity(capacity),
            fonts: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of fonts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of loaded fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether no font is loaded.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Handle for `key` if it is already loaded.
    pub fn find(&self, key: &FontKey) -> Option<FontId> {
        self.index.get(key).copied()
    }

    /// Handle for `key`, loading it with `load` on a miss.
    ///
    /// A miss on a full cache fails with [`FontError::CapacityExceeded`]
    /// without calling `load`. A failed load leaves the cache unchanged.
    pub fn get_or_load(
        &mut self,
        key: &FontKey,
        load: impl FnOnce(&FontKey) -> FontResult<FontInstance>,
    ) -> FontResult<FontId> {
        if let Some(id) = self.find(key) {
            return Ok(id);
        }

        if self.fonts.len() >= self.capacity || self.index.is_full() {
            return Err(FontError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        debug!(target: targets::FONT, font = %key, "font cache miss");
        let font = load(key)?;

        let id = FontId(self.fonts.len() as u32);
        self.index
            .insert(key.clone(), id)
            .map_err(|full| FontError::CapacityExceeded {
                capacity: full.capacity,
            })?;
        self.fonts.push(font);
        Ok(id)
    }

    /// The font behind a handle.
    pub fn get(&self, id: FontId) -> Option<&FontInstance> {
        self.fonts.get(id.0 as usize)
    }

    /// The font behind a handle, mutably.
    pub fn get_mut(&mut self, id: FontId) -> Option<&mut FontInstance> {
        self.fonts.get_mut(id.0 as usize)
    }

    /// All loaded fonts with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (FontId, &FontInstance)> {
        self.fonts
            .iter()
            .enumerate()
            .map(|(i, font)| (FontId(i as u32), font))
    }

    /// Release every font.
    pub fn clear(&mut self) {
        self.index = ProbeTable::with_capacity(self.capacity);
        self.fonts.clear();
    }
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCache")
            .field("len", &self.fonts.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let plain = FontKey::new("fonts/Inter.ttf", 14);
        assert_eq!(plain.to_string(), "[fonts/Inter.ttf 14]");

        let styled = FontKey::new("fonts/Inter.ttf", 14).weight(700).width(90);
        assert_eq!(
            styled.to_string(),
            "[fonts/Inter.ttf 14 (weight = 700, width = 90)]"
        );
    }

    #[test]
    fn test_unset_axis_differs_from_any_value() {
        let unset = FontKey::new("a.ttf", 12);
        let zero = FontKey::new("a.ttf", 12).weight(0);
        assert_ne!(unset, zero);
        assert_ne!(unset.probe_hash(), zero.probe_hash());
    }

    #[test]
    fn test_equal_keys_hash_equal() {
        let a = FontKey::new("a.ttf", 12).slant(-8);
        let b = FontKey::new("a.ttf", 12).slant(-8);
        assert_eq!(a, b);
        assert_eq!(a.probe_hash(), b.probe_hash());
    }

    #[test]
    fn test_with_size_keeps_axes() {
        let base = FontKey::new("a.ttf", 12).weight(300);
        let big = base.with_size(24);
        assert_eq!(big.pixel_size, 24);
        assert_eq!(big.axes, base.axes);
        assert_eq!(big.path, base.path);
    }

    #[test]
    fn test_empty_cache() {
        let cache = FontCache::new(4);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 4);
        assert_eq!(cache.find(&FontKey::new("a.ttf", 12)), None);
        assert!(cache.get(FontId::from_index(0)).is_none());
    }

    #[test]
    fn test_failed_load_leaves_cache_empty() {
        let mut cache = FontCache::new(1);
        let err = cache
            .get_or_load(&FontKey::new("a.ttf", 12), |key| {
                Err(FontError::Load {
                    path: key.path.clone(),
                    reason: "missing".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, FontError::Load { .. }));
        assert!(cache.is_empty());
    }
}
