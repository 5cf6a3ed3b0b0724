//! A holder's cached, calculated attribute values — the
//! "AttributeMap": "a cache plus a small whitelist of directly
//! writable attributes").
//!
//! The cache itself is just a `HashMap`; the calculation that fills it
//! lives in [`crate::calculation_service`] so this type stays a plain
//! data holder with no knowledge of modifiers or other holders.

use crate::ids::AttrId;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    pub(crate) cache: HashMap<AttrId, f64>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for `attr`, if one has already been computed.
    pub fn get_cached(&self, attr: AttrId) -> Option<f64> {
        self.cache.get(&attr).copied()
    }

    /// Write straight into the cache, bypassing calculation. Callers
    /// (`Fit::set_attribute`) are responsible for checking
    /// `Holder::is_attribute_writable` first and for
    /// invalidating dependents afterward.
    pub(crate) fn set(&mut self, attr: AttrId, value: f64) {
        self.cache.insert(attr, value);
    }

    pub(crate) fn clear(&mut self) {
        self.cache.clear();
    }

    pub(crate) fn clear_attribute(&mut self, attr: AttrId) {
        self.cache.remove(&attr);
    }
}
