//! Identifier types for the static-data tables and for runtime holders.
//!
//! These are thin newtypes over integers (for data-pipeline ids) or over an
//! arena slot (for holders). Keeping them distinct types instead of raw
//! `u32`/`i64` prevents accidentally indexing one table with another
//! table's key.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! data_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

data_id!(AttrId);
data_id!(TypeKey);
data_id!(GroupId);
data_id!(EffectKey);
data_id!(ModifierKey);

/// The skill-level attribute: the one attribute the write whitelist
/// permits writing directly, via `AttributeMap::set`.
pub const SKILL_LEVEL_ATTR: AttrId = AttrId(280);

/// Identity of a holder bound to a fit.
///
/// Holders are compared by identity, not value ("set of unique
/// mutable objects keyed by identity"), so this is an arena index plus a
/// generation counter rather than a value derived from the holder's
/// contents — two holders of the same type can coexist and must remain
/// distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Holder#{}.{}", self.index, self.generation)
    }
}
