//! Attribute calculation engine for ship fits: holders whose numeric
//! attributes are derived from a declarative network of modifiers,
//! composed under a stacking-penalty discipline and kept coherent by a
//! dependency-aware cache.
//!
//! A host application builds a [`Source`] from static data, creates a
//! [`Fit`], adds holders to it, and reads derived attribute values:
//!
//! ```
//! use fitcalc::prelude::*;
//!
//! let json = r#"{
//!     "attributes": [{"id": 1, "stackable": false, "high_is_good": true, "default_value": 0.0}],
//!     "types": [{"id": 10, "group_id": 1, "category": "Ship", "attributes": {"1": 1000.0}, "effects": [], "default_effect": null, "required_skills": []}],
//!     "effects": [],
//!     "modifiers": []
//! }"#;
//! let source = Source::from_json(json).unwrap();
//! let mut fit = Fit::with_source(source);
//! let ship = fit.add(TypeKey(10), HolderKind::Ship);
//! assert_eq!(fit.attribute(ship, AttrId(1)).unwrap(), 1000.0);
//! ```

mod affector_registry;
mod attribute_map;
mod calculation_service;
mod error;
mod fit;
mod holder;
mod ids;
mod link_tracker;
mod penalty;
mod source;
mod static_data;

pub use attribute_map::AttributeMap;
pub use error::{CalcError, DataError, FitError};
pub use fit::Fit;
pub use holder::{Holder, HolderKind};
pub use ids::{AttrId, EffectKey, GroupId, HolderId, ModifierKey, TypeKey, SKILL_LEVEL_ATTR};
pub use penalty::{penalize, PENALTY_BASE};
pub use source::{Source, SourceLoadError};
pub use static_data::{
    AttributeMeta, AttributeRow, Domain, Effect, EffectCategory, EffectRow, FilterType,
    HolderCategory, HolderState, Modifier, ModifierContext, ModifierRow, Operator,
    OperatorCategory, Type, TypeRow, PENALTY_IMMUNE_CATEGORIES,
};

/// Re-exports the types a consumer typically names at a call site.
pub mod prelude {
    pub use crate::{AttrId, Fit, Holder, HolderKind, HolderState, Source, TypeKey};
}
