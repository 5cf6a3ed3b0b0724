//! Runtime instance of a typed item bound to a fit.

use crate::attribute_map::AttributeMap;
use crate::ids::{HolderId, TypeKey, SKILL_LEVEL_ATTR};
use crate::ids::AttrId;
use crate::static_data::{HolderCategory, HolderState, Type};
use std::sync::Arc;

/// Tagged variant over the holder kinds the system models (ship,
/// character, module, drone, skill, implant, ...), carrying only the
/// kind-specific relations each one needs instead of a class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderKind {
    Ship,
    Character,
    Module { charge: Option<HolderId> },
    Drone,
    Charge { module: Option<HolderId> },
    Skill,
    Implant,
    Subsystem,
    Structure,
    Fighter,
}

impl HolderKind {
    pub fn category(self) -> HolderCategory {
        match self {
            HolderKind::Ship => HolderCategory::Ship,
            HolderKind::Character => HolderCategory::Character,
            HolderKind::Module { .. } => HolderCategory::Module,
            HolderKind::Drone => HolderCategory::Drone,
            HolderKind::Charge { .. } => HolderCategory::Charge,
            HolderKind::Skill => HolderCategory::Skill,
            HolderKind::Implant => HolderCategory::Implant,
            HolderKind::Subsystem => HolderCategory::Subsystem,
            HolderKind::Structure => HolderCategory::Structure,
            HolderKind::Fighter => HolderCategory::Fighter,
        }
    }
}

/// A runtime item bound to at most one fit. Owns its own `AttributeMap`
/// (inlined rather than a separate heap object with a back-reference,
/// per the no-reference-cycles design note).
#[derive(Debug)]
pub struct Holder {
    pub(crate) id: HolderId,
    pub(crate) type_key: TypeKey,
    /// `None` under `NullSource`, or when the source has no record for
    /// `type_key`.
    pub(crate) resolved_type: Option<Arc<Type>>,
    pub(crate) state: HolderState,
    pub(crate) kind: HolderKind,
    /// The ship this holder is fit to, or `None` for the ship itself /
    /// character-only holders.
    pub(crate) ship: Option<HolderId>,
    /// The character this holder belongs to (skills, implants), or the
    /// character holder's own id for the character itself.
    pub(crate) character: Option<HolderId>,
    pub(crate) attribute_map: AttributeMap,
}

impl Holder {
    pub(crate) fn new(id: HolderId, type_key: TypeKey, kind: HolderKind) -> Self {
        Self {
            id,
            type_key,
            resolved_type: None,
            state: HolderState::Offline,
            kind,
            ship: None,
            character: None,
            attribute_map: AttributeMap::default(),
        }
    }

    pub fn id(&self) -> HolderId {
        self.id
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn state(&self) -> HolderState {
        self.state
    }

    pub fn kind(&self) -> HolderKind {
        self.kind
    }

    pub fn category(&self) -> HolderCategory {
        self.kind.category()
    }

    pub fn resolved_type(&self) -> Option<&Arc<Type>> {
        self.resolved_type.as_ref()
    }

    pub fn ship(&self) -> Option<HolderId> {
        self.ship
    }

    pub fn character(&self) -> Option<HolderId> {
        self.character
    }

    /// The base value for `attr` read straight off the resolved type,
    /// ignoring any modifiers. `None` means the type doesn't carry a
    /// base value for this attribute at all (the calculation then
    /// falls back to the attribute's own default).
    pub fn base_attribute(&self, attr: AttrId) -> Option<f64> {
        self.resolved_type
            .as_ref()
            .and_then(|t| t.attributes.get(&attr).copied())
    }

    /// Whether `attr` may be written directly via `AttributeMap::set`
    /// (a small whitelist, e.g. skill level).
    pub fn is_attribute_writable(&self, attr: AttrId) -> bool {
        matches!(self.kind, HolderKind::Skill) && attr == SKILL_LEVEL_ATTR
    }
}
