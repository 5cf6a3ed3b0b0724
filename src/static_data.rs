//! Immutable descriptors produced by the (out-of-scope) data pipeline:
//! `Type`, attribute metadata, `Effect`, `Modifier`. These are
//! freely shared across holders and fits once built; nothing in this
//! module mutates a record after construction.

use crate::error::DataError;
use crate::ids::{AttrId, EffectKey, GroupId, ModifierKey, TypeKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The holder's activation level. Ordered: `Offline < Online < Active <
/// Overload`. Also doubles as the "minimum state" carried by a
/// `Modifier` and the state an `EffectCategory` activates at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HolderState {
    Offline,
    Online,
    Active,
    Overload,
}

/// Raw integer code for `Effect.category` as produced by the data
/// pipeline. `Area` and `Dungeon` are reserved codes that are
/// never valid on a built record; encountering them is a [`DataError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCategory {
    Passive,
    Active,
    Target,
    Online,
    Overload,
    System,
}

impl EffectCategory {
    /// The minimum holder state at which this effect (and its
    /// modifiers) becomes live.
    pub fn min_state(self) -> HolderState {
        match self {
            EffectCategory::Passive => HolderState::Offline,
            EffectCategory::Online => HolderState::Online,
            EffectCategory::Active => HolderState::Active,
            EffectCategory::Overload => HolderState::Overload,
            // `target` effects project onto another holder once this
            // holder's module is active; treated the same as `active`
            // for the purpose of the *carrier's* own state gate.
            EffectCategory::Target => HolderState::Active,
            EffectCategory::System => HolderState::Offline,
        }
    }

    fn from_code(effect: EffectKey, code: i64) -> Result<Self, DataError> {
        match code {
            0 => Ok(EffectCategory::Passive),
            1 => Ok(EffectCategory::Active),
            2 => Ok(EffectCategory::Target),
            4 => Ok(EffectCategory::Online),
            5 => Ok(EffectCategory::Overload),
            7 => Ok(EffectCategory::System),
            other => Err(DataError::UnknownEffectCategory(effect, other)),
        }
    }
}

/// Where a modifier's magnitude comes from relative to its carrier, and
/// whether it can cross fit boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierContext {
    Local,
    Projected,
    Gang,
}

/// How a modifier's magnitude combines with the running accumulator
/// (the canonical fold order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    PreAssignment,
    PreMul,
    PreDiv,
    ModAdd,
    ModSub,
    PostMul,
    PostDiv,
    PostPercent,
    PostAssignment,
}

impl Operator {
    /// Canonical fold order for composing modifiers onto an accumulator.
    pub const ORDER: [Operator; 9] = [
        Operator::PreAssignment,
        Operator::PreMul,
        Operator::PreDiv,
        Operator::ModAdd,
        Operator::ModSub,
        Operator::PostMul,
        Operator::PostDiv,
        Operator::PostPercent,
        Operator::PostAssignment,
    ];

    pub fn is_assignment(self) -> bool {
        matches!(self, Operator::PreAssignment | Operator::PostAssignment)
    }

    pub fn is_additive(self) -> bool {
        matches!(self, Operator::ModAdd | Operator::ModSub)
    }

    /// Multiplicative operators are the only ones eligible for the
    /// stacking penalty.
    pub fn is_multiplicative(self) -> bool {
        matches!(
            self,
            Operator::PreMul | Operator::PreDiv | Operator::PostMul | Operator::PostDiv | Operator::PostPercent
        )
    }

    /// Which fold rule applies to this operator.
    pub fn category(self) -> OperatorCategory {
        if self.is_assignment() {
            OperatorCategory::Assignment
        } else if self.is_additive() {
            OperatorCategory::Additive
        } else {
            OperatorCategory::Multiplicative
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Operator::PreAssignment),
            1 => Some(Operator::PreMul),
            2 => Some(Operator::PreDiv),
            3 => Some(Operator::ModAdd),
            4 => Some(Operator::ModSub),
            5 => Some(Operator::PostMul),
            6 => Some(Operator::PostDiv),
            7 => Some(Operator::PostPercent),
            8 => Some(Operator::PostAssignment),
            _ => None,
        }
    }
}

/// The three fold behaviors an operator can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCategory {
    Assignment,
    Additive,
    Multiplicative,
}

/// Which holder (relative to the carrier) roots a modifier's filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    SelfDomain,
    Character,
    Ship,
    Target,
    Other,
}

impl Domain {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Domain::SelfDomain),
            1 => Some(Domain::Character),
            2 => Some(Domain::Ship),
            3 => Some(Domain::Target),
            4 => Some(Domain::Other),
            _ => None,
        }
    }
}

/// A selector within the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    All,
    Group,
    Skill,
    SkillSelf,
}

impl FilterType {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FilterType::None),
            1 => Some(FilterType::All),
            2 => Some(FilterType::Group),
            3 => Some(FilterType::Skill),
            4 => Some(FilterType::SkillSelf),
            _ => None,
        }
    }
}

/// A declarative rule: combine `src_attr`'s (modified) value into
/// `tgt_attr` via `operator`, on every holder the domain/filter pair
/// resolves to, while the carrier is at or above `state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub id: ModifierKey,
    pub state: HolderState,
    pub context: ModifierContext,
    pub src_attr: AttrId,
    pub operator: Operator,
    pub tgt_attr: AttrId,
    pub domain: Domain,
    pub filter_type: FilterType,
    pub filter_value: i64,
}

/// Immutable attribute metadata, distinct from a `Type`'s
/// per-holder base *value* for that attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeMeta {
    pub id: AttrId,
    pub stackable: bool,
    pub high_is_good: bool,
    pub default_value: f64,
}

/// A declarative bundle of modifiers, gated by `category`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub id: EffectKey,
    pub category: EffectCategory,
    pub modifiers: Vec<ModifierKey>,
}

/// Coarse runtime kind of a holder, used by the penalty-immunity test
/// and by the "filter=skill" selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolderCategory {
    Ship,
    Character,
    Module,
    Drone,
    Charge,
    Skill,
    Implant,
    Subsystem,
    Structure,
    Fighter,
}

/// Categories whose own modifiers are never subject to the stacking
/// penalty, regardless of the target attribute's `stackable` flag.
pub const PENALTY_IMMUNE_CATEGORIES: [HolderCategory; 5] = [
    HolderCategory::Ship,
    HolderCategory::Charge,
    HolderCategory::Skill,
    HolderCategory::Implant,
    HolderCategory::Subsystem,
];

/// An immutable item descriptor. Base attribute values here are
/// read-only; all mutation happens through `AttributeMap` writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub id: TypeKey,
    pub group_id: GroupId,
    pub category: HolderCategory,
    pub attributes: HashMap<AttrId, f64>,
    pub effects: HashSet<EffectKey>,
    pub default_effect: Option<EffectKey>,
    /// Skills a holder of this type requires (used by `filter_type =
    /// skill`/`skill_self`).
    pub required_skills: HashSet<TypeKey>,
}

// ---------------------------------------------------------------------
// Data-pipeline row schemas: the wire shape the (out-of-scope) cache
// generator is contracted to produce. `Source::from_rows` turns these
// into the typed records above.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeRow {
    pub id: AttrId,
    pub stackable: bool,
    pub high_is_good: bool,
    pub default_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRow {
    pub id: TypeKey,
    pub group_id: GroupId,
    pub category: HolderCategory,
    #[serde(default)]
    pub attributes: HashMap<AttrId, f64>,
    #[serde(default)]
    pub effects: Vec<EffectKey>,
    pub default_effect: Option<EffectKey>,
    #[serde(default)]
    pub required_skills: Vec<TypeKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectRow {
    pub id: EffectKey,
    /// Raw category code; see `EffectCategory::from_code`.
    pub category: i64,
    #[serde(default)]
    pub modifiers: Vec<ModifierKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierRow {
    pub id: ModifierKey,
    /// Raw `HolderState` ordinal: 0=offline, 1=online, 2=active, 3=overload.
    pub state: u8,
    /// 0=local, 1=projected, 2=gang.
    pub context: u8,
    pub src_attr: AttrId,
    /// See `Operator::from_code`.
    pub operator: i64,
    pub tgt_attr: AttrId,
    /// See `Domain::from_code`.
    pub domain: i64,
    /// See `FilterType::from_code`.
    pub filter_type: i64,
    pub filter_value: i64,
}

impl ModifierRow {
    /// Turns a raw row into a typed `Modifier`, or `None` if any of its
    /// integer codes (state, context, operator, domain, filter_type) is
    /// unrecognized. Unlike an effect's category code, an unrecognized
    /// modifier code is not a hard build error: the caller records the
    /// modifier id as malformed and the modifier is dropped once a live
    /// fit tries to activate it, leaving the rest of its effect's
    /// modifiers in force.
    pub(crate) fn into_modifier(self) -> Option<Modifier> {
        let state = match self.state {
            0 => HolderState::Offline,
            1 => HolderState::Online,
            2 => HolderState::Active,
            3 => HolderState::Overload,
            _ => return None,
        };
        let context = match self.context {
            0 => ModifierContext::Local,
            1 => ModifierContext::Projected,
            2 => ModifierContext::Gang,
            _ => return None,
        };
        Some(Modifier {
            id: self.id,
            state,
            context,
            src_attr: self.src_attr,
            operator: Operator::from_code(self.operator)?,
            tgt_attr: self.tgt_attr,
            domain: Domain::from_code(self.domain)?,
            filter_type: FilterType::from_code(self.filter_type)?,
            filter_value: self.filter_value,
        })
    }
}

impl EffectRow {
    pub(crate) fn into_effect(self) -> Result<Effect, DataError> {
        Ok(Effect {
            id: self.id,
            category: EffectCategory::from_code(self.id, self.category)?,
            modifiers: self.modifiers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_category_maps_min_state() {
        assert_eq!(EffectCategory::Passive.min_state(), HolderState::Offline);
        assert_eq!(EffectCategory::Online.min_state(), HolderState::Online);
        assert_eq!(EffectCategory::Active.min_state(), HolderState::Active);
        assert_eq!(EffectCategory::Overload.min_state(), HolderState::Overload);
        assert_eq!(EffectCategory::System.min_state(), HolderState::Offline);
    }

    #[test]
    fn unknown_effect_category_code_is_rejected() {
        let err = EffectCategory::from_code(EffectKey(1), 3).unwrap_err();
        assert_eq!(err, DataError::UnknownEffectCategory(EffectKey(1), 3));

        let err = EffectCategory::from_code(EffectKey(1), 6).unwrap_err();
        assert_eq!(err, DataError::UnknownEffectCategory(EffectKey(1), 6));
    }

    #[test]
    fn holder_state_orders_offline_below_overload() {
        assert!(HolderState::Offline < HolderState::Online);
        assert!(HolderState::Online < HolderState::Active);
        assert!(HolderState::Active < HolderState::Overload);
    }

    #[test]
    fn modifier_row_with_unknown_operator_is_malformed() {
        let row = ModifierRow {
            id: ModifierKey(1),
            state: 0,
            context: 0,
            src_attr: AttrId(1),
            operator: 99,
            tgt_attr: AttrId(2),
            domain: 0,
            filter_type: 0,
            filter_value: 0,
        };
        assert!(row.into_modifier().is_none());
    }

    #[test]
    fn modifier_row_with_unknown_filter_type_is_malformed() {
        let row = ModifierRow {
            id: ModifierKey(2),
            state: 0,
            context: 0,
            src_attr: AttrId(1),
            operator: 0,
            tgt_attr: AttrId(2),
            domain: 0,
            filter_type: 26500,
            filter_value: 0,
        };
        assert!(row.into_modifier().is_none());
    }
}
