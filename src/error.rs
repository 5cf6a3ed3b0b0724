//! Error kinds. Errors that are the engine's own fault
//! (malformed static data, calculation cycles) are logged and contained;
//! only caller-fault errors are returned to the caller, and they never
//! leave partial mutation behind.

use crate::ids::{AttrId, EffectKey, HolderId, ModifierKey, TypeKey};
use thiserror::Error;

/// Raised by `Fit`'s structural operations. These are precondition
/// failures reported *before* any mutation occurs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FitError {
    #[error("holder {0} is already bound to a different fit")]
    BoundElsewhere(HolderId),

    #[error("holder {0} is not a member of this fit")]
    NotAMember(HolderId),

    #[error("attribute {attr} is not writable on holder {holder} (not on the write whitelist)")]
    NotWritable { holder: HolderId, attr: AttrId },
}

/// Raised by `Fit::attribute`/`AttributeMap::get` when a value genuinely
/// cannot be produced: no base value and no default.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("attribute {attr} is missing on holder {holder}: no base value and no default")]
    AttributeMissing { holder: HolderId, attr: AttrId },
}

/// Raised while turning data-pipeline rows into static records.
///
/// A modifier row with an unrecognized operator/domain/filter_type/
/// state/context code is *not* one of these: it is recorded as
/// malformed and silently excluded once a live fit tries to activate
/// it (see `Source::is_malformed_modifier`), the same way a modifier
/// whose filter cannot be resolved against the current holder set is
/// dropped at the registry. These variants are reserved for shapes a
/// `Source` can never coherently represent: a dangling reference, or
/// an effect category code that has no defined behavior at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("type {0} references unknown effect {1}")]
    UnknownEffect(TypeKey, EffectKey),

    #[error("effect {0} has unknown category code {1}")]
    UnknownEffectCategory(EffectKey, i64),

    #[error("effect {0} references unknown modifier {1}")]
    UnknownModifier(EffectKey, ModifierKey),

    #[error("duplicate type id {0}")]
    DuplicateType(TypeKey),
}
