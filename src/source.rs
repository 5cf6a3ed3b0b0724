//! The static-data bundle backing a fit. Switching a fit's
//! source re-acquires every holder's `Type` and drops all caches.

use crate::error::DataError;
use crate::ids::{AttrId, EffectKey, ModifierKey, TypeKey};
use crate::static_data::{
    AttributeMeta, AttributeRow, Effect, EffectRow, Modifier, ModifierRow, Type, TypeRow,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A resolved static-data bundle: the typed tables a `Fit` reads from.
///
/// Holders whose type is unknown in a given source resolve to `None`
/// from `Source::type_of` and fall back to attribute defaults — there is
/// no separate "NullSource" type; an empty `Source` (or one simply
/// missing a type) already behaves that way.
#[derive(Debug, Default)]
pub struct Source {
    types: HashMap<TypeKey, Arc<Type>>,
    attributes: HashMap<AttrId, AttributeMeta>,
    effects: HashMap<EffectKey, Arc<Effect>>,
    modifiers: HashMap<ModifierKey, Arc<Modifier>>,
    /// Modifier ids whose row carried an unrecognized operator/domain/
    /// filter_type/state/context code. Kept distinct from "no row with
    /// this id at all" (an `UnknownModifier` build error) so a live fit
    /// can log a WARNING once per carrier and drop just that modifier,
    /// leaving the rest of its effect's modifiers in force.
    malformed_modifiers: HashSet<ModifierKey>,
}

impl Source {
    /// Build a `Source` from data-pipeline rows (a "keyed collection of
    /// tables"). A modifier row with an unrecognized code is recorded as
    /// malformed rather than rejected here — building a `Source` has no
    /// carrier to attribute the WARNING to, so the drop (and the log
    /// line) happens later, when a live fit tries to activate it.
    pub fn from_rows(
        attribute_rows: Vec<AttributeRow>,
        type_rows: Vec<TypeRow>,
        effect_rows: Vec<EffectRow>,
        modifier_rows: Vec<ModifierRow>,
    ) -> Result<Self, DataError> {
        let mut attributes = HashMap::new();
        for row in attribute_rows {
            attributes.insert(
                row.id,
                AttributeMeta {
                    id: row.id,
                    stackable: row.stackable,
                    high_is_good: row.high_is_good,
                    default_value: row.default_value,
                },
            );
        }

        let mut modifiers = HashMap::new();
        let mut malformed_modifiers = HashSet::new();
        for row in modifier_rows {
            let id = row.id;
            match row.into_modifier() {
                Some(modifier) => {
                    modifiers.insert(id, Arc::new(modifier));
                }
                None => {
                    malformed_modifiers.insert(id);
                }
            }
        }

        let mut effects = HashMap::new();
        for row in effect_rows {
            let id = row.id;
            for m in &row.modifiers {
                if !modifiers.contains_key(m) && !malformed_modifiers.contains(m) {
                    return Err(DataError::UnknownModifier(id, *m));
                }
            }
            let effect = row.into_effect()?;
            effects.insert(id, Arc::new(effect));
        }

        let mut types = HashMap::new();
        for row in type_rows {
            if types.contains_key(&row.id) {
                return Err(DataError::DuplicateType(row.id));
            }
            for e in &row.effects {
                if !effects.contains_key(e) {
                    return Err(DataError::UnknownEffect(row.id, *e));
                }
            }
            types.insert(
                row.id,
                Arc::new(Type {
                    id: row.id,
                    group_id: row.group_id,
                    category: row.category,
                    attributes: row.attributes,
                    effects: row.effects.into_iter().collect(),
                    default_effect: row.default_effect,
                    required_skills: row.required_skills.into_iter().collect(),
                }),
            );
        }

        debug!(
            target: "fitcalc::builder",
            types = types.len(),
            effects = effects.len(),
            modifiers = modifiers.len(),
            attributes = attributes.len(),
            "built source"
        );

        Ok(Self {
            types,
            attributes,
            effects,
            modifiers,
            malformed_modifiers,
        })
    }

    /// Build a `Source` directly from a data-pipeline JSON document
    /// (the external data contract, made concrete).
    pub fn from_json(document: &str) -> Result<Self, SourceLoadError> {
        #[derive(serde::Deserialize)]
        struct Document {
            #[serde(default)]
            attributes: Vec<AttributeRow>,
            #[serde(default)]
            types: Vec<TypeRow>,
            #[serde(default)]
            effects: Vec<EffectRow>,
            #[serde(default)]
            modifiers: Vec<ModifierRow>,
        }

        let doc: Document = serde_json::from_str(document)?;
        let source = Self::from_rows(doc.attributes, doc.types, doc.effects, doc.modifiers)?;
        Ok(source)
    }

    pub fn type_of(&self, type_key: TypeKey) -> Option<Arc<Type>> {
        self.types.get(&type_key).cloned()
    }

    pub fn attribute_meta(&self, attr: AttrId) -> Option<AttributeMeta> {
        self.attributes.get(&attr).copied()
    }

    pub fn effect(&self, effect_key: EffectKey) -> Option<Arc<Effect>> {
        self.effects.get(&effect_key).cloned()
    }

    pub fn modifier(&self, modifier_key: ModifierKey) -> Option<Arc<Modifier>> {
        self.modifiers.get(&modifier_key).cloned()
    }

    /// Whether `modifier_key` refers to a row that parsed with an
    /// unrecognized code, as opposed to not existing at all.
    pub fn is_malformed_modifier(&self, modifier_key: ModifierKey) -> bool {
        self.malformed_modifiers.contains(&modifier_key)
    }

    /// An empty source. Every holder resolves to `None` and every
    /// attribute read yields its default — this *is* the "NullSource"
    /// sentinel; it needs no separate type.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceLoadError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Data(#[from] DataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_resolves_nothing() {
        let source = Source::empty();
        assert!(source.type_of(TypeKey(1)).is_none());
        assert!(source.attribute_meta(AttrId(1)).is_none());
    }

    #[test]
    fn from_rows_rejects_dangling_effect_reference() {
        let type_rows = vec![TypeRow {
            id: TypeKey(1),
            group_id: crate::ids::GroupId(1),
            category: crate::static_data::HolderCategory::Module,
            attributes: HashMap::new(),
            effects: vec![EffectKey(99)],
            default_effect: None,
            required_skills: vec![],
        }];
        let err = Source::from_rows(vec![], type_rows, vec![], vec![]).unwrap_err();
        assert_eq!(err, DataError::UnknownEffect(TypeKey(1), EffectKey(99)));
    }

    #[test]
    fn from_rows_records_malformed_modifier_without_failing_the_build() {
        let modifier_rows = vec![ModifierRow {
            id: ModifierKey(1),
            state: 0,
            context: 0,
            src_attr: AttrId(1),
            operator: 0,
            tgt_attr: AttrId(2),
            domain: 0,
            filter_type: 26500,
            filter_value: 0,
        }];
        let effect_rows = vec![crate::static_data::EffectRow {
            id: EffectKey(1),
            category: 0,
            modifiers: vec![ModifierKey(1)],
        }];
        let source = Source::from_rows(vec![], vec![], effect_rows, modifier_rows).unwrap();
        assert!(source.is_malformed_modifier(ModifierKey(1)));
        assert!(source.modifier(ModifierKey(1)).is_none());
    }

    #[test]
    fn from_json_round_trips_a_minimal_document() {
        let json = r#"{
            "attributes": [{"id": 1, "stackable": false, "high_is_good": true, "default_value": 0.0}],
            "types": [{"id": 10, "group_id": 1, "category": "Module", "attributes": {"1": 100.0}, "effects": [], "default_effect": null, "required_skills": []}],
            "effects": [],
            "modifiers": []
        }"#;
        let source = Source::from_json(json).unwrap();
        let ty = source.type_of(TypeKey(10)).unwrap();
        assert_eq!(ty.attributes.get(&AttrId(1)), Some(&100.0));
    }
}
