//! The consumer-facing container: owns holders, their shared
//! `LinkTracker`/`AffectorRegistry`/`CalculationService`, and the
//! current `Source`. This is the facade the rest of the crate exists to
//! support — a host application only ever touches a `Fit`.

use crate::affector_registry::{AffectorRegistry, HolderLookup};
use crate::calculation_service::{self, CalculationService};
use crate::error::{CalcError, FitError};
use crate::holder::{Holder, HolderKind};
use crate::ids::{AttrId, EffectKey, GroupId, HolderId, ModifierKey, TypeKey};
use crate::link_tracker::LinkTracker;
use crate::source::Source;
use crate::static_data::HolderState;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Builds a [`Lookup`] by borrowing only the holder-relevant fields of
/// `$self`, so the borrow checker sees disjoint field access instead of
/// a whole-`self` borrow — letting a caller hold this alongside `&mut
/// self.registry` or `&mut self.calc`.
macro_rules! lookup {
    ($self:ident) => {
        Lookup {
            holders: &$self.holders,
            ship: $self.ship,
            character: $self.character,
            target: $self.target,
        }
    };
}

#[derive(Debug)]
pub struct Fit {
    holders: HashMap<HolderId, Holder>,
    next_index: u32,
    ship: Option<HolderId>,
    character: Option<HolderId>,
    target: Option<HolderId>,
    source: Source,
    link_tracker: LinkTracker,
    registry: AffectorRegistry,
    calc: CalculationService,
    /// `(carrier, modifier)` pairs already warned about for carrying a
    /// malformed data-pipeline row, so re-evaluating the same carrier's
    /// effects on a later state change doesn't re-log every time.
    warned_malformed_modifiers: HashSet<(HolderId, ModifierKey)>,
}

impl Fit {
    pub fn new() -> Self {
        Self::with_source(Source::empty())
    }

    pub fn with_source(source: Source) -> Self {
        Self {
            holders: HashMap::new(),
            next_index: 0,
            ship: None,
            character: None,
            target: None,
            source,
            link_tracker: LinkTracker::new(),
            registry: AffectorRegistry::new(),
            calc: CalculationService::new(),
            warned_malformed_modifiers: HashSet::new(),
        }
    }

    fn alloc_id(&mut self) -> HolderId {
        let index = self.next_index;
        self.next_index += 1;
        HolderId { index, generation: 0 }
    }

    /// Creates a new holder of `type_key`/`kind`, bound to this fit
    /// immediately ("created by user code, bound to
    /// a fit by addition" — collapsed into one call since holders have
    /// no existence independent of the fit that owns them, per the
    /// arena-ownership design note).
    pub fn add(&mut self, type_key: TypeKey, kind: HolderKind) -> HolderId {
        let id = self.alloc_id();
        let mut holder = Holder::new(id, type_key, kind);
        holder.resolved_type = self.source.type_of(type_key);

        match kind {
            HolderKind::Module { .. } | HolderKind::Drone | HolderKind::Subsystem | HolderKind::Fighter => {
                holder.ship = self.ship;
            }
            HolderKind::Skill | HolderKind::Implant => {
                holder.character = self.character;
            }
            HolderKind::Charge { .. } => {
                holder.ship = self.ship;
            }
            HolderKind::Ship | HolderKind::Character | HolderKind::Structure => {}
        }

        self.holders.insert(id, holder);

        let entered = self.link_tracker.on_holder_bound(id, HolderState::Offline);
        self.activate_modifiers(id, &entered);

        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
        self.clear_all_caches();

        info!(target: "fitcalc::calculator", holder = %id, "holder added to fit");
        id
    }

    /// Removes and destroys `holder_id`.
    pub fn remove(&mut self, holder_id: HolderId) -> Result<(), FitError> {
        if !self.holders.contains_key(&holder_id) {
            return Err(FitError::NotAMember(holder_id));
        }

        let exited = self.link_tracker.on_holder_unbound(holder_id);
        self.deactivate_modifiers(holder_id, &exited);

        self.holders.remove(&holder_id);
        if self.ship == Some(holder_id) {
            self.ship = None;
        }
        if self.character == Some(holder_id) {
            self.character = None;
        }
        if self.target == Some(holder_id) {
            self.target = None;
        }
        self.warned_malformed_modifiers
            .retain(|(carrier, _)| *carrier != holder_id);

        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
        self.clear_all_caches();

        info!(target: "fitcalc::calculator", holder = %holder_id, "holder removed from fit");
        Ok(())
    }

    /// Loads `charge` into `module`. Errors if the charge is already
    /// loaded into a different module (a structural
    /// precondition, reported before any mutation).
    pub fn load_charge(&mut self, module: HolderId, charge: HolderId) -> Result<(), FitError> {
        if !self.holders.contains_key(&module) {
            return Err(FitError::NotAMember(module));
        }
        let current_module = match self.holders.get(&charge) {
            Some(h) => match h.kind {
                HolderKind::Charge { module } => module,
                _ => None,
            },
            None => return Err(FitError::NotAMember(charge)),
        };
        if let Some(other) = current_module {
            if other != module {
                return Err(FitError::BoundElsewhere(charge));
            }
        }

        if let Some(h) = self.holders.get_mut(&module) {
            if let HolderKind::Module { charge: slot } = &mut h.kind {
                *slot = Some(charge);
            }
        }
        if let Some(h) = self.holders.get_mut(&charge) {
            h.kind = HolderKind::Charge { module: Some(module) };
        }

        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
        self.clear_all_caches();
        Ok(())
    }

    pub fn set_ship(&mut self, ship: Option<HolderId>) {
        self.ship = ship;
        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
        self.clear_all_caches();
    }

    pub fn set_character(&mut self, character: Option<HolderId>) {
        self.character = character;
        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
        self.clear_all_caches();
    }

    pub fn set_target(&mut self, target: Option<HolderId>) {
        self.target = target;
        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
        self.clear_all_caches();
    }

    pub fn ship(&self) -> Option<HolderId> {
        self.ship
    }

    pub fn character(&self) -> Option<HolderId> {
        self.character
    }

    pub fn target(&self) -> Option<HolderId> {
        self.target
    }

    pub fn holder(&self, holder_id: HolderId) -> Option<&Holder> {
        self.holders.get(&holder_id)
    }

    /// Re-binds every holder's resolved `Type` to `source` and drops
    /// every cached attribute value.
    pub fn set_source(&mut self, source: Source) {
        self.source = source;
        for holder in self.holders.values_mut() {
            holder.resolved_type = self.source.type_of(holder.type_key);
        }
        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
        self.clear_all_caches();
        info!(target: "fitcalc::builder", "fit source switched");
    }

    /// Drops every holder's cached attribute values along with the
    /// dependents graph. Any structural change (holder added/removed,
    /// charge loaded, ship/character/target reassigned, source switched)
    /// can alter which modifiers are live or how their domain/filter
    /// resolves, so a value cached beforehand is no longer trustworthy —
    /// `CalculationService::clear_all` alone only drops the dependency
    /// graph, not the per-holder caches it was tracking.
    fn clear_all_caches(&mut self) {
        for holder in self.holders.values_mut() {
            holder.attribute_map.clear();
        }
        self.calc.clear_all();
    }

    /// Raises or lowers `holder_id`'s activation state, registering and
    /// unregistering the modifiers whose `state` threshold was crossed,
    /// and invalidating just the attributes those modifiers touch.
    pub fn set_state(&mut self, holder_id: HolderId, state: HolderState) -> Result<(), FitError> {
        if !self.holders.contains_key(&holder_id) {
            return Err(FitError::NotAMember(holder_id));
        }

        let diff = self.link_tracker.on_state_change(holder_id, state);
        self.holders
            .get_mut(&holder_id)
            .expect("presence checked above")
            .state = state;

        self.deactivate_modifiers(holder_id, &diff.exited);
        self.activate_modifiers(holder_id, &diff.entered);
        Ok(())
    }

    /// Writes a whitelisted attribute directly (skill level)
    /// and invalidates its dependents.
    pub fn set_attribute(&mut self, holder_id: HolderId, attr: AttrId, value: f64) -> Result<(), FitError> {
        let holder = self.holders.get(&holder_id).ok_or(FitError::NotAMember(holder_id))?;
        if !holder.is_attribute_writable(attr) {
            return Err(FitError::NotWritable { holder: holder_id, attr });
        }
        self.calc.invalidate(&mut self.holders, (holder_id, attr));
        self.holders
            .get_mut(&holder_id)
            .expect("presence checked above")
            .attribute_map
            .set(attr, value);
        Ok(())
    }

    /// Reads `holder_id`'s (cached or freshly computed) `attr` value.
    pub fn attribute(&mut self, holder_id: HolderId, attr: AttrId) -> Result<f64, CalcError> {
        calculation_service::get_attribute(&mut self.holders, &self.registry, &mut self.calc, &self.source, holder_id, attr)
    }

    /// Every modifier on `holder_id`'s effects whose own `state`
    /// threshold matches one of `states` becomes live.
    fn activate_modifiers(&mut self, holder_id: HolderId, states: &[HolderState]) {
        if states.is_empty() {
            return;
        }
        let pairs = self.modifiers_at_states(holder_id, states);
        for (carrier, modifier) in pairs {
            let modifier_id = modifier.id;
            let tgt_attr = modifier.tgt_attr;
            let lookup = lookup!(self);
            self.registry.register_affector(&lookup, carrier, modifier);
            let affected = self.registry.get_affected(carrier, modifier_id).to_vec();
            for target in affected {
                self.calc.invalidate(&mut self.holders, (target, tgt_attr));
            }
        }
        let lookup = lookup!(self);
        self.registry.rebuild(&lookup);
    }

    fn deactivate_modifiers(&mut self, holder_id: HolderId, states: &[HolderState]) {
        if states.is_empty() {
            return;
        }
        let pairs = self.modifiers_at_states(holder_id, states);
        for (carrier, modifier) in &pairs {
            let affected = self.registry.get_affected(*carrier, modifier.id).to_vec();
            self.registry.unregister_affector(*carrier, modifier.id);
            for target in affected {
                self.calc.invalidate(&mut self.holders, (target, modifier.tgt_attr));
            }
        }
    }

    /// Malformed modifiers (unrecognized operator/domain/filter_type/
    /// state/context code) are logged once per carrier and dropped here,
    /// before they ever reach the affector registry; the rest of the
    /// carrier's effects still apply.
    fn modifiers_at_states(
        &mut self,
        holder_id: HolderId,
        states: &[HolderState],
    ) -> Vec<(HolderId, crate::static_data::Modifier)> {
        let Some(holder) = self.holders.get(&holder_id) else {
            return Vec::new();
        };
        let Some(ty) = holder.resolved_type.as_ref() else {
            return Vec::new();
        };
        let effect_keys: Vec<EffectKey> = ty.effects.iter().copied().collect();

        let mut out = Vec::new();
        for effect_key in effect_keys {
            let Some(effect) = self.source.effect(effect_key) else {
                continue;
            };
            for modifier_key in &effect.modifiers {
                let Some(modifier) = self.source.modifier(*modifier_key) else {
                    if self.source.is_malformed_modifier(*modifier_key)
                        && self.warned_malformed_modifiers.insert((holder_id, *modifier_key))
                    {
                        warn!(
                            target: "fitcalc::calculator",
                            holder = %holder_id,
                            effect = %effect_key,
                            modifier = %modifier_key,
                            "modifier has malformed data; dropping"
                        );
                    }
                    continue;
                };
                if states.contains(&modifier.state) {
                    out.push((holder_id, (*modifier).clone()));
                }
            }
        }
        out
    }
}

impl Default for Fit {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a borrow of `Fit`'s holder-relevant fields to [`HolderLookup`]
/// without borrowing `registry`/`calc`, so a `Fit` method can build one
/// of these while separately holding `&mut self.registry`.
struct Lookup<'a> {
    holders: &'a HashMap<HolderId, Holder>,
    ship: Option<HolderId>,
    character: Option<HolderId>,
    target: Option<HolderId>,
}

impl<'a> HolderLookup for Lookup<'a> {
    fn holder_type(&self, holder: HolderId) -> Option<TypeKey> {
        self.holders.get(&holder).map(Holder::type_key)
    }

    fn holder_group(&self, holder: HolderId) -> Option<GroupId> {
        self.holders
            .get(&holder)
            .and_then(|h| h.resolved_type.as_ref())
            .map(|t| t.group_id)
    }

    fn requires_skill(&self, holder: HolderId, skill: TypeKey) -> bool {
        self.holders
            .get(&holder)
            .and_then(|h| h.resolved_type.as_ref())
            .map(|t| t.required_skills.contains(&skill))
            .unwrap_or(false)
    }

    fn ship_of(&self, holder: HolderId) -> Option<HolderId> {
        self.holders.get(&holder).and_then(Holder::ship)
    }

    fn character_of(&self, holder: HolderId) -> Option<HolderId> {
        self.holders.get(&holder).and_then(Holder::character)
    }

    fn all_holders(&self) -> Vec<HolderId> {
        self.holders.keys().copied().collect()
    }

    fn fit_ship(&self) -> Option<HolderId> {
        self.ship
    }

    fn fit_character(&self) -> Option<HolderId> {
        self.character
    }

    fn fit_target(&self) -> Option<HolderId> {
        self.target
    }

    fn other_of(&self, holder: HolderId) -> Option<HolderId> {
        match self.holders.get(&holder).map(Holder::kind) {
            Some(HolderKind::Charge { module }) => module,
            Some(HolderKind::Module { charge }) => charge,
            _ => None,
        }
    }
}
