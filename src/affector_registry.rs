//! Indexes `(source_holder, modifier) -> affected target holders`
//! Holder membership needed to resolve a modifier's
//! domain/filter is supplied by the caller (`Fit`) through
//! [`HolderLookup`], so this module stays ignorant of how holders are
//! stored.

use crate::ids::{GroupId, HolderId, ModifierKey, TypeKey};
use crate::static_data::{Domain, FilterType, Modifier};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Everything the registry needs to know about the holders currently in
/// a fit, without owning them. Implemented by `Fit`.
pub trait HolderLookup {
    fn holder_type(&self, holder: HolderId) -> Option<TypeKey>;
    fn holder_group(&self, holder: HolderId) -> Option<GroupId>;
    fn requires_skill(&self, holder: HolderId, skill: TypeKey) -> bool;
    fn ship_of(&self, holder: HolderId) -> Option<HolderId>;
    fn character_of(&self, holder: HolderId) -> Option<HolderId>;
    /// All holders currently bound to the fit (for `filter = all/group/
    /// skill/skill_self` enumeration).
    fn all_holders(&self) -> Vec<HolderId>;
    /// The fit's ship holder, if any.
    fn fit_ship(&self) -> Option<HolderId>;
    /// The fit's character holder, if any.
    fn fit_character(&self) -> Option<HolderId>;
    /// The fit's current projected-target holder, if any.
    fn fit_target(&self) -> Option<HolderId>;
    /// `domain = other`'s sole relation for this carrier (e.g. a
    /// charge's module, or a module's loaded charge).
    fn other_of(&self, holder: HolderId) -> Option<HolderId>;
}

/// Why a modifier's domain/filter could not be resolved to a target
/// set. Carried only internally — callers observe it as a WARNING log
/// line and the modifier being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Malformed {
    UnresolvableDomain,
}

/// Tracks which live `(carrier, modifier)` pairs affect which target
/// holders, and provides the inverse lookup for invalidation.
#[derive(Debug, Default)]
pub struct AffectorRegistry {
    live: HashMap<(HolderId, ModifierKey), Modifier>,
    /// Authoritative: spec's `affectors_by_target_holder`.
    by_target: HashMap<HolderId, Vec<(HolderId, ModifierKey)>>,
    /// Inverse of `by_target`, recorded at registration time so
    /// `unregister_affector`/`get_affected` don't need to re-resolve.
    targets_of: HashMap<(HolderId, ModifierKey), Vec<HolderId>>,
    warned_malformed: HashSet<(HolderId, ModifierKey)>,
}

impl AffectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `modifier` (carried by `carrier`) as live. Resolves its
    /// domain/filter against the current holder set and indexes it
    /// under every resulting target. A modifier whose domain cannot be
    /// resolved is logged once per carrier and dropped;
    /// the rest of the carrier's effect still applies.
    pub fn register_affector(
        &mut self,
        holders: &dyn HolderLookup,
        carrier: HolderId,
        modifier: Modifier,
    ) {
        let key = (carrier, modifier.id);
        match resolve_targets(holders, carrier, &modifier) {
            Ok(targets) => {
                for &target in &targets {
                    self.by_target.entry(target).or_default().push(key);
                }
                self.targets_of.insert(key, targets);
                self.live.insert(key, modifier);
            }
            Err(_reason) => {
                if self.warned_malformed.insert(key) {
                    warn!(
                        target: "fitcalc::calculator",
                        carrier = %carrier,
                        modifier = %modifier.id,
                        "could not resolve modifier domain/filter; dropping"
                    );
                }
            }
        }
    }

    /// Symmetric with [`register_affector`](Self::register_affector).
    pub fn unregister_affector(&mut self, carrier: HolderId, modifier_key: ModifierKey) {
        let key = (carrier, modifier_key);
        if let Some(targets) = self.targets_of.remove(&key) {
            for target in targets {
                if let Some(list) = self.by_target.get_mut(&target) {
                    list.retain(|entry| *entry != key);
                    if list.is_empty() {
                        self.by_target.remove(&target);
                    }
                }
            }
        }
        self.live.remove(&key);
        // A later re-registration of the same carrier/modifier should
        // be free to warn again.
        self.warned_malformed.remove(&key);
    }

    /// Every live affector currently targeting `target`.
    pub fn get_affectors(&self, target: HolderId) -> impl Iterator<Item = (HolderId, &Modifier)> + '_ {
        self.by_target
            .get(&target)
            .into_iter()
            .flatten()
            .filter_map(move |&(carrier, modifier_key)| {
                self.live.get(&(carrier, modifier_key)).map(|m| (carrier, m))
            })
    }

    /// Inverse lookup: every holder this `(carrier, modifier)` pair
    /// currently targets. Used for invalidation when a modifier is
    /// unregistered or its inputs change.
    pub fn get_affected(&self, carrier: HolderId, modifier_key: ModifierKey) -> &[HolderId] {
        self.targets_of
            .get(&(carrier, modifier_key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Re-resolves every live modifier's target set against the
    /// current holder set. Called by the `Fit` on any structural change
    /// (add/remove/relocate) since such a change can alter which
    /// holders fall under `filter = all/group/skill/skill_self`
    /// (the registry re-resolves membership in these
    /// indexes").
    pub fn rebuild(&mut self, holders: &dyn HolderLookup) {
        let entries: Vec<((HolderId, ModifierKey), Modifier)> = self
            .live
            .iter()
            .map(|(k, m)| (*k, m.clone()))
            .collect();

        self.by_target.clear();
        self.targets_of.clear();

        for ((carrier, _modifier_key), modifier) in entries {
            let key = (carrier, modifier.id);
            match resolve_targets(holders, carrier, &modifier) {
                Ok(targets) => {
                    for &target in &targets {
                        self.by_target.entry(target).or_default().push(key);
                    }
                    self.targets_of.insert(key, targets);
                }
                Err(_) => {
                    if self.warned_malformed.insert(key) {
                        warn!(
                            target: "fitcalc::calculator",
                            carrier = %carrier,
                            modifier = %modifier.id,
                            "could not resolve modifier domain/filter on rebuild; dropping"
                        );
                    }
                }
            }
        }
    }

    pub fn is_live(&self, carrier: HolderId, modifier_key: ModifierKey) -> bool {
        self.live.contains_key(&(carrier, modifier_key))
    }
}

fn resolve_targets(
    holders: &dyn HolderLookup,
    carrier: HolderId,
    modifier: &Modifier,
) -> Result<Vec<HolderId>, Malformed> {
    let root = match modifier.domain {
        Domain::SelfDomain => carrier,
        Domain::Ship => holders.fit_ship().ok_or(Malformed::UnresolvableDomain)?,
        Domain::Character => holders
            .fit_character()
            .ok_or(Malformed::UnresolvableDomain)?,
        Domain::Target => holders.fit_target().ok_or(Malformed::UnresolvableDomain)?,
        Domain::Other => holders
            .other_of(carrier)
            .ok_or(Malformed::UnresolvableDomain)?,
    };

    match modifier.filter_type {
        FilterType::None => Ok(vec![root]),
        FilterType::All => Ok(holders_under(holders, root)),
        FilterType::Group => {
            let gid = GroupId(modifier.filter_value as u32);
            Ok(holders_under(holders, root)
                .into_iter()
                .filter(|&h| holders.holder_group(h) == Some(gid))
                .collect())
        }
        FilterType::Skill => {
            let skill = TypeKey(modifier.filter_value as u32);
            Ok(holders_under(holders, root)
                .into_iter()
                .filter(|&h| holders.requires_skill(h, skill))
                .collect())
        }
        FilterType::SkillSelf => {
            let carrier_type = holders
                .holder_type(carrier)
                .ok_or(Malformed::UnresolvableDomain)?;
            Ok(holders_under(holders, root)
                .into_iter()
                .filter(|&h| holders.requires_skill(h, carrier_type))
                .collect())
        }
    }
}

/// Holders structurally located under `root`: fit to `root` as their
/// ship, or belonging to `root` as their character. `root` itself is
/// not included — it is the parent, not a member under itself.
fn holders_under(holders: &dyn HolderLookup, root: HolderId) -> Vec<HolderId> {
    holders
        .all_holders()
        .into_iter()
        .filter(|&h| h != root && (holders.ship_of(h) == Some(root) || holders.character_of(h) == Some(root)))
        .collect()
}
