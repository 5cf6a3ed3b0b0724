//! The facade that ties holders, the affector registry, and per-holder
//! caches together, plus the attribute-value algebra the facade drives.
//!
//! The dependents graph below is a small `petgraph::StableGraph` walked
//! to fold a value: nodes are `(holder, attribute)` pairs and an edge
//! `a -> b` means "b's cached value was computed using a's value", so
//! invalidating `a` walks outgoing edges to evict every transitive
//! dependent.

use crate::affector_registry::AffectorRegistry;
use crate::error::CalcError;
use crate::holder::Holder;
use crate::ids::{AttrId, HolderId};
use crate::penalty::penalize;
use crate::source::Source;
use crate::static_data::{Modifier, Operator, OperatorCategory, PENALTY_IMMUNE_CATEGORIES};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

type Key = (HolderId, AttrId);

/// Owns the dependents graph and the in-progress call stack used to
/// detect calculation cycles — "a stack of
/// in-progress `(holder, attr)` pairs ... replaces call-stack-
/// reentrancy tricks").
#[derive(Debug, Default)]
pub struct CalculationService {
    graph: StableDiGraph<Key, ()>,
    node_index: HashMap<Key, NodeIndex>,
    in_progress: Vec<Key>,
}

impl CalculationService {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, key: Key) -> NodeIndex {
        *self
            .node_index
            .entry(key)
            .or_insert_with(|| self.graph.add_node(key))
    }

    fn record_dependency(&mut self, dependency: Key, dependent: Key) {
        let from = self.node(dependency);
        let to = self.node(dependent);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Evicts `key`'s cached value and every transitively dependent
    /// cached value.
    pub fn invalidate(&mut self, holders: &mut HashMap<HolderId, Holder>, key: Key) {
        let Some(&start) = self.node_index.get(&key) else {
            // Never computed, nothing cached to evict, but the holder's
            // own entry still needs clearing in case it was written
            // directly (e.g. a skill-level write) without ever being
            // read through the graph.
            if let Some(h) = holders.get_mut(&key.0) {
                h.attribute_map.cache.remove(&key.1);
            }
            return;
        };

        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::new();
        visited.insert(start);

        while let Some(node) = queue.pop_front() {
            let (holder_id, attr) = self.graph[node];
            if let Some(h) = holders.get_mut(&holder_id) {
                h.attribute_map.cache.remove(&attr);
            }
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    /// Drops every tracked dependency edge (a source switch
    /// clears the entire attribute cache).
    pub fn clear_all(&mut self) {
        self.graph.clear();
        self.node_index.clear();
    }
}

fn base_or_default(holders: &HashMap<HolderId, Holder>, source: &Source, holder_id: HolderId, attr: AttrId) -> Option<f64> {
    holders[&holder_id]
        .base_attribute(attr)
        .or_else(|| source.attribute_meta(attr).map(|m| m.default_value))
}

fn normalize(operator: Operator, raw: f64) -> f64 {
    match operator {
        Operator::PreDiv | Operator::PostDiv => 1.0 / raw,
        Operator::ModSub => -raw,
        Operator::PostPercent => raw / 100.0 + 1.0,
        _ => raw,
    }
}

/// Is this affector's contribution subject to the stacking penalty
/// ?
fn is_penalizable(stackable: bool, src_category: crate::static_data::HolderCategory, operator: Operator) -> bool {
    !stackable && !PENALTY_IMMUNE_CATEGORIES.contains(&src_category) && operator.is_multiplicative()
}

/// The public entry point: compute (or return the cached) value of
/// `holder_id`'s `attr`.
pub(crate) fn get_attribute(
    holders: &mut HashMap<HolderId, Holder>,
    registry: &AffectorRegistry,
    calc: &mut CalculationService,
    source: &Source,
    holder_id: HolderId,
    attr: AttrId,
) -> Result<f64, CalcError> {
    if let Some(&v) = holders[&holder_id].attribute_map.cache.get(&attr) {
        return Ok(v);
    }

    let key = (holder_id, attr);
    if calc.in_progress.contains(&key) {
        warn!(
            target: "fitcalc::calculator",
            holder = %holder_id,
            attr = %attr,
            "calculation cycle detected; using unmodified base value"
        );
        return base_or_default(holders, source, holder_id, attr)
            .ok_or(CalcError::AttributeMissing { holder: holder_id, attr });
    }

    calc.in_progress.push(key);
    let outcome = compute(holders, registry, calc, source, holder_id, attr);
    calc.in_progress.pop();

    let value = outcome?;
    holders
        .get_mut(&holder_id)
        .expect("holder id owned by this fit")
        .attribute_map
        .cache
        .insert(attr, value);
    Ok(value)
}

fn compute(
    holders: &mut HashMap<HolderId, Holder>,
    registry: &AffectorRegistry,
    calc: &mut CalculationService,
    source: &Source,
    holder_id: HolderId,
    attr: AttrId,
) -> Result<f64, CalcError> {
    let base = base_or_default(holders, source, holder_id, attr);
    let mut acc = base.unwrap_or(0.0);
    let mut acc_defined = base.is_some();

    let meta = source.attribute_meta(attr);
    let stackable = meta.map(|m| m.stackable).unwrap_or(true);
    let high_is_good = meta.map(|m| m.high_is_good).unwrap_or(true);

    // Gather this attribute's live affectors up front so we can drop
    // the registry borrow before recursing into other holders.
    let affectors: Vec<(HolderId, Modifier)> = registry
        .get_affectors(holder_id)
        .filter(|(_, m)| m.tgt_attr == attr)
        .map(|(carrier, m)| (carrier, m.clone()))
        .collect();

    let mut penalized: HashMap<Operator, Vec<f64>> = HashMap::new();
    let mut normal: HashMap<Operator, Vec<f64>> = HashMap::new();

    for (src_holder, modifier) in affectors {
        calc.record_dependency((src_holder, modifier.src_attr), (holder_id, attr));

        // A modifier whose source attribute cannot be produced (no base
        // value and no default on the carrier) is itself malformed: it
        // is logged and dropped, same as an unresolvable filter, rather
        // than failing the attribute being computed here.
        let raw = match get_attribute(holders, registry, calc, source, src_holder, modifier.src_attr) {
            Ok(v) => v,
            Err(_) => {
                warn!(
                    target: "fitcalc::calculator",
                    carrier = %src_holder,
                    modifier = %modifier.id,
                    src_attr = %modifier.src_attr,
                    "modifier source attribute is missing; dropping modifier"
                );
                continue;
            }
        };
        let magnitude = normalize(modifier.operator, raw);
        let src_category = holders[&src_holder].category();

        if is_penalizable(stackable, src_category, modifier.operator) {
            penalized.entry(modifier.operator).or_default().push(magnitude);
        } else {
            normal.entry(modifier.operator).or_default().push(magnitude);
        }
    }

    for operator in Operator::ORDER {
        let mut values = normal.remove(&operator).unwrap_or_default();
        let chain = penalized.remove(&operator).unwrap_or_default();

        match operator.category() {
            OperatorCategory::Multiplicative => {
                if !chain.is_empty() {
                    values.push(penalize(&chain));
                }
                for v in values {
                    acc *= v;
                }
            }
            OperatorCategory::Additive => {
                values.extend(chain);
                acc += values.into_iter().sum::<f64>();
            }
            OperatorCategory::Assignment => {
                values.extend(chain);
                if let Some(&first) = values.first() {
                    let mut chosen = first;
                    for &v in &values[1..] {
                        if high_is_good {
                            if v > chosen {
                                chosen = v;
                            }
                        } else if v < chosen {
                            chosen = v;
                        }
                    }
                    acc = chosen;
                    acc_defined = true;
                }
            }
        }
    }

    if !acc_defined {
        return Err(CalcError::AttributeMissing { holder: holder_id, attr });
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::HolderKind;
    use crate::ids::TypeKey;
    use crate::static_data::{Domain, FilterType, HolderState, ModifierContext};

    fn hid(n: u32) -> HolderId {
        HolderId { index: n, generation: 0 }
    }

    fn make_holder(id: HolderId, kind: HolderKind, base: f64, attr: AttrId) -> Holder {
        let mut h = Holder::new(id, TypeKey(1), kind);
        h.resolved_type = Some(std::sync::Arc::new(crate::static_data::Type {
            id: TypeKey(1),
            group_id: crate::ids::GroupId(1),
            category: kind.category(),
            attributes: HashMap::from([(attr, base)]),
            effects: Default::default(),
            default_effect: None,
            required_skills: Default::default(),
        }));
        h
    }

    #[test]
    fn no_affectors_returns_base_value() {
        let attr = AttrId(1);
        let mut holders = HashMap::new();
        let h = hid(1);
        holders.insert(h, make_holder(h, HolderKind::Module { charge: None }, 100.0, attr));

        let registry = AffectorRegistry::new();
        let mut calc = CalculationService::new();
        let source = Source::empty();

        let value = get_attribute(&mut holders, &registry, &mut calc, &source, h, attr).unwrap();
        assert_eq!(value, 100.0);
    }

    #[test]
    fn cycle_falls_back_to_base_and_does_not_panic() {
        // src_attr == tgt_attr on the same holder: a self-referential
        // modifier. Detected as a cycle on the second visit.
        let attr = AttrId(1);
        let mut holders = HashMap::new();
        let h = hid(1);
        holders.insert(h, make_holder(h, HolderKind::Module { charge: None }, 10.0, attr));

        let mut registry = AffectorRegistry::new();
        registry.register_affector(
            &TestLookup(&holders),
            h,
            crate::static_data::Modifier {
                id: crate::ids::ModifierKey(1),
                state: HolderState::Online,
                context: ModifierContext::Local,
                src_attr: attr,
                operator: Operator::ModAdd,
                tgt_attr: attr,
                domain: Domain::SelfDomain,
                filter_type: FilterType::None,
                filter_value: 0,
            },
        );

        let mut calc = CalculationService::new();
        let source = Source::empty();
        let value = get_attribute(&mut holders, &registry, &mut calc, &source, h, attr).unwrap();
        assert_eq!(value, 10.0);
    }

    #[test]
    fn modifier_with_missing_source_attribute_is_dropped_not_fatal() {
        // The carrier has no base value and no default for the
        // modifier's src_attr, so producing it fails; the target
        // attribute should still resolve to its own base value instead
        // of erroring out for the whole computation.
        let tgt_attr = AttrId(1);
        let src_attr = AttrId(2);
        let mut holders = HashMap::new();
        let h = hid(1);
        holders.insert(h, make_holder(h, HolderKind::Module { charge: None }, 50.0, tgt_attr));

        let mut registry = AffectorRegistry::new();
        registry.register_affector(
            &TestLookup(&holders),
            h,
            crate::static_data::Modifier {
                id: crate::ids::ModifierKey(1),
                state: HolderState::Online,
                context: ModifierContext::Local,
                src_attr,
                operator: Operator::ModAdd,
                tgt_attr,
                domain: Domain::SelfDomain,
                filter_type: FilterType::None,
                filter_value: 0,
            },
        );

        let mut calc = CalculationService::new();
        let source = Source::empty();
        let value = get_attribute(&mut holders, &registry, &mut calc, &source, h, tgt_attr).unwrap();
        assert_eq!(value, 50.0);
    }

    struct TestLookup<'a>(&'a HashMap<HolderId, Holder>);
    impl<'a> crate::affector_registry::HolderLookup for TestLookup<'a> {
        fn holder_type(&self, h: HolderId) -> Option<TypeKey> {
            self.0.get(&h).map(|x| x.type_key())
        }
        fn holder_group(&self, _h: HolderId) -> Option<crate::ids::GroupId> {
            None
        }
        fn requires_skill(&self, _h: HolderId, _skill: TypeKey) -> bool {
            false
        }
        fn ship_of(&self, h: HolderId) -> Option<HolderId> {
            self.0.get(&h).and_then(|x| x.ship())
        }
        fn character_of(&self, h: HolderId) -> Option<HolderId> {
            self.0.get(&h).and_then(|x| x.character())
        }
        fn all_holders(&self) -> Vec<HolderId> {
            self.0.keys().copied().collect()
        }
        fn fit_ship(&self) -> Option<HolderId> {
            None
        }
        fn fit_character(&self) -> Option<HolderId> {
            None
        }
        fn fit_target(&self) -> Option<HolderId> {
            None
        }
        fn other_of(&self, _h: HolderId) -> Option<HolderId> {
            None
        }
    }

    #[test]
    fn invalidate_walks_transitive_dependents() {
        let mut calc = CalculationService::new();
        let a = (hid(1), AttrId(1));
        let b = (hid(2), AttrId(1));
        let c = (hid(3), AttrId(1));
        calc.record_dependency(a, b);
        calc.record_dependency(b, c);

        let mut holders = HashMap::new();
        for (h, attr) in [a, b, c] {
            let mut holder = make_holder(h, HolderKind::Module { charge: None }, 1.0, attr);
            holder.attribute_map.cache.insert(attr, 42.0);
            holders.insert(h, holder);
        }

        calc.invalidate(&mut holders, a);

        assert!(holders[&a.0].attribute_map.cache.get(&a.1).is_none());
        assert!(holders[&b.0].attribute_map.cache.get(&b.1).is_none());
        assert!(holders[&c.0].attribute_map.cache.get(&c.1).is_none());
    }
}
