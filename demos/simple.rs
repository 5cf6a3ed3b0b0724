//! A minimal end-to-end walkthrough of the consumer API: load a
//! `Source`, build a `Fit`, add a ship and two shield extenders, and
//! watch the stacking-penalized shield HP change as the extenders come
//! online. Grounded in the teacher's own `examples/simple.rs` (a single
//! `main()` wiring up a player entity and a couple of effects) with the
//! ECS/UI scaffolding stripped out, since this crate has no world to run.

use fitcalc::prelude::*;
use fitcalc::{AttrId, EffectKey, EffectRow, GroupId, HolderCategory, ModifierKey, ModifierRow, TypeRow};
use std::collections::HashMap;

fn main() {
    tracing_subscriber::fmt::init();

    // The static-data contract: one non-stackable attribute (shield HP),
    // one effect (shield extender, gated at `online`), one modifier
    // (+50% to the ship's shield HP per extender).
    let attributes = vec![fitcalc::AttributeRow {
        id: AttrId(1),
        stackable: false,
        high_is_good: true,
        default_value: 0.0,
    }];
    let modifiers = vec![ModifierRow {
        id: ModifierKey(1),
        state: 1, // online
        context: 0,
        src_attr: AttrId(2),
        operator: 7, // post_percent
        tgt_attr: AttrId(1),
        domain: 2, // ship
        filter_type: 0,
        filter_value: 0,
    }];
    let effects = vec![EffectRow {
        id: EffectKey(1),
        category: 4, // online
        modifiers: vec![ModifierKey(1)],
    }];
    let mut ship_attrs = HashMap::new();
    ship_attrs.insert(AttrId(1), 1000.0);
    let mut extender_attrs = HashMap::new();
    extender_attrs.insert(AttrId(2), 50.0);
    let types = vec![
        TypeRow {
            id: TypeKey(10),
            group_id: GroupId(1),
            category: HolderCategory::Ship,
            attributes: ship_attrs,
            effects: vec![],
            default_effect: None,
            required_skills: vec![],
        },
        TypeRow {
            id: TypeKey(20),
            group_id: GroupId(2),
            category: HolderCategory::Module,
            attributes: extender_attrs,
            effects: vec![EffectKey(1)],
            default_effect: None,
            required_skills: vec![],
        },
    ];
    let source = fitcalc::Source::from_rows(attributes, types, effects, modifiers)
        .expect("well-formed demo data");

    let mut fit = Fit::with_source(source);
    let ship = fit.add(TypeKey(10), HolderKind::Ship);
    fit.set_ship(Some(ship));

    println!("shield HP, no extenders: {}", fit.attribute(ship, AttrId(1)).unwrap());

    let extender_a = fit.add(TypeKey(20), HolderKind::Module { charge: None });
    fit.set_state(extender_a, HolderState::Online).unwrap();
    println!("shield HP, 1 extender: {}", fit.attribute(ship, AttrId(1)).unwrap());

    let extender_b = fit.add(TypeKey(20), HolderKind::Module { charge: None });
    fit.set_state(extender_b, HolderState::Online).unwrap();
    println!(
        "shield HP, 2 extenders (stacking-penalized): {}",
        fit.attribute(ship, AttrId(1)).unwrap()
    );

    fit.remove(extender_b).unwrap();
    println!(
        "shield HP, back to 1 extender: {}",
        fit.attribute(ship, AttrId(1)).unwrap()
    );
}
