//! Benchmarks for the attribute calculation engine: a cold read through
//! a stacking-penalized chain, a warm (cached) re-read of the same
//! value, and the cost of adding a holder (which rebuilds the affector
//! registry and clears the cache). Grounded in the teacher's own
//! `benches/attribute_bench.rs` — direct-access vs. derived-access
//! comparisons under `criterion`, generalized from an ECS query over a
//! fixed component set to a `Fit` over a fixed module count.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use fitcalc::{
    AttrId, AttributeRow, EffectKey, EffectRow, Fit, GroupId, HolderCategory, HolderKind,
    HolderState, ModifierKey, ModifierRow, Source, TypeKey, TypeRow,
};
use std::collections::HashMap;
use std::hint::black_box;

const EXTENDER_COUNT: usize = 8;

fn source_with_extenders() -> Source {
    let attributes = vec![AttributeRow {
        id: AttrId(1),
        stackable: false,
        high_is_good: true,
        default_value: 0.0,
    }];
    let modifiers = vec![ModifierRow {
        id: ModifierKey(1),
        state: 1,
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
        category: 4,
        modifiers: vec![ModifierKey(1)],
    }];
    let mut ship_attrs = HashMap::new();
    ship_attrs.insert(AttrId(1), 1000.0);
    let mut extender_attrs = HashMap::new();
    extender_attrs.insert(AttrId(2), 50.0);
    let types = vec![
        TypeRow {
            id: TypeKey(1),
            group_id: GroupId(1),
            category: HolderCategory::Ship,
            attributes: ship_attrs,
            effects: vec![],
            default_effect: None,
            required_skills: vec![],
        },
        TypeRow {
            id: TypeKey(2),
            group_id: GroupId(2),
            category: HolderCategory::Module,
            attributes: extender_attrs,
            effects: vec![EffectKey(1)],
            default_effect: None,
            required_skills: vec![],
        },
    ];
    Source::from_rows(attributes, types, effects, modifiers).unwrap()
}

fn fitted_ship() -> (Fit, fitcalc::HolderId) {
    let mut fit = Fit::with_source(source_with_extenders());
    let ship = fit.add(TypeKey(1), HolderKind::Ship);
    fit.set_ship(Some(ship));
    for _ in 0..EXTENDER_COUNT {
        let module = fit.add(TypeKey(2), HolderKind::Module { charge: None });
        fit.set_state(module, HolderState::Online).unwrap();
    }
    (fit, ship)
}

fn cold_attribute_read(c: &mut Criterion) {
    c.bench_function("attribute read (cold, 8 stacked extenders)", |b| {
        b.iter_batched(
            fitted_ship,
            |(mut fit, ship)| black_box(fit.attribute(ship, AttrId(1)).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

fn warm_attribute_read(c: &mut Criterion) {
    let (mut fit, ship) = fitted_ship();
    fit.attribute(ship, AttrId(1)).unwrap();
    c.bench_function("attribute read (warm, 8 stacked extenders)", |b| {
        b.iter(|| black_box(fit.attribute(ship, AttrId(1)).unwrap()))
    });
}

fn add_holder(c: &mut Criterion) {
    c.bench_function("add module to an 8-extender fit", |b| {
        b.iter_batched(
            fitted_ship,
            |(mut fit, _ship)| black_box(fit.add(TypeKey(2), HolderKind::Module { charge: None })),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, cold_attribute_read, warm_attribute_read, add_holder);
criterion_main!(benches);
