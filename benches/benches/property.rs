// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_model` bags and models.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::{Arc, Once};

use understory_model::{
    ChangeTrackingModelBase, ChangeTrackingPropertyBag, ClassMetadata, ClassMetadataBuilder,
    EditablePropertyBag, ErasedValue, PropertyBag, PropertySetModes, Range, Reflect, Required,
    SimplePropertyBag, StringLength,
};

#[derive(Debug)]
struct Row;

impl Reflect for Row {
    fn describe(class: &mut ClassMetadataBuilder) {
        class.property::<i32>("Id");
        class
            .property::<Option<String>>("Name")
            .validate(Required::new())
            .validate(StringLength::max(32));
        class.property::<f64>("Price").validate(Range::new(0.0, 1000.0));
        class
            .property::<String>("Label")
            .read_only()
            .calculated_from(&["Name", "Price"]);
    }
}

fn wide_class(len: u16) -> Arc<ClassMetadata> {
    let mut class = ClassMetadataBuilder::new::<()>();
    for index in 0..len {
        let name: &'static str = Box::leak(format!("P{index}").into_boxed_str());
        class.property::<i64>(name);
    }
    Arc::new(class.build().unwrap())
}

fn bench_bag<B: PropertyBag>(c: &mut Criterion, label: &str) {
    let mut group = c.benchmark_group(format!("bag/{label}"));
    for len in [4_u16, 64] {
        let metadata = wide_class(len);
        let last = format!("P{}", len - 1);

        group.bench_function(BenchmarkId::new("set", len), |b| {
            let mut bag = B::new(Arc::clone(&metadata));
            let mut n = 0_i64;
            b.iter(|| {
                n += 1;
                black_box(
                    bag.set(ErasedValue::new(n), PropertySetModes::DEFAULT, &last, &mut ())
                        .unwrap(),
                )
            });
        });

        group.bench_function(BenchmarkId::new("get", len), |b| {
            let mut bag = B::new(Arc::clone(&metadata));
            bag.set(ErasedValue::new(7_i64), PropertySetModes::DEFAULT, &last, &mut ())
                .unwrap();
            b.iter(|| black_box(bag.get_value(black_box(&last)).unwrap()));
        });
    }
    group.finish();
}

fn bench_bags(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: ErasedValue={} SimplePropertyBag={} ChangeTrackingPropertyBag={}",
            size_of::<ErasedValue>(),
            size_of::<SimplePropertyBag>(),
            size_of::<ChangeTrackingPropertyBag>(),
        );
    });

    bench_bag::<SimplePropertyBag>(c, "simple");
    bench_bag::<ChangeTrackingPropertyBag>(c, "tracking");
    bench_bag::<EditablePropertyBag>(c, "editable");
}

fn bench_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("model");

    group.bench_function("metadata_lookup", |b| {
        b.iter(|| black_box(ClassMetadata::of::<Row>()));
    });

    group.bench_function("set_cascading", |b| {
        let mut model = ChangeTrackingModelBase::new::<Row>();
        model.subscribe_property_changed(|args| {
            black_box(args.property_name());
        });
        let mut price = 0.0;
        b.iter(|| {
            price += 1.0;
            if price > 1000.0 {
                price = 0.0;
            }
            black_box(model.set(price, "Price"))
        });
    });

    group.bench_function("typed_handle", |b| {
        let mut model = ChangeTrackingModelBase::new::<Row>();
        let id = model.metadata().property_handle::<i32>("Id").unwrap();
        let mut n = 0;
        b.iter(|| {
            n = (n + 1) % 1000;
            model.write(id, n).unwrap();
            black_box(model.read(id))
        });
    });

    group.bench_function("validate", |b| {
        let mut model = ChangeTrackingModelBase::new::<Row>();
        model.set(Some(String::from("widget")), "Name");
        model.set(2000.0, "Price");
        b.iter(|| black_box(model.validate()));
    });

    group.bench_function("reject_changes", |b| {
        b.iter_batched(
            || {
                let mut model = ChangeTrackingModelBase::new::<Row>();
                model.set(1, "Id");
                model.accept_changes().unwrap();
                model.set(2, "Id");
                model.set(Some(String::from("gadget")), "Name");
                model
            },
            |mut model| {
                model.reject_changes().unwrap();
                model
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_bags, bench_model);
criterion_main!(benches);
