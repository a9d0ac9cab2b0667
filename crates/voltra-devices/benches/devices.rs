use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voltra_core::{Element, MnaSystem, NodeIndex, NodeKey};
use voltra_devices::Capacitor;

fn bench_capacitor_stamp(c: &mut Criterion) {
    let mut nodes = NodeIndex::new();
    nodes.resolve(&NodeKey::new("a"));
    let mut cap = Capacitor::new("C1", "a", "0", 1e-6, 0.0);
    cap.bind(&nodes, None).unwrap();
    cap.init_transient(&nalgebra::DVector::from_vec(vec![0.0]));

    c.bench_function("capacitor_update_and_stamp", |b| {
        b.iter(|| {
            cap.update_companion(black_box(1e-6)).unwrap();
            let mut mna = MnaSystem::new(1, 0);
            cap.stamp(&mut mna, 0.0);
            black_box(mna);
        })
    });
}

criterion_group!(benches, bench_capacitor_stamp);
criterion_main!(benches);
