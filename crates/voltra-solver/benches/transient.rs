//! Benchmarks for the transient engines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voltra_core::Circuit;
use voltra_devices::{Capacitor, Resistor, VoltageSource};
use voltra_solver::{preprocess, run_transient, TransientParams};

/// An `n`-stage RC ladder: `V1 -- R -- node_1 -- C -- gnd`, each node also
/// bridged by a resistor to the next, giving a system whose size scales
/// with `n`.
fn rc_ladder(n: usize) -> Circuit {
    let mut circuit = Circuit::new();
    circuit.add_element(Box::new(VoltageSource::dc("V1", "n0", "0", 5.0))).unwrap();
    for i in 0..n {
        let from = format!("n{i}");
        let to = format!("n{}", i + 1);
        circuit.add_element(Box::new(Resistor::new(format!("R{i}"), from, to.clone(), 1000.0))).unwrap();
        circuit.add_element(Box::new(Capacitor::new(format!("C{i}"), to, "0", 1e-6, 0.0))).unwrap();
    }
    circuit
}

fn bench_run_transient(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_transient_rc_ladder");

    for size in [4, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut pre = preprocess(rc_ladder(size)).unwrap();
                let params = TransientParams::new(0.0, 1e-3, 1e-6);
                let (result, error) = run_transient(&mut pre, &params, &|| false);
                assert!(error.is_none());
                black_box(result)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run_transient);
criterion_main!(benches);
