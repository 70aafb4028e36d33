use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::atomic::AtomicI64;

use stm::{atomic, fresh_id_source, scheduler};

pub fn criterion_benchmark(c: &mut Criterion) {
    // Bare atomic init time, as a reference point.
    let mut ref1 = c.benchmark_group("atomic-init");
    ref1.bench_function("i64", |b| b.iter(|| black_box(AtomicI64::new(23123))));
    ref1.finish();

    // TVar init time, which goes through a full attempt's fresh-id
    // allocation and log insertion (§4.5 `newTVar`).
    scheduler(fresh_id_source(), |sched| {
        let mut g1 = c.benchmark_group("tvar-init");
        g1.bench_function("i64", |b| {
            b.iter(|| black_box(atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(23123)))))
        });
        g1.finish();
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
