use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::atomic::{AtomicI64, Ordering};

use stm::{atomic, fresh_id_source, scheduler};

pub fn criterion_benchmark(c: &mut Criterion) {
    // Bare atomic store time, as a reference point.
    let at = black_box(AtomicI64::new(21123));
    let mut ref1 = c.benchmark_group("atomic-store");
    ref1.bench_function("i64", |b| {
        b.iter(|| {
            at.store(black_box(21424), Ordering::Relaxed);
            black_box(&at)
        })
    });
    ref1.finish();

    // TVar store time through a full write-then-commit attempt (§4.5
    // `writeTVar`, §4.6 validate/commit).
    scheduler(fresh_id_source(), |sched| {
        let tv = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(21123)));

        let mut g1 = c.benchmark_group("tvar-store");
        g1.bench_function("i64", |b| {
            b.iter(|| {
                atomic(sched, |tx| tx.write(&tv, black_box(21424)));
                black_box(&tv)
            })
        });
        g1.finish();
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
