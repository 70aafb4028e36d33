use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::atomic::{AtomicI64, Ordering};

use stm::{atomic, fresh_id_source, scheduler};

pub fn criterion_benchmark(c: &mut Criterion) {
    // Bare atomic load time, as a reference point.
    let at = black_box(AtomicI64::new(21123));
    let mut ref1 = c.benchmark_group("atomic-load");
    ref1.bench_function("i64", |b| b.iter(|| black_box(at.load(Ordering::Relaxed))));
    ref1.finish();

    // TVar load time through a full read-only attempt (§4.5 `readTVar`,
    // §4.6 validate/commit).
    scheduler(fresh_id_source(), |sched| {
        let tv = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(21123)));

        let mut g1 = c.benchmark_group("tvar-load");
        g1.bench_function("i64", |b| b.iter(|| black_box(atomic(sched, |tx| tx.read(&tv)))));
        g1.finish();
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
