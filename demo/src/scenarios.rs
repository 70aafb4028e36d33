//! The concrete "orElse" and "Retry" suites run by the CLI (§8, §13).
//!
//! Each case sets up its own `TVar`s, drives them through a `scheduler`, and
//! compares the resulting cell values against the literal expectations.

use log::info;

use stm::{atomic, fresh_id_source, scheduler, retry, Scheduler, StmResult, TVar, Transaction};

/// One named pass/fail case.
pub struct Case {
    pub name: &'static str,
    run: fn() -> bool,
}

impl Case {
    pub fn run(&self) -> bool {
        let passed = (self.run)();
        if passed {
            info!("case '{}': PASS", self.name);
        } else {
            info!("case '{}': FAIL", self.name);
        }
        passed
    }
}

/// If `r` holds at least `a`, subtract `a` and return the new value;
/// otherwise retry (§8 scenarios 1-4's `getR`).
fn get_r(tx: &mut Transaction, r: &TVar, a: i64) -> StmResult<i64> {
    let v = tx.read(r)?;
    if v < a {
        retry()
    } else {
        tx.write(r, v - a)?;
        tx.read(r)
    }
}

/// Add `a` to `r` unconditionally (§8 scenario 5's `putR`).
fn put_r(tx: &mut Transaction, r: &TVar, a: i64) -> StmResult<()> {
    let v = tx.read(r)?;
    tx.write(r, v + a)
}

pub fn or_else_suite() -> Vec<Case> {
    vec![
        Case {
            name: "orElse: first retries, second succeeds",
            run: scenario_1,
        },
        Case {
            name: "orElse: preceding write is visible to the surviving alternative",
            run: scenario_2,
        },
        Case {
            name: "orElse: doubly nested, inner retries, outer's second wins",
            run: scenario_3,
        },
        Case {
            name: "orElse: doubly nested, inner succeeds",
            run: scenario_4,
        },
    ]
}

pub fn retry_suite() -> Vec<Case> {
    vec![
        Case {
            name: "retry: waits for another task's commit to change the value",
            run: scenario_5,
        },
        Case {
            name: "retry: two racing commits, exactly one survives the conflict",
            run: scenario_6,
        },
    ]
}

/// `r1=8, r2=13`; `orElse(getR(r1,10), getR(r2,10))`; expect `r1=8, r2=3`.
fn scenario_1() -> bool {
    let mut r1_out = 0;
    let mut r2_out = 0;
    scheduler(fresh_id_source(), move |sched| {
        let r1 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(8)));
        let r2 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(13)));
        atomic(sched, |tx| tx.or_else(|tx| get_r(tx, &r1, 10), |tx| get_r(tx, &r2, 10)));
        r1_out = r1.read_atomic();
        r2_out = r2.read_atomic();
    });
    r1_out == 8 && r2_out == 3
}

/// `r1=8, r2=8`; `write(r2, read(r2)+5); orElse(getR(r1,10), getR(r2,10))`;
/// expect `r1=8, r2=3`.
fn scenario_2() -> bool {
    let mut r1_out = 0;
    let mut r2_out = 0;
    scheduler(fresh_id_source(), move |sched| {
        let r1 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(8)));
        let r2 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(8)));
        atomic(sched, |tx| {
            let v = tx.read(&r2)?;
            tx.write(&r2, v + 5)?;
            tx.or_else(|tx| get_r(tx, &r1, 10), |tx| get_r(tx, &r2, 10))
        });
        r1_out = r1.read_atomic();
        r2_out = r2.read_atomic();
    });
    r1_out == 8 && r2_out == 3
}

/// `r1=8, r2=13`; `v=read(r1); orElse(write(r1, v+5);
/// orElse(getR(r1,20), getR(r1,15)), getR(r1,4))`; expect `r1=4, r2=13`.
fn scenario_3() -> bool {
    let mut r1_out = 0;
    let mut r2_out = 0;
    scheduler(fresh_id_source(), move |sched| {
        let r1 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(8)));
        let r2 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(13)));
        atomic(sched, |tx| {
            let v = tx.read(&r1)?;
            tx.or_else(
                |tx| {
                    tx.write(&r1, v + 5)?;
                    tx.or_else(|tx| get_r(tx, &r1, 20), |tx| get_r(tx, &r1, 15))
                },
                |tx| get_r(tx, &r1, 4),
            )
        });
        r1_out = r1.read_atomic();
        r2_out = r2.read_atomic();
    });
    r1_out == 4 && r2_out == 13
}

/// `r1=8, r2=13`; `v=read(r1); orElse(write(r1,v+5);
/// orElse(getR(r1,20), getR(r1,10)), getR(r2,4))`; expect `r1=3, r2=13`.
fn scenario_4() -> bool {
    let mut r1_out = 0;
    let mut r2_out = 0;
    scheduler(fresh_id_source(), move |sched| {
        let r1 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(8)));
        let r2 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(13)));
        atomic(sched, |tx| {
            let v = tx.read(&r1)?;
            tx.or_else(
                |tx| {
                    tx.write(&r1, v + 5)?;
                    tx.or_else(|tx| get_r(tx, &r1, 20), |tx| get_r(tx, &r1, 10))
                },
                |tx| get_r(tx, &r2, 4),
            )
        });
        r1_out = r1.read_atomic();
        r2_out = r2.read_atomic();
    });
    r1_out == 3 && r2_out == 13
}

/// Two tasks under one scheduler: A retries `getR(r1,13)` until another
/// task's commits push `r1` past 13; B commits four `putR(r1,1)`s. Starting
/// `r1=10, r2=10`; expect `r1=1, r2=7`.
fn scenario_5() -> bool {
    let mut r1_out = 0;
    let mut r2_out = 0;
    scheduler(fresh_id_source(), move |sched: &Scheduler| {
        let r1 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(10)));
        let r2 = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(10)));

        let r1_a = r1.clone();
        let r2_a = r2.clone();
        let task_a = move |sched: &Scheduler| {
            atomic(sched, |tx| {
                tx.read(&r1_a)?;
                sched.yield_now();
                get_r(tx, &r2_a, 3)?;
                get_r(tx, &r1_a, 13)
            });
        };

        let r1_b = r1.clone();
        let task_b = move |sched: &Scheduler| {
            for _ in 0..4 {
                atomic(sched, |tx| put_r(tx, &r1_b, 1));
                sched.yield_now();
            }
        };

        sched.fork(task_a, task_b);

        r1_out = r1.read_atomic();
        r2_out = r2.read_atomic();
    });
    r1_out == 1 && r2_out == 7
}

/// Two tasks each atomically increment the same counter, yielding between
/// their read and write so the two attempts overlap. Starting value 0;
/// expect exactly 2.
fn scenario_6() -> bool {
    let mut counter_out = 0;
    scheduler(fresh_id_source(), move |sched: &Scheduler| {
        let counter = atomic(sched, |tx| Ok::<_, stm::StmError>(tx.new_tvar(0)));

        let c1 = counter.clone();
        let task_x = move |sched: &Scheduler| {
            atomic(sched, |tx| {
                let v = tx.read(&c1)?;
                sched.yield_now();
                tx.write(&c1, v + 1)
            });
        };

        let c2 = counter.clone();
        let task_y = move |sched: &Scheduler| {
            atomic(sched, |tx| {
                let v = tx.read(&c2)?;
                sched.yield_now();
                tx.write(&c2, v + 1)
            });
        };

        sched.fork(task_y, task_x);

        counter_out = counter.read_atomic();
    });
    counter_out == 2
}
