//! Property Tests for the History Log.
//!
//! Random streams of control instructions, with random direction predictions and
//! random BTB, indirect, and RAS contents, are pushed through the unit. The ordering,
//! commit range, squash range, and RAS token invariants must hold for every stream.

use std::collections::BTreeSet;

use proptest::collection::vec;
use proptest::prelude::*;

use bpred_core::isa::{ControlInst, StaticControlInst};

use crate::common::harness::TestContext;
use crate::common::mocks::collaborators::Event;

#[derive(Clone, Debug)]
struct Op {
    inst: StaticControlInst,
    taken: bool,
    btb_hit: bool,
    indirect_hit: bool,
    gap: u64,
}

fn inst_strategy() -> impl Strategy<Value = StaticControlInst> {
    prop_oneof![
        Just(StaticControlInst::cond_branch()),
        Just(StaticControlInst::cond_indirect()),
        Just(StaticControlInst::jump()),
        Just(StaticControlInst::jump_indirect()),
        Just(StaticControlInst::call()),
        Just(StaticControlInst::cond_call()),
        Just(StaticControlInst::call_indirect()),
        Just(StaticControlInst::cond_call_indirect()),
        Just(StaticControlInst::ret()),
        Just(StaticControlInst::cond_ret()),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (inst_strategy(), any::<bool>(), any::<bool>(), any::<bool>(), 1u64..4).prop_map(
        |(inst, taken, btb_hit, indirect_hit, gap)| Op {
            inst,
            taken,
            btb_hit,
            indirect_hit,
            gap,
        },
    )
}

const fn pc_of(i: usize) -> u64 {
    0x1000 + (i as u64) * 0x40
}

/// Predicts every op on thread 0; returns the context and the sequence numbers used.
fn run(ops: &[Op], ras_depth: usize) -> (TestContext, Vec<u64>) {
    let mut ctx = TestContext::new();
    for i in 0..ras_depth {
        ctx.ras_push(0, 0x9000 + (i as u64) * 4);
    }
    let mut sn = 0;
    let mut sns = Vec::with_capacity(ops.len());
    for (i, op) in ops.iter().enumerate() {
        let pc = pc_of(i);
        if op.taken {
            ctx.predict_taken(pc);
        }
        if op.btb_hit {
            ctx.btb_entry(0, pc, pc + 0x800);
        }
        if op.indirect_hit {
            ctx.indirect_entry(0, pc, pc + 0xC00);
        }
        sn += op.gap;
        let _ = ctx.predict(&op.inst.clone().into_handle(), sn, pc, 0);
        sns.push(sn);
    }
    (ctx, sns)
}

type EntryTokens = (u64, u64, Option<u64>, Option<u64>);

fn entry_tokens(ctx: &TestContext) -> Vec<EntryTokens> {
    ctx.unit
        .history(0)
        .iter()
        .map(|e| {
            (
                e.seq_num,
                e.dir_history.0,
                e.ras_history.as_ref().map(|t| t.0),
                e.indirect_history.as_ref().map(|t| t.0),
            )
        })
        .collect()
}

/// RAS tokens created by a push or pop and not yet squashed.
fn live_ras_tokens(events: &[Event]) -> BTreeSet<u64> {
    let mut live = BTreeSet::new();
    for e in events {
        match e {
            Event::RasPush { token, .. } | Event::RasPop { token: Some(token), .. } => {
                let _ = live.insert(*token);
            }
            Event::RasSquash { token, .. } => {
                let _ = live.remove(token);
            }
            _ => {}
        }
    }
    live
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn log_is_strictly_descending(ops in vec(op_strategy(), 1..40), ras_depth in 0usize..4) {
        let (ctx, sns) = run(&ops, ras_depth);
        let logged = ctx.unit.history(0).seq_nums();

        prop_assert!(logged.windows(2).all(|w| w[0] > w[1]));
        let expected: Vec<u64> = sns.iter().rev().copied().collect();
        prop_assert_eq!(logged, expected);
    }

    #[test]
    fn commit_removes_exactly_the_back_run(
        ops in vec(op_strategy(), 1..40),
        done in 0u64..130,
    ) {
        let (mut ctx, sns) = run(&ops, 2);
        ctx.clear_events();

        ctx.unit.commit(done, 0);

        let expected: Vec<u64> = sns.iter().rev().copied().filter(|&s| s > done).collect();
        prop_assert_eq!(ctx.unit.history(0).seq_nums(), expected);

        let retired_pcs: Vec<u64> = ctx
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::DirUpdate { pc, .. } => Some(*pc),
                _ => None,
            })
            .collect();
        prop_assert_eq!(retired_pcs.len(), sns.iter().filter(|&&s| s <= done).count());
        prop_assert!(retired_pcs.windows(2).all(|w| w[0] < w[1]), "oldest first");
    }

    #[test]
    fn squash_removes_exactly_younger_entries(
        ops in vec(op_strategy(), 1..40),
        squash_sn in 0u64..130,
        ras_depth in 0usize..4,
    ) {
        let (mut ctx, _) = run(&ops, ras_depth);
        let before = entry_tokens(&ctx);

        ctx.unit.squash(squash_sn, 0);

        let expected: Vec<EntryTokens> = before.into_iter().filter(|e| e.0 <= squash_sn).collect();
        prop_assert_eq!(entry_tokens(&ctx), expected);
    }

    #[test]
    fn ras_tokens_track_stack_mutations(
        ops in vec(op_strategy(), 1..40),
        ras_depth in 0usize..4,
        correct_at in proptest::option::of(0usize..40),
        actually_taken in any::<bool>(),
    ) {
        let (mut ctx, sns) = run(&ops, ras_depth);
        if let Some(&sn) = correct_at.and_then(|i| sns.get(i)) {
            ctx.correct(sn, 0x7000, actually_taken, 0);
        }

        let held: BTreeSet<u64> = entry_tokens(&ctx).iter().filter_map(|e| e.2).collect();
        prop_assert_eq!(held, live_ras_tokens(&ctx.events()));

        for e in ctx.unit.history(0).iter().filter(|e| e.ras_history.is_some()) {
            prop_assert!(e.inst.is_call() || e.inst.is_return());
        }
    }

    #[test]
    fn btb_miss_always_falls_through(
        inst in inst_strategy().prop_filter("returns use the RAS", |i| !i.is_return()),
        pc in (0x1000u64..0x10_0000).prop_map(|p| p & !3),
    ) {
        let mut ctx = TestContext::builder().without_indirect().build();
        ctx.predict_taken(pc);

        let (taken, next) = ctx.predict(&inst.into_handle(), 1, pc, 0);

        prop_assert!(!taken);
        prop_assert_eq!(next, pc + 4);
        prop_assert!(!ctx.unit.history(0).front().is_some_and(|e| e.pred_taken));
    }
}
