//! Commit Tests.
//!
//! Verifies oldest-first retirement up to a sequence number, the training calls made
//! for each retired entry, and that commit never touches younger entries.

use pretty_assertions::assert_eq;

use bpred_core::isa::BranchKind;

use crate::common::builder::instruction as inst;
use crate::common::harness::TestContext;
use crate::common::mocks::collaborators::Event;

const PC: u64 = 0x1000;

fn with_cond_entries(sns: &[u64]) -> TestContext {
    let mut ctx = TestContext::new();
    for &sn in sns {
        let _ = ctx.predict(&inst::cond(), sn, PC + sn * 4, 0);
    }
    ctx.clear_events();
    ctx
}

// ══════════════════════════════════════════════════════════
// 1. Retirement range
// ══════════════════════════════════════════════════════════

#[test]
fn commit_removes_entries_through_done_sn() {
    let mut ctx = with_cond_entries(&[1, 2, 3, 4]);

    ctx.unit.commit(2, 0);

    assert_eq!(ctx.unit.history(0).seq_nums(), vec![4, 3]);
    assert_eq!(ctx.unit.stats().committed, 2);
}

#[test]
fn commit_below_oldest_is_noop() {
    let mut ctx = with_cond_entries(&[5, 6]);

    ctx.unit.commit(4, 0);

    assert_eq!(ctx.unit.history(0).seq_nums(), vec![6, 5]);
    assert!(ctx.events().is_empty());
}

#[test]
fn commit_with_gaps_stops_at_first_younger_entry() {
    let mut ctx = with_cond_entries(&[2, 5, 9]);

    ctx.unit.commit(7, 0);

    assert_eq!(ctx.unit.history(0).seq_nums(), vec![9]);
}

#[test]
fn commit_on_empty_log_is_noop() {
    let mut ctx = TestContext::new();
    ctx.unit.commit(100, 0);
    assert!(ctx.unit.is_drained());
    assert!(ctx.events().is_empty());
}

#[test]
fn commit_twice_is_idempotent() {
    let mut ctx = with_cond_entries(&[1, 2, 3]);

    ctx.unit.commit(2, 0);
    let after_first = ctx.unit.history(0).seq_nums();
    let events_first = ctx.events().len();

    ctx.unit.commit(2, 0);

    assert_eq!(ctx.unit.history(0).seq_nums(), after_first);
    assert_eq!(ctx.events().len(), events_first);
}

// ══════════════════════════════════════════════════════════
// 2. Training calls
// ══════════════════════════════════════════════════════════

#[test]
fn commit_trains_oldest_first() {
    let mut ctx = with_cond_entries(&[1, 2]);

    ctx.unit.commit(2, 0);

    // Direction tokens 1 and 3; indirect tokens 2 and 4.
    assert_eq!(
        ctx.events(),
        vec![
            Event::DirUpdate {
                tid: 0,
                pc: PC + 4,
                taken: false,
                token: 1,
                target: PC + 8
            },
            Event::IndCommit {
                tid: 0,
                sn: 1,
                token: Some(2)
            },
            Event::RasCommit {
                tid: 0,
                mispredicted: false,
                kind: BranchKind::DirectCond,
                token: None
            },
            Event::DirUpdate {
                tid: 0,
                pc: PC + 8,
                taken: false,
                token: 3,
                target: PC + 12
            },
            Event::IndCommit {
                tid: 0,
                sn: 2,
                token: Some(4)
            },
            Event::RasCommit {
                tid: 0,
                mispredicted: false,
                kind: BranchKind::DirectCond,
                token: None
            },
        ]
    );
}

#[test]
fn commit_hands_ras_token_and_kind_to_stack() {
    let mut ctx = TestContext::new();
    ctx.btb_entry(0, PC, 0x4000);
    let _ = ctx.predict(&inst::call(), 1, PC, 0);
    ctx.clear_events();

    ctx.unit.commit(1, 0);

    assert!(ctx.events().contains(&Event::RasCommit {
        tid: 0,
        mispredicted: false,
        kind: BranchKind::CallDirect,
        token: Some(2),
    }));
    assert_eq!(ctx.ras_stack(0), vec![PC + 4], "commit leaves the stack contents alone");
}

#[test]
fn commit_uses_corrected_outcome() {
    let mut ctx = TestContext::new();
    let _ = ctx.predict(&inst::cond(), 1, PC, 0);
    ctx.correct(1, 0x8000, true, 0);
    ctx.clear_events();

    ctx.unit.commit(1, 0);

    assert_eq!(
        ctx.events()[0],
        Event::DirUpdate {
            tid: 0,
            pc: PC,
            taken: true,
            token: 1,
            target: 0x8000
        }
    );
    assert!(ctx.events().contains(&Event::RasCommit {
        tid: 0,
        mispredicted: true,
        kind: BranchKind::DirectCond,
        token: None,
    }));
}

#[test]
fn commit_without_indirect_predictor_skips_indirect_commit() {
    let mut ctx = TestContext::builder().without_indirect().build();
    let _ = ctx.predict(&inst::cond(), 1, PC, 0);
    ctx.clear_events();

    ctx.unit.commit(1, 0);

    assert!(!ctx.events().iter().any(|e| matches!(e, Event::IndCommit { .. })));
}

#[test]
fn commit_only_touches_its_thread() {
    let mut ctx = TestContext::builder().threads(2).build();
    let _ = ctx.predict(&inst::cond(), 1, PC, 0);
    let _ = ctx.predict(&inst::cond(), 1, PC, 1);

    ctx.unit.commit(1, 1);

    assert_eq!(ctx.unit.history(0).seq_nums(), vec![1]);
    assert!(ctx.unit.history(1).is_empty());
}

#[test]
#[should_panic(expected = "out of range")]
fn commit_unknown_thread_is_fatal() {
    let mut ctx = TestContext::new();
    ctx.unit.commit(1, 3);
}
