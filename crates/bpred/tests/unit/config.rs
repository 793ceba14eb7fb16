//! Configuration Tests.
//!
//! Verifies defaults, partial JSON deserialization, geometry validation, and that the
//! configured unit reflects the optional collaborators.

use pretty_assertions::assert_eq;
use rstest::rstest;

use bpred_core::DefaultBranchPredUnit;
use bpred_core::common::{ConfigError, PcState};
use bpred_core::config::{BpuConfig, DirectionKind, IndirectConfig};
use bpred_core::isa::StaticControlInst;

// ══════════════════════════════════════════════════════════
// 1. Defaults and deserialization
// ══════════════════════════════════════════════════════════

#[test]
fn defaults_are_valid() {
    let config = BpuConfig::default();
    assert_eq!(config.num_threads, 1);
    assert_eq!(config.direction, DirectionKind::GShare);
    assert_eq!(config.btb_size, 4096);
    assert_eq!(config.ras_size, 16);
    assert_eq!(config.inst_shift_amt, 2);
    assert_eq!(config.gshare_history_bits, 12);
    assert_eq!(config.indirect, None);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn empty_json_yields_defaults() {
    let config: BpuConfig = serde_json::from_str("{}").expect("parse");
    assert_eq!(config, BpuConfig::default());
}

#[test]
fn partial_json_overrides_named_fields() {
    let config: BpuConfig = serde_json::from_str(
        r#"{ "btb_size": 256, "direction": "Static", "indirect": { "ways": 4 } }"#,
    )
    .expect("parse");

    assert_eq!(config.btb_size, 256);
    assert_eq!(config.direction, DirectionKind::Static);
    assert_eq!(config.ras_size, 16);
    assert_eq!(
        config.indirect,
        Some(IndirectConfig {
            sets: 256,
            ways: 4,
            path_bits: 16
        })
    );
}

#[test]
fn unknown_direction_is_rejected() {
    let result: Result<BpuConfig, _> = serde_json::from_str(r#"{ "direction": "Tage" }"#);
    assert!(result.is_err());
}

#[test]
fn config_serializes_round_trip() {
    let config = BpuConfig {
        num_threads: 4,
        indirect: Some(IndirectConfig::default()),
        ..BpuConfig::default()
    };
    let json = serde_json::to_string(&config).expect("serialize");
    let back: BpuConfig = serde_json::from_str(&json).expect("parse");
    assert_eq!(back, config);
}

// ══════════════════════════════════════════════════════════
// 2. Validation
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::no_threads(r#"{ "num_threads": 0 }"#, ConfigError::NoThreads)]
#[case::btb_not_pow2(
    r#"{ "btb_size": 100 }"#,
    ConfigError::NotPowerOfTwo { name: "btb_size", value: 100 }
)]
#[case::btb_zero(
    r#"{ "btb_size": 0 }"#,
    ConfigError::NotPowerOfTwo { name: "btb_size", value: 0 }
)]
#[case::history_zero(
    r#"{ "gshare_history_bits": 0 }"#,
    ConfigError::OutOfRange { name: "gshare_history_bits", value: 0, min: 1, max: 24 }
)]
#[case::history_too_long(
    r#"{ "gshare_history_bits": 25 }"#,
    ConfigError::OutOfRange { name: "gshare_history_bits", value: 25, min: 1, max: 24 }
)]
#[case::indirect_sets(
    r#"{ "indirect": { "sets": 3 } }"#,
    ConfigError::NotPowerOfTwo { name: "indirect.sets", value: 3 }
)]
#[case::shift_too_large(
    r#"{ "inst_shift_amt": 64 }"#,
    ConfigError::OutOfRange { name: "inst_shift_amt", value: 64, min: 0, max: 63 }
)]
#[case::indirect_ways(
    r#"{ "indirect": { "ways": 0 } }"#,
    ConfigError::OutOfRange { name: "indirect.ways", value: 0, min: 1, max: 64 }
)]
#[case::indirect_ways_too_many(
    r#"{ "indirect": { "ways": 18446744073709551615 } }"#,
    ConfigError::OutOfRange { name: "indirect.ways", value: usize::MAX, min: 1, max: 64 }
)]
#[case::indirect_table_overflows(
    r#"{ "indirect": { "sets": 9223372036854775808, "ways": 2 } }"#,
    ConfigError::OutOfRange { name: "indirect.sets", value: 1 << 63, min: 1, max: usize::MAX / 2 }
)]
#[case::indirect_path(
    r#"{ "indirect": { "path_bits": 65 } }"#,
    ConfigError::OutOfRange { name: "indirect.path_bits", value: 65, min: 1, max: 64 }
)]
fn invalid_geometry_is_rejected(#[case] json: &str, #[case] expected: ConfigError) {
    let config: BpuConfig = serde_json::from_str(json).expect("parse");
    assert_eq!(config.validate(), Err(expected));
}

#[test]
fn largest_shift_and_associativity_are_accepted() {
    let config = BpuConfig {
        inst_shift_amt: 63,
        indirect: Some(IndirectConfig {
            ways: 64,
            ..IndirectConfig::default()
        }),
        ..BpuConfig::default()
    };
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn history_length_ignored_for_static_direction() {
    let config = BpuConfig {
        direction: DirectionKind::Static,
        gshare_history_bits: 0,
        ..BpuConfig::default()
    };
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn errors_name_the_field() {
    let err = ConfigError::NotPowerOfTwo {
        name: "btb_size",
        value: 100,
    };
    assert_eq!(err.to_string(), "btb_size must be a non-zero power of two, got 100");
}

// ══════════════════════════════════════════════════════════
// 3. Unit construction
// ══════════════════════════════════════════════════════════

#[test]
fn from_config_builds_requested_collaborators() {
    let config = BpuConfig {
        num_threads: 2,
        btb_size: 64,
        indirect: Some(IndirectConfig::default()),
        ..BpuConfig::default()
    };
    let unit = DefaultBranchPredUnit::from_config(&config).expect("valid config");

    assert_eq!(unit.num_threads(), 2);
    assert_eq!(unit.btb().capacity(), 64);
    assert!(unit.ras().is_some());
    assert!(unit.indirect_predictor().is_some());
    assert!(unit.is_drained());
}

#[test]
fn zero_ras_size_disables_return_stack() {
    let config = BpuConfig {
        ras_size: 0,
        ..BpuConfig::default()
    };
    let unit = DefaultBranchPredUnit::from_config(&config).expect("valid config");

    assert!(unit.ras().is_none());
    assert!(unit.indirect_predictor().is_none());
}

#[test]
fn from_config_rejects_invalid_geometry() {
    let config = BpuConfig {
        num_threads: 0,
        ..BpuConfig::default()
    };
    assert_eq!(DefaultBranchPredUnit::from_config(&config).err(), Some(ConfigError::NoThreads));
}

#[test]
fn largest_shift_predicts_every_branch_kind() {
    let config = BpuConfig {
        inst_shift_amt: 63,
        indirect: Some(IndirectConfig::default()),
        ..BpuConfig::default()
    };
    let mut unit = DefaultBranchPredUnit::from_config(&config).expect("valid config");
    let insts = [
        StaticControlInst::cond_branch(),
        StaticControlInst::call(),
        StaticControlInst::ret(),
        StaticControlInst::jump_indirect(),
    ];

    for (sn, inst) in (1..).zip(insts) {
        let mut pc = PcState::new(0x8000_0000_0000_1000);
        let _ = unit.predict(&inst.into_handle(), sn, &mut pc, 0);
    }
    unit.commit(4, 0);
    assert!(unit.is_drained());
}
