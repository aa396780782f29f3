//! Property-based tests for the violation rule and the control surface.
//!
//! These tests verify invariants that should hold for all inputs.

use std::time::Duration;

use mbtest::admin::{MAX_CONTROL_LEN, parse_control};
use mbtest::protocol::{self, Observation};
use mbtest::sequence::{WrappingSeq, is_violation};
use mbtest::{BarrierKind, ControlError, SharedState};
use proptest::prelude::*;

// ============================================================================
//  Strategies
// ============================================================================

/// Strategy for arbitrary control payloads, biased toward short inputs.
fn control_payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..=MAX_CONTROL_LEN),
        prop::collection::vec(prop::sample::select(b"01fno \n".to_vec()), 0..=MAX_CONTROL_LEN),
        prop::collection::vec(any::<u8>(), 0..32),
    ]
}

// ============================================================================
//  Violation Rule
// ============================================================================

proptest! {
    /// The rule fires iff the wrapped difference is strictly positive (u8).
    #[test]
    fn violation_iff_positive_skew_u8(c in any::<u8>(), d in any::<u8>()) {
        let expected = (d.wrapping_sub(c) as i8) > 0;
        prop_assert_eq!(is_violation(c, d), expected);
    }

    /// Same rule at the harness's own width.
    #[test]
    fn violation_iff_positive_skew_u32(c in any::<u32>(), d in any::<u32>()) {
        let expected = (d.wrapping_sub(c) as i32) > 0;
        prop_assert_eq!(is_violation(c, d), expected);
        prop_assert_eq!(Observation { c, d }.is_violation(), expected);
    }

    /// Equal values never violate.
    #[test]
    fn equal_values_never_violate(v in any::<u64>()) {
        prop_assert!(!is_violation(v, v));
    }

    /// A ahead of B by less than half the range never violates.
    #[test]
    fn a_ahead_never_violates(c in any::<u32>(), lead in 0u32..=(u32::MAX / 2)) {
        let d = c.wrapping_sub(lead);
        prop_assert!(!is_violation(c, d));
    }

    /// B ahead of A by less than half the range always violates, across the wrap.
    #[test]
    fn b_ahead_always_violates(c in any::<u16>(), lead in 1u16..=(u16::MAX / 2)) {
        let d = c.wrapping_add(lead);
        prop_assert!(is_violation(c, d));
        prop_assert_eq!(d.distance_from(c), lead as i16);
    }

    /// Any sequential produce/publish/observe schedule is consistent.
    #[test]
    fn sequential_schedules_never_violate(
        steps in prop::collection::vec(0u8..3, 1..200),
        barrier in prop::sample::select(BarrierKind::ALL.to_vec()),
    ) {
        let state = SharedState::new();
        for step in steps {
            match step {
                0 => protocol::produce(&state),
                1 => { protocol::publish(&state, barrier); }
                _ => {
                    let report = protocol::observe(&state, barrier, 1, Duration::ZERO);
                    prop_assert!(report.is_none());
                }
            }
        }
        prop_assert!(state.should_run());
    }
}

// ============================================================================
//  Control Input
// ============================================================================

proptest! {
    /// Only the four tokens are accepted; everything else is rejected.
    #[test]
    fn control_accepts_exactly_four_tokens(input in control_payload()) {
        let result = parse_control(&input);
        match input.as_slice() {
            b"1" | b"on" => {
                prop_assert_eq!(result, Ok(true));
            }
            b"0" | b"off" => {
                prop_assert_eq!(result, Ok(false));
            }
            _ if input.len() > MAX_CONTROL_LEN => {
                prop_assert_eq!(
                    result,
                    Err(ControlError::TooLong { len: input.len(), max: MAX_CONTROL_LEN })
                );
            }
            _ => {
                prop_assert_eq!(result, Err(ControlError::InvalidToken));
            }
        }
    }
}
