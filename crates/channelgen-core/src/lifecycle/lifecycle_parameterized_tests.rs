#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

// ============================================================================
// Parameterized valid transitions
// ============================================================================

#[test_case(PipeState::Created, PipeState::Open)]
#[test_case(PipeState::Created, PipeState::Closed)]
#[test_case(PipeState::Open, PipeState::Draining)]
#[test_case(PipeState::Open, PipeState::Closed)]
#[test_case(PipeState::Draining, PipeState::Closed)]
fn PipeState___valid_transitions___allowed(from: PipeState, to: PipeState) {
    assert!(
        from.can_transition_to(to),
        "{:?} should transition to {:?}",
        from,
        to
    );
}

// ============================================================================
// Parameterized invalid transitions
// ============================================================================

#[test_case(PipeState::Created, PipeState::Draining)]
#[test_case(PipeState::Open, PipeState::Created)]
#[test_case(PipeState::Open, PipeState::Open)]
#[test_case(PipeState::Draining, PipeState::Open)]
#[test_case(PipeState::Draining, PipeState::Created)]
fn PipeState___invalid_transitions___rejected(from: PipeState, to: PipeState) {
    assert!(
        !from.can_transition_to(to),
        "{:?} should not transition to {:?}",
        from,
        to
    );
}

#[test_case(PipeState::Created, "Created")]
#[test_case(PipeState::Open, "Open")]
#[test_case(PipeState::Draining, "Draining")]
#[test_case(PipeState::Closed, "Closed")]
fn PipeState___display___shows_name(state: PipeState, expected: &str) {
    assert_eq!(state.to_string(), expected);
}
