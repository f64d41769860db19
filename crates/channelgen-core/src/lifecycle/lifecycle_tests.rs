#![allow(non_snake_case)]

use super::*;

#[test]
fn PipeState___default___is_created() {
    assert_eq!(PipeState::default(), PipeState::Created);
}

#[test]
fn PipeState___closed___is_absorbing() {
    let closed = PipeState::Closed;

    for target in [
        PipeState::Created,
        PipeState::Open,
        PipeState::Draining,
        PipeState::Closed,
    ] {
        assert!(
            !closed.can_transition_to(target),
            "Closed must not transition to {target}"
        );
    }
    assert!(closed.is_terminal());
}

#[test]
fn PipeState___open___accepts_input_and_reads() {
    assert!(PipeState::Open.accepts_input());
    assert!(PipeState::Open.is_readable());
}

#[test]
fn PipeState___draining___readable_but_closed_to_input() {
    assert!(!PipeState::Draining.accepts_input());
    assert!(PipeState::Draining.is_readable());
}

#[test]
fn PipeState___u8_roundtrip___preserves_state() {
    for state in [
        PipeState::Created,
        PipeState::Open,
        PipeState::Draining,
        PipeState::Closed,
    ] {
        assert_eq!(PipeState::from_u8(state.as_u8()), state);
    }
}

#[test]
fn PipeState___serde___uses_snake_case() {
    let json = serde_json::to_string(&PipeState::Draining).unwrap();

    assert_eq!(json, "\"draining\"");
}
