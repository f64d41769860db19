#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

#[test]
fn RouterConfig___default___uses_documented_limits() {
    let config = RouterConfig::default();

    assert_eq!(config.pipe_capacity, 1000);
    assert_eq!(config.consume_timeout, Duration::from_secs(5));
    assert_eq!(config.overflow, OverflowPolicy::Drop);
    assert_eq!(config.outbound_capacity, 1000);
}

#[test]
fn RouterConfig___builders___override_fields() {
    let config = RouterConfig::new()
        .with_pipe_capacity(8)
        .with_consume_timeout(Duration::from_millis(250))
        .with_overflow(OverflowPolicy::Wait(Duration::from_millis(10)))
        .with_outbound_capacity(16);

    assert_eq!(config.pipe_capacity, 8);
    assert_eq!(config.consume_timeout, Duration::from_millis(250));
    assert_eq!(config.overflow, OverflowPolicy::Wait(Duration::from_millis(10)));
    assert_eq!(config.outbound_capacity, 16);
}

#[test_case(OverflowPolicy::Drop, OverflowPolicy::Drop, true)]
#[test_case(OverflowPolicy::Drop, OverflowPolicy::Wait(Duration::ZERO), false)]
#[test_case(
    OverflowPolicy::Wait(Duration::from_secs(1)),
    OverflowPolicy::Wait(Duration::from_secs(1)),
    true
)]
fn OverflowPolicy___equality___compares_window(a: OverflowPolicy, b: OverflowPolicy, equal: bool) {
    assert_eq!(a == b, equal);
}
