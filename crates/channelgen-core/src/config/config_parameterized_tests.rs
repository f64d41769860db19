#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

// ============================================================================
// Parameterized config JSON parsing tests
// ============================================================================

#[test_case(r#"{"log_level": "info"}"#, LogLevel::Info)]
#[test_case(r#"{"log_level": "debug"}"#, LogLevel::Debug)]
#[test_case(r#"{"log_level": "warn"}"#, LogLevel::Warn)]
#[test_case(r#"{"log_level": "error"}"#, LogLevel::Error)]
#[test_case(r#"{"log_level": "trace"}"#, LogLevel::Trace)]
fn GeneratorConfig___log_level_json___parses_correctly(json: &str, expected: LogLevel) {
    let config = GeneratorConfig::from_json(json.as_bytes()).unwrap();

    assert_eq!(config.level().unwrap(), expected);
}

#[test_case(r#"{"max_array_length": 0}"#, 0)]
#[test_case(r#"{"max_array_length": 255}"#, 255)]
#[test_case(r#"{"max_array_length": 4294967295}"#, 4_294_967_295)]
#[test_case(r#"{}"#, 2_147_483_647)]
fn GeneratorConfig___max_array_length_json___parses_correctly(json: &str, expected: u64) {
    let config = GeneratorConfig::from_json(json.as_bytes()).unwrap();

    assert_eq!(config.max_array_length, expected);
}

#[test_case(r#"{"generate_tests": false}"#, false)]
#[test_case(r#"{"generate_tests": true}"#, true)]
#[test_case(r#"{}"#, true)]
fn GeneratorConfig___generate_tests_json___parses_correctly(json: &str, expected: bool) {
    let config = GeneratorConfig::from_json(json.as_bytes()).unwrap();

    assert_eq!(config.generate_tests, expected);
}
