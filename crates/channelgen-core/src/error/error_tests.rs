#![allow(non_snake_case)]

use super::*;

#[test]
fn DispatchError___timeout___displays_key_and_duration() {
    let err = DispatchError::Timeout {
        key: "pong".into(),
        after: Duration::from_millis(250),
    };

    assert_eq!(err.to_string(), "timed out after 250ms waiting on pipe 'pong'");
}

#[test]
fn DispatchError___connection_closed___is_closed() {
    assert!(DispatchError::ConnectionClosed.is_closed());
    assert!(!DispatchError::PipeNotFound("x".into()).is_closed());
}

#[test]
fn DispatchError___all_variants___have_unique_codes() {
    let errors = vec![
        DispatchError::PipeNotFound("".into()),
        DispatchError::DuplicatePipe("".into()),
        DispatchError::Timeout {
            key: "".into(),
            after: Duration::ZERO,
        },
        DispatchError::DataBinding {
            target: "".into(),
            reason: "".into(),
        },
        DispatchError::ConnectionClosed,
        DispatchError::Transport("".into()),
        DispatchError::Codec("".into()),
    ];

    let codes: Vec<u32> = errors.iter().map(|e| e.error_code()).collect();
    let unique: std::collections::HashSet<u32> = codes.iter().copied().collect();

    assert_eq!(
        codes.len(),
        unique.len(),
        "All error codes should be unique"
    );
}

#[test]
fn DispatchError___from_serde_error___converts_to_codec() {
    let json_err = serde_json::from_str::<String>("invalid").unwrap_err();

    let err: DispatchError = json_err.into();

    assert!(matches!(err, DispatchError::Codec(_)));
}

#[test]
fn Diagnostic___display___leads_with_location() {
    let diag = Diagnostic::new(
        DiagnosticKind::NoDispatchKey,
        "channels./events/messages/Ping",
        "payload has no field 'event'",
    );

    assert_eq!(
        diag.to_string(),
        "channels./events/messages/Ping: payload has no field 'event'"
    );
    assert!(diag.is_error());
}

#[test]
fn Diagnostic___constrained_additional_properties___is_warning() {
    let diag = Diagnostic::new(
        DiagnosticKind::ConstrainedAdditionalProperties,
        "components.schemas.Bag",
        "constraints dropped",
    );

    assert_eq!(diag.severity, Severity::Warning);
    assert!(!diag.is_error());
}
