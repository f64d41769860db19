#![allow(non_snake_case)]

use super::*;
use crate::sink::RecordBuffer;
use test_case::test_case;
use tracing_subscriber::prelude::*;

/// A private manager per test so tests do not share the global level
fn manager_with_buffer(level: LogLevel) -> (&'static LogSinkManager, RecordBuffer) {
    let manager: &'static LogSinkManager = Box::leak(Box::new(LogSinkManager::new()));
    let buffer = RecordBuffer::new();
    manager.set_sink(Some(buffer.sink()));
    manager.set_level(level);
    (manager, buffer)
}

#[test_case(Level::TRACE, LogLevel::Trace)]
#[test_case(Level::DEBUG, LogLevel::Debug)]
#[test_case(Level::INFO, LogLevel::Info)]
#[test_case(Level::WARN, LogLevel::Warn)]
#[test_case(Level::ERROR, LogLevel::Error)]
fn SinkLayer___convert_level___maps_tracing_levels(level: Level, expected: LogLevel) {
    assert_eq!(SinkLayer::convert_level(&level), expected);
}

#[test]
fn SinkLayer___events___filtered_by_manager_level() {
    let (manager, buffer) = manager_with_buffer(LogLevel::Info);
    let subscriber = tracing_subscriber::registry().with(SinkLayer::with_manager(manager));

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("generation started");
        tracing::debug!("registry reuse");
        tracing::error!("reader failed");
    });

    let messages: Vec<_> = buffer.records().into_iter().map(|r| r.message).collect();
    assert_eq!(messages, vec!["generation started", "reader failed"]);
}

#[test]
fn SinkLayer___structured_fields___captured_separately() {
    let (manager, buffer) = manager_with_buffer(LogLevel::Debug);
    let subscriber = tracing_subscriber::registry().with(SinkLayer::with_manager(manager));

    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!(channel = "/market", pipe = %"trade", dropped = true, "pipe full");
    });

    let records = buffer.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.level, LogLevel::Warn);
    assert_eq!(record.message, "pipe full");
    assert_eq!(record.field("channel"), Some("/market"));
    assert_eq!(record.field("pipe"), Some("trade"));
    assert_eq!(record.field("dropped"), Some("true"));
}

#[test]
fn SinkLayer___message_only___no_fields() {
    let (manager, buffer) = manager_with_buffer(LogLevel::Info);
    let subscriber = tracing_subscriber::registry().with(SinkLayer::with_manager(manager));

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("Simple message");
    });

    let records = buffer.records();
    assert_eq!(records[0].message, "Simple message");
    assert!(records[0].fields.is_empty());
}

#[test]
fn SinkLayer___target___is_module_path() {
    let (manager, buffer) = manager_with_buffer(LogLevel::Info);
    let subscriber = tracing_subscriber::registry().with(SinkLayer::with_manager(manager));

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "channelgen::router", "routed");
    });

    assert_eq!(buffer.records()[0].target, "channelgen::router");
}

#[test]
fn SinkLayer___off_level___forwards_nothing() {
    let (manager, buffer) = manager_with_buffer(LogLevel::Off);
    let subscriber = tracing_subscriber::registry().with(SinkLayer::with_manager(manager));

    tracing::subscriber::with_default(subscriber, || {
        tracing::error!("suppressed");
    });

    assert!(buffer.records().is_empty());
}
