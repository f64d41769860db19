#![allow(non_snake_case)]

use super::*;
use std::time::Duration;

#[test]
fn CloseHandle___new___not_closed() {
    let handle = CloseHandle::new();

    assert!(!handle.is_closed());
}

#[test]
fn CloseHandle___close___first_call_wins() {
    let handle = CloseHandle::new();

    assert!(handle.close());
    assert!(!handle.close());
    assert!(handle.is_closed());
}

#[test]
fn CloseHandle___clone___shares_state() {
    let handle = CloseHandle::new();
    let other = handle.clone();

    other.close();

    assert!(handle.is_closed());
}

#[test]
fn CloseSignal___clone___observes_close() {
    let handle = CloseHandle::new();
    let first = handle.signal();
    let second = first.clone();

    handle.close();

    assert!(first.is_closed());
    assert!(second.is_closed());
}

#[tokio::test]
async fn CloseSignal___wait___blocks_until_closed() {
    let handle = CloseHandle::new();
    let mut signal = handle.signal();

    let closer = handle.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        closer.close();
    });

    signal.wait().await;

    assert!(signal.is_closed());
}

#[tokio::test]
async fn CloseSignal___wait___returns_immediately_when_already_closed() {
    let handle = CloseHandle::new();
    handle.close();
    let mut signal = handle.signal();

    tokio::time::timeout(Duration::from_millis(10), signal.wait())
        .await
        .expect("closed signal should not block");
}

#[tokio::test]
async fn CloseSignal___wait___pending_while_open() {
    let handle = CloseHandle::new();
    let mut signal = handle.signal();

    let result = tokio::time::timeout(Duration::from_millis(20), signal.wait()).await;

    assert!(result.is_err());
}
