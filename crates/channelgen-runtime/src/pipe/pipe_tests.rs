#![allow(non_snake_case)]

use super::*;
use serde_json::json;
use std::sync::Arc;

fn open_pipe(capacity: usize) -> Pipe {
    let pipe = Pipe::new("A", capacity);
    assert!(pipe.open());
    pipe
}

fn msg(n: i64) -> MessageEnvelope {
    MessageEnvelope::new(json!({"n": n}))
}

#[test]
fn Pipe___new___starts_created() {
    let pipe = Pipe::new("A", 4);

    assert_eq!(pipe.state(), PipeState::Created);
    assert_eq!(pipe.key(), "A");
}

#[test]
fn Pipe___open_twice___second_is_rejected() {
    let pipe = Pipe::new("A", 4);

    assert!(pipe.open());
    assert!(!pipe.open());
}

#[tokio::test]
async fn Pipe___push_before_open___reports_closed() {
    let pipe = Pipe::new("A", 4);

    let outcome = pipe.push(msg(1), OverflowPolicy::Drop).await;

    assert_eq!(outcome, PushOutcome::Closed);
}

#[tokio::test]
async fn Pipe___recv___preserves_push_order() {
    let pipe = open_pipe(8);
    for n in 0..5 {
        assert_eq!(pipe.push(msg(n), OverflowPolicy::Drop).await, PushOutcome::Delivered);
    }

    for n in 0..5 {
        let received = pipe.recv(Duration::from_millis(50)).await.unwrap();
        assert_eq!(received.body["n"], n);
    }
}

#[tokio::test]
async fn Pipe___recv_empty___times_out_and_stays_open() {
    let pipe = open_pipe(4);

    let result = pipe.recv(Duration::from_millis(20)).await;

    assert!(matches!(result, Err(DispatchError::Timeout { ref key, .. }) if key == "A"));
    assert_eq!(pipe.state(), PipeState::Open);
}

#[tokio::test]
async fn Pipe___recv_after_close___fails_immediately() {
    let pipe = open_pipe(4);
    pipe.push(msg(1), OverflowPolicy::Drop).await;
    pipe.close();

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        pipe.recv(Duration::from_secs(30)),
    )
    .await
    .expect("closed pipe must not block");

    assert_eq!(result, Err(DispatchError::ConnectionClosed));
}

#[tokio::test]
async fn Pipe___close___wakes_blocked_consumer() {
    let pipe = Arc::new(open_pipe(4));
    let consumer = {
        let pipe = pipe.clone();
        tokio::spawn(async move { pipe.recv(Duration::from_secs(30)).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    pipe.close();

    let result = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("consumer should unblock")
        .unwrap();
    assert_eq!(result, Err(DispatchError::ConnectionClosed));
}

#[tokio::test]
async fn Pipe___drop_policy_when_full___drops_newest() {
    let pipe = open_pipe(2);

    assert_eq!(pipe.push(msg(1), OverflowPolicy::Drop).await, PushOutcome::Delivered);
    assert_eq!(pipe.push(msg(2), OverflowPolicy::Drop).await, PushOutcome::Delivered);
    assert_eq!(pipe.push(msg(3), OverflowPolicy::Drop).await, PushOutcome::Dropped);

    let drained = pipe.drain().await.unwrap();
    let values: Vec<_> = drained.iter().map(|m| m.body["n"].clone()).collect();
    assert_eq!(values, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn Pipe___wait_policy___delivers_once_space_frees() {
    let pipe = Arc::new(open_pipe(1));
    pipe.push(msg(1), OverflowPolicy::Drop).await;

    let consumer = {
        let pipe = pipe.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            pipe.recv(Duration::from_millis(100)).await
        })
    };

    let outcome = pipe
        .push(msg(2), OverflowPolicy::Wait(Duration::from_secs(1)))
        .await;

    assert_eq!(outcome, PushOutcome::Delivered);
    assert_eq!(consumer.await.unwrap().unwrap().body["n"], 1);
    assert_eq!(pipe.recv(Duration::from_millis(50)).await.unwrap().body["n"], 2);
}

#[tokio::test]
async fn Pipe___wait_policy___drops_after_window() {
    let pipe = open_pipe(1);
    pipe.push(msg(1), OverflowPolicy::Drop).await;

    let outcome = pipe
        .push(msg(2), OverflowPolicy::Wait(Duration::from_millis(20)))
        .await;

    assert_eq!(outcome, PushOutcome::Dropped);
}

#[tokio::test]
async fn Pipe___drain___returns_buffer_and_closes() {
    let pipe = open_pipe(4);
    pipe.push(msg(1), OverflowPolicy::Drop).await;
    pipe.push(msg(2), OverflowPolicy::Drop).await;

    let drained = pipe.drain().await.unwrap();

    assert_eq!(drained.len(), 2);
    assert_eq!(pipe.state(), PipeState::Closed);
    assert_eq!(
        pipe.push(msg(3), OverflowPolicy::Drop).await,
        PushOutcome::Closed
    );
}

#[tokio::test]
async fn Pipe___drain_closed_pipe___fails() {
    let pipe = open_pipe(4);
    pipe.close();

    assert_eq!(pipe.drain().await, Err(DispatchError::ConnectionClosed));
}

#[test]
fn Pipe___zero_capacity___clamped_to_one() {
    let pipe = Pipe::new("A", 0);

    assert!(pipe.open());
}
