//! Integration tests: full pull/push sessions against an in-memory store,
//! including the backoff-wrapped fetch path.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use blobstream::backoff::BackoffConfig;
use blobstream::error::Error;
use blobstream::stream::{Reader, StreamConfig, Writer};
use common::mock_store::MockStore;

fn fast_backoff(retries: usize) -> BackoffConfig {
    BackoffConfig {
        initial_duration: Duration::from_millis(1),
        max_duration: Duration::from_millis(10),
        jitter_limit: Duration::ZERO,
        backoff_factor: 2.0,
        max_retry_count: retries,
        backoff_time_limit: Duration::from_secs(10),
        error_log: false,
    }
}

async fn drain(reader: &mut Reader<MockStore>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await.expect("read");
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

#[tokio::test]
async fn push_then_pull_round_trips_the_object() {
    let store = Arc::new(MockStore::new());
    let payload: Vec<u8> = (0u8..=255).cycle().take(10_123).collect();

    let mut writer = Writer::new(
        Arc::clone(&store),
        StreamConfig {
            part_size: 4096,
            ..Default::default()
        },
    );
    writer
        .open(CancellationToken::new(), "vectors/agent-0.bin")
        .unwrap();
    let mut written = 0;
    while written < payload.len() {
        let end = (written + 1000).min(payload.len());
        written += writer.write(&payload[written..end]).await.unwrap();
    }
    writer.close().await.unwrap();
    assert_eq!(store.upload_calls(), 1);
    assert!(writer.take_worker_error().is_none());
    assert_eq!(store.object("vectors/agent-0.bin").unwrap(), payload);

    let mut reader = Reader::new(
        Arc::clone(&store),
        StreamConfig {
            chunk_size: 1000,
            ..Default::default()
        },
    );
    reader
        .open(CancellationToken::new(), "vectors/agent-0.bin")
        .unwrap();
    let out = drain(&mut reader).await;
    reader.close().await.unwrap();

    assert_eq!(out, payload);
    // 10 full chunks plus the 123-byte tail that signals end of object.
    assert_eq!(store.get_calls(), 11);
    assert!(reader.take_worker_error().is_none());
}

#[tokio::test]
async fn backoff_recovers_the_stream_from_transient_faults() {
    let body: Vec<u8> = (0u8..25).collect();
    let store = Arc::new(MockStore::with_object("flaky.bin", body.clone()));
    store.inject_transient_faults(2);

    let mut reader = Reader::new(
        Arc::clone(&store),
        StreamConfig {
            chunk_size: 10,
            backoff: Some(fast_backoff(5)),
            ..Default::default()
        },
    );
    reader.open(CancellationToken::new(), "flaky.bin").unwrap();
    let out = drain(&mut reader).await;
    reader.close().await.unwrap();

    assert_eq!(out, body);
    // 2 failed attempts, then 3 successful chunk fetches.
    assert_eq!(store.get_calls(), 5);
    assert!(reader.take_worker_error().is_none());
}

#[tokio::test]
async fn exhausted_retry_budget_reads_as_clean_eof() {
    let body: Vec<u8> = (0u8..25).collect();
    let store = Arc::new(MockStore::with_object("down.bin", body));
    store.inject_transient_faults(usize::MAX);

    let mut reader = Reader::new(
        Arc::clone(&store),
        StreamConfig {
            chunk_size: 10,
            backoff: Some(fast_backoff(3)),
            ..Default::default()
        },
    );
    reader.open(CancellationToken::new(), "down.bin").unwrap();

    // The consumer sees only EOF; the worker's outcome is out of band.
    let out = drain(&mut reader).await;
    assert!(out.is_empty());
    reader.close().await.unwrap();

    assert_eq!(store.get_calls(), 4, "initial attempt + 3 retries");
    // Budget exhaustion surfaces the raw last error, unwrapped.
    assert!(matches!(
        reader.take_worker_error(),
        Some(Error::Remote(_))
    ));
}

#[tokio::test]
async fn missing_object_reads_as_clean_eof_through_backoff() {
    let store = Arc::new(MockStore::new());
    let mut reader = Reader::new(
        Arc::clone(&store),
        StreamConfig {
            chunk_size: 10,
            backoff: Some(fast_backoff(5)),
            ..Default::default()
        },
    );
    reader.open(CancellationToken::new(), "never-was.bin").unwrap();

    let out = drain(&mut reader).await;
    assert!(out.is_empty());
    reader.close().await.unwrap();

    // Terminal classification short-circuits the retry budget.
    assert_eq!(store.get_calls(), 1);
    assert!(matches!(
        reader.take_worker_error(),
        Some(Error::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn consumer_backpressure_bounds_fetching_to_one_chunk() {
    let body: Vec<u8> = vec![7u8; 100];
    let store = Arc::new(MockStore::with_object("slow.bin", body));

    let mut reader = Reader::new(
        Arc::clone(&store),
        StreamConfig {
            chunk_size: 10,
            ..Default::default()
        },
    );
    reader.open(CancellationToken::new(), "slow.bin").unwrap();

    // Without draining, the worker can buffer at most one chunk ahead and
    // must then block on the pipe.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.get_calls() <= 2);

    let out = drain(&mut reader).await;
    assert_eq!(out.len(), 100);
    reader.close().await.unwrap();
}

#[tokio::test]
async fn cancellation_stops_the_fetch_loop_between_chunks() {
    let body: Vec<u8> = vec![3u8; 1000];
    let store = Arc::new(MockStore::with_object("cut.bin", body));

    let mut reader = Reader::new(
        Arc::clone(&store),
        StreamConfig {
            chunk_size: 10,
            ..Default::default()
        },
    );
    let ctx = CancellationToken::new();
    reader.open(ctx.clone(), "cut.bin").unwrap();

    let mut buf = [0u8; 10];
    let n = reader.read(&mut buf).await.unwrap();
    assert_eq!(n, 10);

    ctx.cancel();
    let out = drain(&mut reader).await;
    reader.close().await.unwrap();

    // The loop stops at the next iteration boundary, well short of the
    // object's 100 chunks.
    assert!(out.len() < 1000 - n);
    assert!(store.get_calls() < 100);
}
