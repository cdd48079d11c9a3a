//! Streaming pull reader: ranged fetches feeding a pipe.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, SimplexStream, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::error::{Error, ErrorClass};
use crate::store::{BlobStore, ByteRange};

use super::StreamConfig;

/// Reads a remote object as one byte stream by fetching fixed-size ranges
/// in the background.
///
/// [`Reader::open`] spawns the worker; [`Reader::read`] consumes the pipe
/// and reaches a clean EOF whatever stopped the worker — end of object,
/// missing object, or an exhausted retry budget. Callers that need to tell
/// those apart check [`Reader::take_worker_error`] after EOF.
pub struct Reader<S: BlobStore> {
    store: Arc<S>,
    chunk_size: usize,
    backoff: Option<Arc<Backoff>>,
    state: Option<Opened>,
    last_error: Arc<Mutex<Option<Error>>>,
}

struct Opened {
    pipe: ReadHalf<SimplexStream>,
    worker: JoinHandle<()>,
}

impl<S: BlobStore> Reader<S> {
    pub fn new(store: Arc<S>, config: StreamConfig) -> Self {
        let config = config.validated();
        Self {
            store,
            chunk_size: config.chunk_size,
            backoff: config.backoff.map(|c| Arc::new(Backoff::new(c))),
            state: None,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the background fetch worker for `key`. Synchronous success:
    /// fetch failures never surface here. Opening an already-open session
    /// keeps the running worker.
    pub fn open(&mut self, ctx: CancellationToken, key: &str) -> Result<(), Error> {
        if self.state.is_some() {
            tracing::debug!(key, "open called on an open session, keeping worker");
            return Ok(());
        }
        let (rx, tx) = tokio::io::simplex(self.chunk_size);
        let worker = tokio::spawn(pull_loop(
            Arc::clone(&self.store),
            key.to_string(),
            self.chunk_size,
            self.backoff.clone(),
            ctx,
            tx,
            Arc::clone(&self.last_error),
        ));
        self.state = Some(Opened { pipe: rx, worker });
        Ok(())
    }

    /// Read from the session's pipe. Blocks until the worker produces a
    /// chunk or stops; `Ok(0)` is EOF.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.state.as_mut() {
            None => Err(Error::NotOpened),
            Some(opened) => Ok(opened.pipe.read(buf).await?),
        }
    }

    /// Close the pipe and join the worker. Idempotent; safe with no worker.
    /// Does not cancel an in-flight fetch — it waits for the worker to
    /// finish naturally.
    pub async fn close(&mut self) -> Result<(), Error> {
        if let Some(Opened { pipe, worker }) = self.state.take() {
            // Dropping the read half unblocks a worker stuck on a full pipe.
            drop(pipe);
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "reader worker panicked");
            }
        }
        Ok(())
    }

    /// Terminal outcome of the worker, if it stopped on an error. The byte
    /// stream itself never carries this: both a missing object and an
    /// exhausted retry budget read as a clean EOF.
    pub fn take_worker_error(&self) -> Option<Error> {
        self.last_error.lock().unwrap().take()
    }
}

async fn pull_loop<S: BlobStore>(
    store: Arc<S>,
    key: String,
    chunk_size: usize,
    backoff: Option<Arc<Backoff>>,
    ctx: CancellationToken,
    mut pipe: WriteHalf<SimplexStream>,
    last_error: Arc<Mutex<Option<Error>>>,
) {
    let mut offset: u64 = 0;
    loop {
        // Cooperative cancellation, polled once per chunk.
        if ctx.is_cancelled() {
            tracing::debug!(key = %key, offset, "fetch loop cancelled");
            break;
        }
        let range = ByteRange::chunk(offset, chunk_size);
        let fetched = match &backoff {
            Some(b) => {
                let store = Arc::clone(&store);
                let key = key.clone();
                b.run(&ctx, move || {
                    let store = Arc::clone(&store);
                    let key = key.clone();
                    async move { store.ranged_get(&key, range).await }
                })
                .await
            }
            None => store.ranged_get(&key, range).await,
        };
        let chunk = match fetched {
            Ok(chunk) => chunk,
            Err(e) if e.class() == ErrorClass::Terminal => {
                // Absent object or exhausted range: the stream simply ends.
                tracing::warn!(key = %key, offset, error = %e, "object unavailable, ending stream");
                *last_error.lock().unwrap() = Some(e);
                break;
            }
            Err(e) => {
                tracing::debug!(key = %key, offset, error = %e, "fetch failed, ending stream");
                *last_error.lock().unwrap() = Some(e);
                break;
            }
        };
        let n = chunk.len();
        if n > 0 {
            // Blocks until the consumer drains the pipe (backpressure).
            if pipe.write_all(&chunk).await.is_err() {
                tracing::debug!(key = %key, offset, "pipe closed by consumer");
                break;
            }
        }
        if n < chunk_size {
            // Short read: authoritative end of object.
            break;
        }
        offset += n as u64;
    }
    // EOF for the consumer.
    let _ = pipe.shutdown().await;
}
