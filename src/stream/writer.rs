//! Streaming push writer: a pipe drained by one multipart upload.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWriteExt, ReadHalf, SimplexStream, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::store::BlobStore;

use super::StreamConfig;

/// Writes a remote object as one byte stream. [`Writer::open`] spawns a
/// worker running a single multipart upload whose body is the pipe's read
/// side; [`Writer::write`] feeds the pipe and blocks while the upload
/// catches up. Upload failures never surface through `write`/`close` —
/// only through [`Writer::take_worker_error`].
pub struct Writer<S: BlobStore> {
    store: Arc<S>,
    part_size: usize,
    content_type: String,
    state: Option<Opened>,
    last_error: Arc<Mutex<Option<Error>>>,
}

struct Opened {
    pipe: WriteHalf<SimplexStream>,
    worker: JoinHandle<()>,
}

impl<S: BlobStore> Writer<S> {
    pub fn new(store: Arc<S>, config: StreamConfig) -> Self {
        let config = config.validated();
        Self {
            store,
            part_size: config.part_size,
            content_type: config.content_type,
            state: None,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the background upload worker for `key`. Opening an
    /// already-open session keeps the running worker.
    pub fn open(&mut self, ctx: CancellationToken, key: &str) -> Result<(), Error> {
        if self.state.is_some() {
            tracing::debug!(key, "open called on an open session, keeping worker");
            return Ok(());
        }
        let (rx, tx) = tokio::io::simplex(self.part_size);
        let worker = tokio::spawn(push_upload(
            Arc::clone(&self.store),
            key.to_string(),
            self.content_type.clone(),
            self.part_size,
            ctx,
            rx,
            Arc::clone(&self.last_error),
        ));
        self.state = Some(Opened { pipe: tx, worker });
        Ok(())
    }

    /// Write into the session's pipe. Blocks on backpressure until the
    /// in-progress upload consumes earlier bytes.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        match self.state.as_mut() {
            None => Err(Error::NotOpened),
            Some(opened) => Ok(opened.pipe.write(buf).await?),
        }
    }

    /// Shut down the pipe's write side (end-of-body for the upload) and
    /// join the worker. Idempotent; safe with no worker.
    pub async fn close(&mut self) -> Result<(), Error> {
        if let Some(Opened { mut pipe, worker }) = self.state.take() {
            if let Err(e) = pipe.shutdown().await {
                // Worker already gone; its error is in the stash.
                tracing::debug!(error = %e, "pipe shutdown after worker exit");
            }
            drop(pipe);
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "writer worker panicked");
            }
        }
        Ok(())
    }

    /// Terminal outcome of the upload worker, if it failed.
    pub fn take_worker_error(&self) -> Option<Error> {
        self.last_error.lock().unwrap().take()
    }
}

async fn push_upload<S: BlobStore>(
    store: Arc<S>,
    key: String,
    content_type: String,
    part_size: usize,
    ctx: CancellationToken,
    body: ReadHalf<SimplexStream>,
    last_error: Arc<Mutex<Option<Error>>>,
) {
    let result = tokio::select! {
        biased;
        res = store.multipart_upload(&key, body, &content_type, part_size) => res,
        _ = ctx.cancelled() => {
            Err(Error::Cancelled {
                source: Box::new(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "upload interrupted",
                ))),
            })
        }
    };
    match result {
        Ok(location) => {
            tracing::debug!(key = %key, location = %location, "upload complete");
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "upload failed");
            *last_error.lock().unwrap() = Some(e);
        }
    }
}
