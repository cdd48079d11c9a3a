//! In-memory blob store for integration tests.
//!
//! Serves objects with HTTP-style ranged-read semantics (clamped windows,
//! invalid-range past the end) and records call counts. Transient faults
//! can be injected to exercise the backoff path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use blobstream::error::Error;
use blobstream::store::{BlobStore, ByteRange};

#[derive(Default)]
pub struct MockStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    get_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    /// Remaining injected transient failures; each ranged get consumes one.
    transient_faults: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(key: &str, data: Vec<u8>) -> Self {
        let store = Self::default();
        store.put(key, data);
        store
    }

    pub fn put(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` ranged gets fail with a transient error.
    pub fn inject_transient_faults(&self, n: usize) {
        self.transient_faults.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MockStore {
    async fn ranged_get(&self, key: &str, range: ByteRange) -> Result<Vec<u8>, Error> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .transient_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Remote("injected transient fault".into()));
        }
        let objects = self.objects.lock().unwrap();
        let data = objects
            .get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))?;
        if range.start >= data.len() as u64 {
            return Err(Error::InvalidRange(range.to_string()));
        }
        let end = ((range.end + 1) as usize).min(data.len());
        Ok(data[range.start as usize..end].to_vec())
    }

    async fn multipart_upload<R>(
        &self,
        key: &str,
        mut body: R,
        _content_type: &str,
        _part_size: usize,
    ) -> Result<String, Error>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        self.put(key, data);
        Ok(format!("mem://bucket/{key}"))
    }
}
