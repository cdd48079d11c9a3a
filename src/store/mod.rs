//! Remote blob store boundary.
//!
//! The streaming layer only needs two capabilities from a store: a bounded
//! ranged read and a single multipart upload that drains an async body.
//! Real backends (S3 and friends) implement [`BlobStore`]; tests use an
//! in-memory one.

use std::fmt;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Error;

/// An inclusive byte window of a remote object, `bytes=start-end` in HTTP
/// range terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive end offset. Stores clamp this to the object's last byte.
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Window covering `len` bytes from `offset`.
    pub fn chunk(offset: u64, len: usize) -> Self {
        Self {
            start: offset,
            end: offset + len as u64 - 1,
        }
    }

    /// Number of bytes requested.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Render as an HTTP `Range` header value.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}", self.start, self.end)
    }
}

/// Capability set required of a remote object store.
///
/// Error contract: a missing container must surface as
/// [`Error::BucketNotFound`], a missing object as [`Error::KeyNotFound`]
/// and an unsatisfiable range as [`Error::InvalidRange`]; those are the
/// only errors the streaming layer treats as terminal.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// One bounded ranged read. A store may return fewer bytes than the
    /// range asks for when the object ends inside the window.
    async fn ranged_get(&self, key: &str, range: ByteRange) -> Result<Vec<u8>, Error>;

    /// One multipart upload that drains `body` to EOF and returns the
    /// stored object's location.
    async fn multipart_upload<R>(
        &self,
        key: &str,
        body: R,
        content_type: &str,
        part_size: usize,
    ) -> Result<String, Error>
    where
        R: AsyncRead + Send + Unpin + 'static;
}
