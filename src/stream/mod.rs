//! Chunked streaming sessions over a remote blob store.
//!
//! A session turns a sequence of bounded remote calls into one ordinary
//! byte stream: the pull [`Reader`] loops over increasing ranged fetches
//! and feeds an in-process pipe, the push [`Writer`] drains the pipe into a
//! single multipart upload. Each open session owns exactly one background
//! worker; the pipe's backpressure bounds memory to one chunk.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use crate::backoff::BackoffConfig;

/// Session parameters shared by readers and writers. Invalid fields are
/// advisory: logged and replaced with defaults at construction.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Bytes fetched per ranged read; also the pipe capacity.
    pub chunk_size: usize,
    /// Multipart part size handed to the store on upload.
    pub part_size: usize,
    /// Content type recorded with uploaded objects.
    pub content_type: String,
    /// When set, ranged fetches run through a [`crate::backoff::Backoff`]
    /// executor; when `None`, each fetch gets a single attempt.
    pub backoff: Option<BackoffConfig>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512 * 1024,
            part_size: 64 * 1024 * 1024,
            content_type: "application/octet-stream".to_string(),
            backoff: None,
        }
    }
}

impl StreamConfig {
    /// Replace unusable values with defaults, logging each substitution.
    pub(crate) fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.chunk_size == 0 {
            tracing::warn!("ignoring zero chunk_size, keeping default");
            self.chunk_size = defaults.chunk_size;
        }
        if self.part_size == 0 {
            tracing::warn!("ignoring zero part_size, keeping default");
            self.part_size = defaults.part_size;
        }
        if self.content_type.is_empty() {
            self.content_type = defaults.content_type;
        }
        self
    }
}
