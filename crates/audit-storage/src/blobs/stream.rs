//! Length-known event streams

use std::fmt;
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::error::StorageError;

/// A stored event being read back
///
/// The length is known before the first byte is read so callers can announce
/// it (e.g. as `Content-Length`) without buffering. Dropping the stream
/// releases whatever the store opened for it.
pub struct EventStream {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    length: u64,
}

impl EventStream {
    /// Wrap a reader that yields exactly `length` bytes
    pub fn new(reader: impl AsyncRead + Send + 'static, length: u64) -> Self {
        Self {
            reader: Box::pin(reader),
            length,
        }
    }

    /// Stream over an in-memory payload
    pub fn from_bytes(data: Bytes) -> Self {
        let length = data.len() as u64;
        Self::new(Cursor::new(data), length)
    }

    /// Total number of bytes the stream yields
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Read the whole event into memory
    pub async fn into_bytes(mut self) -> Result<Bytes, StorageError> {
        let mut data = Vec::with_capacity(self.length as usize);
        self.read_to_end(&mut data).await?;
        Ok(Bytes::from(data))
    }
}

impl AsyncRead for EventStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}
