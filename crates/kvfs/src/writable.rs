// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Random-access writable stream over an in-memory buffer.
//!
//! The stream applies write/seek/truncate commands in submission order and
//! hands the final buffer to a commit hook when closed. Nothing reaches
//! storage before `close()`; dropping an open stream discards its writes.

use crate::error::{Error, Result};
use bytes::Bytes;
use diagnostics::debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

pub type CommitFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Called with the final buffer when the stream closes
pub type CommitHook = Arc<dyn Fn(Vec<u8>) -> CommitFuture + Send + Sync>;

/// Payload accepted by `write`; every form is copied as raw bytes
#[derive(Debug, Clone, PartialEq)]
pub enum WriteData {
    /// UTF-8 text
    Text(String),
    /// Owned binary buffer
    Binary(Vec<u8>),
    /// Shared view into a byte buffer
    View(Bytes),
}

impl WriteData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WriteData::Text(s) => s.as_bytes(),
            WriteData::Binary(v) => v,
            WriteData::View(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for WriteData {
    fn from(s: &str) -> Self {
        WriteData::Text(s.to_string())
    }
}

impl From<String> for WriteData {
    fn from(s: String) -> Self {
        WriteData::Text(s)
    }
}

impl From<Vec<u8>> for WriteData {
    fn from(v: Vec<u8>) -> Self {
        WriteData::Binary(v)
    }
}

impl From<&[u8]> for WriteData {
    fn from(v: &[u8]) -> Self {
        WriteData::Binary(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for WriteData {
    fn from(v: &[u8; N]) -> Self {
        WriteData::Binary(v.to_vec())
    }
}

impl From<Bytes> for WriteData {
    fn from(b: Bytes) -> Self {
        WriteData::View(b)
    }
}

/// Command record form of the stream operations
#[derive(Debug, Clone, PartialEq)]
pub enum WriteCommand {
    Write {
        data: WriteData,
        position: Option<u64>,
    },
    Seek {
        position: u64,
    },
    Truncate {
        size: u64,
    },
}

impl From<WriteData> for WriteCommand {
    fn from(data: WriteData) -> Self {
        WriteCommand::Write {
            data,
            position: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Open,
    Closed,
    Aborted,
}

pub struct WritableByteStream {
    buffer: Vec<u8>,
    cursor: usize,
    state: StreamState,
    on_close: CommitHook,
    // commit in flight from AsyncWrite::poll_shutdown
    pending: Option<CommitFuture>,
}

fn to_index(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid_state(format!("position {value} out of range")))
}

impl WritableByteStream {
    /// Create an open stream seeded with `initial`, cursor at 0
    pub fn new(initial: Vec<u8>, on_close: CommitHook) -> Self {
        Self {
            buffer: initial,
            cursor: 0,
            state: StreamState::Open,
            on_close,
            pending: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Current cursor position
    pub fn position(&self) -> u64 {
        self.cursor as u64
    }

    pub fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Uncommitted contents
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            StreamState::Open if self.pending.is_some() => {
                Err(Error::invalid_state("stream is closing"))
            }
            StreamState::Open => Ok(()),
            StreamState::Closed => Err(Error::invalid_state("stream is closed")),
            StreamState::Aborted => Err(Error::invalid_state("stream is aborted")),
        }
    }

    /// Write at the cursor
    pub fn write<D: Into<WriteData>>(&mut self, data: D) -> Result<()> {
        let data = data.into();
        self.write_bytes(data.as_bytes(), None)
    }

    /// Write at `position`, growing the buffer if the write runs past its end
    pub fn write_at<D: Into<WriteData>>(&mut self, data: D, position: u64) -> Result<()> {
        let data = data.into();
        self.write_bytes(data.as_bytes(), Some(to_index(position)?))
    }

    fn write_bytes(&mut self, data: &[u8], position: Option<usize>) -> Result<()> {
        self.ensure_open()?;
        let start = position.unwrap_or(self.cursor);
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| Error::invalid_state("write past addressable range"))?;
        if end > self.buffer.len() {
            self.resize(end)?;
        }
        self.buffer[start..end].copy_from_slice(data);
        self.cursor = end;
        Ok(())
    }

    /// Move the cursor; it may sit anywhere in `0..=len`
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.ensure_open()?;
        let position = to_index(position)?;
        if position > self.buffer.len() {
            return Err(Error::invalid_state(format!(
                "seek to {position} past end {}",
                self.buffer.len()
            )));
        }
        self.cursor = position;
        Ok(())
    }

    /// Resize to exactly `size` bytes, zero-filling growth
    pub fn truncate(&mut self, size: u64) -> Result<()> {
        self.ensure_open()?;
        let size = to_index(size)?;
        self.resize(size)?;
        self.cursor = self.cursor.min(size);
        Ok(())
    }

    /// Zero-filling resize that reports allocation failure instead of
    /// aborting
    fn resize(&mut self, size: usize) -> Result<()> {
        if let Some(extra) = size.checked_sub(self.buffer.len()) {
            self.buffer.try_reserve(extra).map_err(|e| {
                Error::invalid_state(format!("cannot grow stream to {size} bytes: {e}"))
            })?;
        }
        self.buffer.resize(size, 0);
        Ok(())
    }

    /// Apply one command record
    pub fn send(&mut self, command: WriteCommand) -> Result<()> {
        match command {
            WriteCommand::Write { data, position } => match position {
                Some(position) => self.write_at(data, position),
                None => self.write(data),
            },
            WriteCommand::Seek { position } => self.seek(position),
            WriteCommand::Truncate { size } => self.truncate(size),
        }
    }

    /// Commit the buffer and close. Closing a closed stream is a no-op.
    ///
    /// If the commit fails the stream stays open with its buffer intact,
    /// so the caller may retry.
    pub async fn close(&mut self) -> Result<()> {
        match self.state {
            StreamState::Closed => return Ok(()),
            StreamState::Aborted => return Err(Error::invalid_state("stream is aborted")),
            StreamState::Open => {}
        }
        let commit = match self.pending.take() {
            Some(pending) => pending,
            None => (self.on_close)(self.buffer.clone()),
        };
        commit.await?;
        debug!("writable stream committed {size} bytes", size: self.buffer.len());
        self.finish(StreamState::Closed);
        Ok(())
    }

    /// Discard everything written and close without committing
    pub fn abort<S: AsRef<str>>(&mut self, reason: S) -> Result<()> {
        self.ensure_open()?;
        debug!("writable stream aborted: {reason}", reason: reason.as_ref());
        self.finish(StreamState::Aborted);
        Ok(())
    }

    fn finish(&mut self, state: StreamState) {
        self.state = state;
        self.pending = None;
        self.buffer = Vec::new();
        self.cursor = 0;
    }
}

impl std::fmt::Debug for WritableByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritableByteStream")
            .field("len", &self.buffer.len())
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .finish()
    }
}

impl AsyncWrite for WritableByteStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::result::Result<usize, std::io::Error>> {
        let this = self.get_mut();
        Poll::Ready(
            this.write_bytes(buf, None)
                .map(|()| buf.len())
                .map_err(std::io::Error::from),
        )
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<(), std::io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<(), std::io::Error>> {
        let this = self.get_mut();
        match this.state {
            StreamState::Closed => return Poll::Ready(Ok(())),
            StreamState::Aborted => {
                return Poll::Ready(Err(Error::invalid_state("stream is aborted").into()));
            }
            StreamState::Open => {}
        }

        let buffer = &this.buffer;
        let on_close = &this.on_close;
        let pending = this
            .pending
            .get_or_insert_with(|| on_close(buffer.clone()));

        match pending.as_mut().poll(cx) {
            Poll::Ready(Ok(())) => {
                this.finish(StreamState::Closed);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => {
                this.pending = None;
                Poll::Ready(Err(e.into()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
