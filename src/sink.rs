//! # TotalsSink: incremental output contract for the dashboard
//!
//! A sink receives the finished, ordered totals one element at a time, framed
//! as a JSON array: `begin` opens the array, each `element` appends one
//! (comma-separated) object, `end` closes it. `fail` reports that the
//! aggregation or the sink itself broke, with `bytes_sent` distinguishing
//! "nothing written yet, a clean error is still possible" from "the array is
//! already on the wire and can only be truncated".
//!
//! [`JsonArraySink`] writes the framing to any async writer; the HTTP layer
//! brings its own sink backed by a response body channel.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::error::{AggregateError, SinkError};
use crate::model::MinistryTotal;

#[async_trait]
pub trait TotalsSink: Send {
    /// Open the array. Called exactly once, before any element.
    async fn begin(&mut self) -> Result<(), SinkError>;

    /// Append one total. Elements arrive in final (sorted) order.
    async fn element(&mut self, total: &MinistryTotal) -> Result<(), SinkError>;

    /// Close the array. Called exactly once, after the last element.
    async fn end(&mut self) -> Result<(), SinkError>;

    /// The run is over without a complete array: either aggregation failed
    /// before `begin` (`bytes_sent == false`) or a write broke the stream
    /// (`bytes_sent == true`). Best-effort, must not fail.
    async fn fail(&mut self, fault: &AggregateError, bytes_sent: bool);
}

/// Serialize one element, prefixed with the separating comma unless it is the
/// first. Shared by every sink so all of them emit identical bytes.
pub fn element_bytes(total: &MinistryTotal, first: bool) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = if first { Vec::new() } else { vec![b','] };
    serde_json::to_writer(&mut bytes, total)?;
    Ok(bytes)
}

/// Writes the JSON array framing to an async writer, flushing after every
/// element so partial progress is visible downstream.
pub struct JsonArraySink<W> {
    writer: W,
    elements: usize,
}

impl<W> JsonArraySink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        JsonArraySink {
            writer,
            elements: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> TotalsSink for JsonArraySink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn begin(&mut self) -> Result<(), SinkError> {
        self.writer.write_all(b"[").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn element(&mut self, total: &MinistryTotal) -> Result<(), SinkError> {
        let bytes = element_bytes(total, self.elements == 0)?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        self.elements += 1;
        Ok(())
    }

    async fn end(&mut self) -> Result<(), SinkError> {
        self.writer.write_all(b"]").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn fail(&mut self, fault: &AggregateError, bytes_sent: bool) {
        warn!(bytes_sent, error = %fault, "[STREAM] Abandoning JSON array output");
        let _ = self.writer.shutdown().await;
    }
}
