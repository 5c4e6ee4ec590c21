//! Distribution protocol
//!
//! This module defines the messages exchanged between the coordinator and
//! worker processes, and the framing used to put them on a byte stream.
//! Messages are serialized with MessagePack (rmp-serde).
//!
//! # Protocol Version
//!
//! Current version: 1
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Worker (rank r)
//!     |                              |
//!     |-------- COUNT(n) ----------->|
//!     |-------- PAYLOAD(n values) -->|
//!     |                              |  sort + summarize
//!     |<------- REPORT(summary) -----|
//!     |                       or     |
//!     |<------- ERROR(reason) -------|
//! ```
//!
//! COUNT always precedes PAYLOAD on a given stream. A worker rejects a
//! payload whose length differs from the announced count.
//!
//! # Message Framing
//!
//! ```text
//! [4 bytes: body length (LE u32)][4 bytes: tag (LE u32)][N bytes: MessagePack body]
//! ```
//!
//! The tag is shared by both sides of a run; a frame carrying another tag is
//! a protocol violation.

use crate::ingest::DatasetId;
use crate::stats::SummaryReport;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
/// Coordinator and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Tag used when none is configured
pub const DEFAULT_TAG: u32 = 0;

/// Largest frame body accepted by default (1 GiB)
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 1 << 30;

/// Frame header: body length + tag
pub const HEADER_LEN: usize = 8;

/// MessagePack encodes every f64 as a marker byte plus 8 bytes
const ENCODED_F64_LEN: u64 = 9;

/// Room for the enum, struct and array headers around a payload
const PAYLOAD_OVERHEAD: u64 = 128;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("frame of {len} bytes exceeds the limit of {max} bytes")]
    FrameTooLarge { len: u64, max: u64 },

    #[error("tag mismatch: expected {expected}, got {actual}")]
    TagMismatch { expected: u32, actual: u32 },

    #[error("protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("payload length mismatch: count announced {expected} values, payload has {actual}")]
    LengthMismatch { expected: u64, actual: u64 },
}

/// Protocol message
///
/// All messages exchanged between coordinator and worker processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Element count (Coordinator → Worker)
    ///
    /// First half of a transfer envelope.
    Count(CountMessage),

    /// Dataset values (Coordinator → Worker)
    ///
    /// Second half of a transfer envelope; must hold exactly the announced
    /// number of values.
    Payload(PayloadMessage),

    /// Summary of the sorted dataset (Worker → Coordinator)
    Report(ReportMessage),

    /// Worker failure (Worker → Coordinator)
    Error(ErrorMessage),
}

impl Message {
    /// Short name of the message kind, for errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Count(_) => "COUNT",
            Message::Payload(_) => "PAYLOAD",
            Message::Report(_) => "REPORT",
            Message::Error(_) => "ERROR",
        }
    }
}

/// Count message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    /// Dataset being transferred
    pub dataset: DatasetId,

    /// Number of values in the following payload
    pub count: u64,
}

/// Payload message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadMessage {
    pub values: Vec<f64>,
}

/// Report message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMessage {
    /// Node identifier (hostname)
    pub node_id: String,

    /// Worker rank
    pub rank: usize,

    pub dataset: DatasetId,

    pub summary: SummaryReport,

    /// Time spent sorting and summarizing (nanoseconds)
    pub elapsed_ns: u64,
}

/// Error message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Node identifier (hostname)
    pub node_id: String,

    /// Worker rank
    pub rank: usize,

    /// Error description
    pub error: String,
}

/// Serialize a message into a complete frame
///
/// # Frame Format
///
/// ```text
/// [4 bytes: body length (LE u32)][4 bytes: tag (LE u32)][N bytes: MessagePack body]
/// ```
pub fn serialize_message(tag: u32, msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let body = rmp_serde::to_vec(msg)?;

    let body_len = u32::try_from(body.len()).map_err(|_| ProtocolError::FrameTooLarge {
        len: body.len() as u64,
        max: u32::MAX as u64,
    })?;

    let mut framed = Vec::with_capacity(HEADER_LEN + body.len());
    framed.extend_from_slice(&body_len.to_le_bytes());
    framed.extend_from_slice(&tag.to_le_bytes());
    framed.extend_from_slice(&body);

    Ok(framed)
}

fn parse_header(header: &[u8]) -> (u32, u32) {
    let body_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let tag = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (body_len, tag)
}

/// Read one message from a stream
///
/// Blocks until a complete frame arrives. Frames whose body exceeds
/// `max_body_len` are rejected before the body is read.
pub async fn read_message<R>(reader: &mut R, max_body_len: u64) -> Result<(u32, Message), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let (body_len, tag) = parse_header(&header);

    if body_len as u64 > max_body_len {
        return Err(ProtocolError::FrameTooLarge {
            len: body_len as u64,
            max: max_body_len,
        });
    }

    let mut body = vec![0u8; body_len as usize];
    reader.read_exact(&mut body).await?;

    let msg = rmp_serde::from_slice(&body)?;
    Ok((tag, msg))
}

/// Read one message and check that it carries `tag`
pub async fn expect_message<R>(
    reader: &mut R,
    tag: u32,
    max_body_len: u64,
) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let (actual, msg) = read_message(reader, max_body_len).await?;
    if actual != tag {
        return Err(ProtocolError::TagMismatch {
            expected: tag,
            actual,
        });
    }
    Ok(msg)
}

/// Write one message to a stream and flush it
pub async fn write_message<W>(writer: &mut W, tag: u32, msg: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(tag, msg)?;
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}

/// A dataset in transit: element count plus exactly that many values
///
/// Sent as two frames, COUNT then PAYLOAD. Sending consumes the envelope,
/// so the sender no longer holds the values afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEnvelope {
    pub dataset: DatasetId,
    pub values: Vec<f64>,
}

impl TransferEnvelope {
    pub fn new(dataset: DatasetId, values: Vec<f64>) -> Self {
        Self { dataset, values }
    }

    /// Number of values in the envelope
    pub fn count(&self) -> u64 {
        self.values.len() as u64
    }

    /// Send COUNT followed by PAYLOAD
    pub async fn send<W>(self, writer: &mut W, tag: u32) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let count = Message::Count(CountMessage {
            protocol_version: PROTOCOL_VERSION,
            dataset: self.dataset,
            count: self.count(),
        });
        write_message(writer, tag, &count).await?;

        let payload = Message::Payload(PayloadMessage { values: self.values });
        write_message(writer, tag, &payload).await
    }

    /// Receive COUNT followed by PAYLOAD
    ///
    /// The payload frame may not be larger than what the announced count
    /// needs (and never larger than `max_frame_bytes`), and must hold
    /// exactly `count` values.
    pub async fn receive<R>(reader: &mut R, tag: u32, max_frame_bytes: u64) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let count = match expect_message(reader, tag, max_frame_bytes).await? {
            Message::Count(count) => count,
            other => {
                return Err(ProtocolError::UnexpectedMessage {
                    expected: "COUNT",
                    actual: other.kind(),
                })
            }
        };

        if count.protocol_version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: count.protocol_version,
            });
        }

        let payload_limit = payload_frame_limit(count.count).min(max_frame_bytes);
        let values = match expect_message(reader, tag, payload_limit).await? {
            Message::Payload(payload) => payload.values,
            other => {
                return Err(ProtocolError::UnexpectedMessage {
                    expected: "PAYLOAD",
                    actual: other.kind(),
                })
            }
        };

        if values.len() as u64 != count.count {
            return Err(ProtocolError::LengthMismatch {
                expected: count.count,
                actual: values.len() as u64,
            });
        }

        Ok(Self::new(count.dataset, values))
    }
}

/// Largest payload body that `count` values can encode to
pub fn payload_frame_limit(count: u64) -> u64 {
    count.saturating_mul(ENCODED_F64_LEN).saturating_add(PAYLOAD_OVERHEAD)
}
