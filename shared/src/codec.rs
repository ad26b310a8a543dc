//! Length-framed wire codec shared by client and server
//!
//! Every frame on the wire is laid out as:
//!
//! ```text
//! MAGIC (4 bytes, "SKNG") | LENGTH (u32 big-endian) | PAYLOAD (LENGTH bytes)
//! ```
//!
//! The payload is a bincode-encoded message. Declared lengths outside
//! `1..=MAX_PAYLOAD_LEN` are refused before any payload buffer is allocated,
//! so a corrupted or hostile peer cannot make us reserve arbitrary memory.
//!
//! Decoding consumes the stream in three steps (magic, length, payload) and
//! stops at the first one that fails: a bad magic marker consumes 4 bytes,
//! a bad length consumes 8.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAGIC: [u8; 4] = *b"SKNG";
pub const HEADER_LEN: usize = 8;
pub const MAX_PAYLOAD_LEN: u32 = 1_000_000;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("bad magic marker {0:02x?}")]
    BadMagic([u8; 4]),
    #[error("bad frame length {0} (allowed 1..=1000000)")]
    BadLength(u32),
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("transport error: {0}")]
    Io(#[source] io::Error),
    #[error("malformed payload: {0}")]
    Payload(#[from] bincode::Error),
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::UnexpectedEof
        } else {
            ProtocolError::Io(err)
        }
    }
}

impl ProtocolError {
    /// True when the peer went away rather than sending garbage.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::UnexpectedEof => true,
            ProtocolError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

fn payload_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_PAYLOAD_LEN as u64)
        .reject_trailing_bytes()
}

fn check_magic(magic: [u8; 4]) -> Result<(), ProtocolError> {
    if magic != MAGIC {
        return Err(ProtocolError::BadMagic(magic));
    }
    Ok(())
}

fn check_length(length: u32) -> Result<usize, ProtocolError> {
    if length == 0 || length > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::BadLength(length));
    }
    Ok(length as usize)
}

fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    Ok(payload_options().deserialize(payload)?)
}

/// Serializes `message` into one complete frame.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = payload_options().serialize(message)?;
    let length = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    check_length(length)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Reads exactly one frame from a blocking byte source.
///
/// Short reads are retried until the requested byte count arrives; a source
/// that closes early yields [`ProtocolError::UnexpectedEof`].
pub fn decode<T: DeserializeOwned, R: Read>(source: &mut R) -> Result<T, ProtocolError> {
    let mut magic = [0u8; 4];
    source.read_exact(&mut magic)?;
    check_magic(magic)?;

    let mut length = [0u8; 4];
    source.read_exact(&mut length)?;
    let length = check_length(u32::from_be_bytes(length))?;

    let mut payload = vec![0u8; length];
    source.read_exact(&mut payload)?;
    decode_payload(&payload)
}

/// Async counterpart of [`decode`] for socket halves.
pub async fn read_message<T, R>(reader: &mut R) -> Result<T, ProtocolError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).await?;
    check_magic(magic)?;

    let length = check_length(reader.read_u32().await?)?;

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;
    decode_payload(&payload)
}

/// Encodes `message` and writes the whole frame before returning.
pub async fn write_message<T, W>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
