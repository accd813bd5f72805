//! Length-prefixed frame codec.
//!
//! Each frame is a 4-byte big-endian length followed by exactly that many
//! payload bytes:
//!
//! ```text
//! +----------------+---------------------------+
//! | length (i32 BE)| payload (length bytes)    |
//! +----------------+---------------------------+
//! ```
//!
//! The length is read as a signed value so that a corrupted header can be
//! reported as negative. Lengths above [`MAX_FRAME_LENGTH`] are rejected
//! before any buffer is reserved for the body.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use super::constants::{MAX_FRAME_LENGTH, SIZE_OF_FRAME_LENGTH_FIELD};
use crate::error::{BridgeError, Result};

const INITIAL_READ_CAPACITY: usize = 8 * 1024;

/// Codec for length-prefixed frames.
///
/// Implements the `tokio_util::codec::{Encoder, Decoder}` traits so it can be
/// driven by hand over a read buffer or wrapped in `Framed`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Creates a new codec instance.
    pub fn new() -> Self {
        Self
    }

    fn check_declared(declared: i32) -> Result<usize> {
        if declared < 0 || declared as usize > MAX_FRAME_LENGTH {
            return Err(BridgeError::Protocol(format!(
                "invalid message length: {}",
                declared
            )));
        }
        Ok(declared as usize)
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = BridgeError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > MAX_FRAME_LENGTH {
            return Err(BridgeError::Protocol(format!(
                "message too large: {} bytes (max {})",
                item.len(),
                MAX_FRAME_LENGTH
            )));
        }

        dst.reserve(SIZE_OF_FRAME_LENGTH_FIELD + item.len());
        dst.put_u32(item.len() as u32);
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < SIZE_OF_FRAME_LENGTH_FIELD {
            return Ok(None);
        }

        let declared = i32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        let length = Self::check_declared(declared)?;
        let total_frame_size = SIZE_OF_FRAME_LENGTH_FIELD + length;

        if src.len() < total_frame_size {
            src.reserve(total_frame_size - src.len());
            return Ok(None);
        }

        src.advance(SIZE_OF_FRAME_LENGTH_FIELD);
        Ok(Some(src.split_to(length).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None if src.len() < SIZE_OF_FRAME_LENGTH_FIELD => Err(BridgeError::ConnectionClosed(
                "stream ended while reading message length".to_string(),
            )),
            None => Err(BridgeError::ConnectionClosed(format!(
                "stream ended while reading message data ({} of {} bytes)",
                src.len() - SIZE_OF_FRAME_LENGTH_FIELD,
                i32::from_be_bytes([src[0], src[1], src[2], src[3]])
            ))),
        }
    }
}

/// Encodes a payload into a complete frame.
pub fn encode_frame(payload: &[u8]) -> Result<BytesMut> {
    let mut dst = BytesMut::with_capacity(SIZE_OF_FRAME_LENGTH_FIELD + payload.len());
    FrameCodec::new().encode(Bytes::copy_from_slice(payload), &mut dst)?;
    Ok(dst)
}

/// Reads exactly one frame from `reader`.
///
/// Partial deliveries are accumulated until the declared length is satisfied.
/// Returns `ConnectionClosed` if the stream ends first.
pub async fn read_frame<R>(reader: &mut R) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::with_capacity(INITIAL_READ_CAPACITY);

    loop {
        if let Some(frame) = codec.decode(&mut buf)? {
            tracing::trace!(length = frame.len(), "frame received");
            return Ok(frame);
        }

        let bytes_read = reader
            .read_buf(&mut buf)
            .await
            .map_err(|e| BridgeError::Connection(format!("failed to read frame: {}", e)))?;

        if bytes_read == 0 {
            return codec.decode_eof(&mut buf)?.ok_or_else(|| {
                BridgeError::ConnectionClosed("stream ended before a message arrived".to_string())
            });
        }
    }
}

/// Writes `payload` as one frame and flushes `writer`.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload)?;

    writer
        .write_all(&frame)
        .await
        .map_err(|e| BridgeError::Connection(format!("failed to write frame: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| BridgeError::Connection(format!("failed to flush frame: {}", e)))?;

    Ok(())
}
