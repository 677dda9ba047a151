use bincode::{
    config,
    serde::{decode_from_slice, encode_to_vec},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::errors::SerializationError;

/// Maximum allowed message size (1MB) to prevent DoS attacks via unbounded allocation
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Serialize `value` into a complete frame: a little-endian `u32` length
/// followed by the bincode body.
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let serialized = encode_to_vec(value, config::standard())?;
    if serialized.len() > MAX_MESSAGE_SIZE {
        return Err(SerializationError::MessageTooLarge {
            actual: serialized.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let size = serialized.len() as u32;
    let mut buf = Vec::with_capacity(4 + serialized.len());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend(serialized);
    Ok(buf)
}

pub async fn read_prefixed<T, R>(reader: &mut R) -> Result<T, SerializationError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32_le().await? as usize;

    // Reject before allocating.
    if len > MAX_MESSAGE_SIZE {
        return Err(SerializationError::MessageTooLarge {
            actual: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = vec![0; len];
    reader.read_exact(&mut buf).await?;

    let (value, _) = decode_from_slice(&buf, config::standard())?;
    Ok(value)
}

pub async fn write_prefixed<T, W>(writer: &mut W, value: &T) -> Result<(), SerializationError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    // Size and body go out in one chunk to prevent read-side EOF races.
    let frame = encode_frame(value)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
