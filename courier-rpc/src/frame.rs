//! Length-prefixed `bincode` framing: a 4-byte big-endian length prefix
//! followed by a `bincode`-encoded value. Used both by the scheduler
//! facade's inbound listener and the backend client's outbound calls, so
//! the encoding only has to be gotten right once.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, RpcError};

/// Frames larger than this are rejected outright rather than allocated.
pub const MAX_FRAME_BYTES: u32 = 1_000_000;

/// Encode `value` and write it as one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::legacy())?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| RpcError::FrameTooLarge(u32::MAX, MAX_FRAME_BYTES))?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame and decode it.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            RpcError::ConnectionClosed
        } else {
            RpcError::Io(e)
        }
    })?;

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(RpcError::FrameTooLarge(len, MAX_FRAME_BYTES));
    }

    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes).await?;

    let (value, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::legacy())?;
    Ok(value)
}
