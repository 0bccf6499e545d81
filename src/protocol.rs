//! Wire protocol.
//!
//! Every message is a 4-byte big-endian length followed by that many payload
//! bytes. Control messages carry JSON. A file body is a run of data frames
//! whose concatenation is exactly the size announced in the `ok` header,
//! closed by a zero-length frame.
//!
//! ```text
//! client                                server
//!   |  <---- [len][catalog json] ---------  |  on connect
//!   |  ----> [len]{"type":"fetch",...} -->  |
//!   |  <---- [len]{"status":"ok","size":N}  |
//!   |  <---- [len][bytes] ... [0] ---------  |
//! ```

use crate::config::{CHUNK_SIZE, MAX_FRAME_LEN};
use crate::error::ProtocolError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    List,
    Fetch { name: String },
}

/// First message of every `fetch` reply. Only `Ok` is followed by data frames.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseHeader {
    Ok { size: u64 },
    NotFound,
    IoError { detail: String },
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let len = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len).await?;
    writer.write_all(payload).await?;
    Ok(())
}

/// Read one frame. `None` means the peer closed the stream at a frame boundary.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf[..1]).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    // Past the first byte an EOF means the header itself was cut short.
    let mut got = 1;
    while got < len_buf.len() {
        match reader.read(&mut len_buf[got..]).await? {
            0 => return Err(ProtocolError::TruncatedHeader { got }),
            n => got += n,
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn send_message<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_vec(message)?;
    write_frame(writer, &json).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one JSON message. `None` when the peer closed cleanly instead.
pub async fn recv_message<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
        None => Ok(None),
    }
}

/// Stream exactly `size` bytes from `source` as data frames, then the
/// terminating empty frame. A source that runs dry early leaves the peer
/// expecting bytes we cannot deliver, so that is fatal.
pub async fn send_file_body<W, R>(
    writer: &mut W,
    source: R,
    size: u64,
) -> Result<u64, ProtocolError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut source = source.take(size);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent = 0u64;

    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        write_frame(writer, &buf[..n]).await?;
        sent += n as u64;
    }

    if sent != size {
        return Err(ProtocolError::LengthMismatch {
            expected: size,
            actual: sent,
        });
    }

    write_frame(writer, &[]).await?;
    writer.flush().await?;
    Ok(sent)
}

/// What happened to the bytes of a received file body.
#[derive(Debug)]
pub struct BodyReceipt {
    pub received: u64,
    /// First local write failure. Frames after it were read and discarded so
    /// the stream stays aligned.
    pub sink_error: Option<io::Error>,
}

/// Read data frames until the empty terminator, writing them to `sink`.
///
/// `on_frame` sees the running byte count after every frame. The total must
/// equal `expected`; more or fewer bytes is a protocol violation.
pub async fn recv_file_body<R, W, F>(
    reader: &mut R,
    expected: u64,
    sink: &mut W,
    mut on_frame: F,
) -> Result<BodyReceipt, ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(u64),
{
    let mut received = 0u64;
    let mut sink_error = None;

    loop {
        let frame = read_frame(reader).await?.ok_or(ProtocolError::Closed)?;
        if frame.is_empty() {
            break;
        }

        received += frame.len() as u64;
        if received > expected {
            return Err(ProtocolError::LengthMismatch {
                expected,
                actual: received,
            });
        }

        if sink_error.is_none() {
            if let Err(e) = sink.write_all(&frame).await {
                sink_error = Some(e);
            }
        }
        on_frame(received);
    }

    if received != expected {
        return Err(ProtocolError::LengthMismatch {
            expected,
            actual: received,
        });
    }

    if sink_error.is_none() {
        if let Err(e) = sink.flush().await {
            sink_error = Some(e);
        }
    }

    Ok(BodyReceipt {
        received,
        sink_error,
    })
}
