//! Length-prefixed UTF-8 framing over a byte stream.
//!
//! Wire format: `[4-byte big-endian length][UTF-8 payload]`

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;

/// Maximum frame size (1 MiB). Frames larger than this are rejected.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Read exactly one complete message from the stream.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly at a frame
/// boundary. EOF inside a frame is [`WireError::Closed`]; an oversized
/// length prefix or non-UTF-8 payload is a protocol fault.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<String>, WireError>
where
    R: AsyncRead + Unpin,
{
    // Fill the prefix byte-by-byte so EOF before the first byte (clean close)
    // is distinguishable from EOF partway through it (truncated frame).
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(WireError::Closed);
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            WireError::Closed
        } else {
            WireError::Io(e)
        }
    })?;

    let text = String::from_utf8(buf).map_err(|_| WireError::InvalidUtf8)?;
    Ok(Some(text))
}

/// Write one complete message to the stream and flush it.
///
/// The caller is responsible for serializing concurrent writers on the same
/// stream; a frame write is atomic only under that exclusion.
pub async fn write_frame<W>(writer: &mut W, msg: &str) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = msg.as_bytes();
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            len: bytes.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(256);
        write_frame(&mut client, "Alice#hello#12:00:00").await.unwrap();
        let msg = read_frame(&mut server).await.unwrap();
        assert_eq!(msg.as_deref(), Some("Alice#hello#12:00:00"));
    }

    #[tokio::test]
    async fn frames_arrive_in_write_order() {
        let (mut client, mut server) = tokio::io::duplex(256);
        write_frame(&mut client, "first").await.unwrap();
        write_frame(&mut client, "second").await.unwrap();
        assert_eq!(read_frame(&mut server).await.unwrap().as_deref(), Some("first"));
        assert_eq!(read_frame(&mut server).await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn empty_payload_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_frame(&mut client, "").await.unwrap();
        assert_eq!(read_frame(&mut server).await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn clean_close_is_none() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_inside_prefix_is_closed() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, &[0u8, 0])
            .await
            .unwrap();
        drop(client);
        assert!(matches!(
            read_frame(&mut server).await,
            Err(WireError::Closed)
        ));
    }

    #[tokio::test]
    async fn eof_inside_payload_is_closed() {
        let (mut client, mut server) = tokio::io::duplex(64);
        // Announce 10 bytes, deliver 3.
        tokio::io::AsyncWriteExt::write_all(&mut client, &10u32.to_be_bytes())
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut client, b"abc")
            .await
            .unwrap();
        drop(client);
        assert!(matches!(
            read_frame(&mut server).await,
            Err(WireError::Closed)
        ));
    }

    #[tokio::test]
    async fn oversized_prefix_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_SIZE as u32) + 1;
        tokio::io::AsyncWriteExt::write_all(&mut client, &len.to_be_bytes())
            .await
            .unwrap();
        assert!(matches!(
            read_frame(&mut server).await,
            Err(WireError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, &2u32.to_be_bytes())
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut client, &[0xFF, 0xFE])
            .await
            .unwrap();
        assert!(matches!(
            read_frame(&mut server).await,
            Err(WireError::InvalidUtf8)
        ));
    }

    #[tokio::test]
    async fn write_refuses_oversized_payload() {
        let (mut client, _server) = tokio::io::duplex(64);
        let huge = "x".repeat(MAX_FRAME_SIZE + 1);
        assert!(matches!(
            write_frame(&mut client, &huge).await,
            Err(WireError::FrameTooLarge { .. })
        ));
    }
}
