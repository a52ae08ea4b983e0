// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Async framing over tokio streams, same layout as
//! [`remote_session::protocol`].

use remote_session::protocol::{self, check_len};
use remote_session::SessionError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A frame as received, header still encoded.
pub(crate) struct RawFrame {
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
}

impl RawFrame {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        protocol::decode_header(&self.header)
    }

    /// Re-encodes the frame byte for byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + self.header.len() + self.payload.len());
        buf.extend_from_slice(&(self.header.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.header);
        buf.extend_from_slice(&(self.payload.len() as u64).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Reads one frame. `Ok(None)` on a clean end of stream between frames.
pub(crate) async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Option<RawFrame>, SessionError> {
    let mut len4 = [0u8; 4];
    match r.read_exact(&mut len4).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let mut header = vec![0u8; check_len(u32::from_be_bytes(len4) as u64)?];
    r.read_exact(&mut header).await?;
    let mut len8 = [0u8; 8];
    r.read_exact(&mut len8).await?;
    let mut payload = vec![0u8; check_len(u64::from_be_bytes(len8))?];
    r.read_exact(&mut payload).await?;
    Ok(Some(RawFrame { header, payload }))
}

pub(crate) async fn write_frame<W: AsyncWrite + Unpin, T: Serialize>(
    w: &mut W,
    header: &T,
    payload: &[u8],
) -> Result<(), SessionError> {
    let buf = protocol::encode_frame(header, payload)?;
    w.write_all(&buf).await?;
    w.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_session::protocol::Request;

    #[tokio::test]
    async fn test_async_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, &Request::Upload { path: "/x".into() }, b"data")
            .await
            .unwrap();
        drop(a);
        let frame = read_frame(&mut b).await.unwrap().unwrap();
        assert_eq!(frame.payload, b"data");
        let req: Request = frame.decode().unwrap();
        assert_eq!(req, Request::Upload { path: "/x".into() });
        assert!(read_frame(&mut b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reencode_matches_blocking_codec() {
        let bytes = protocol::encode_frame(&Request::Bye, b"z").unwrap();
        let frame = read_frame(&mut bytes.as_slice()).await.unwrap().unwrap();
        assert_eq!(frame.to_bytes(), bytes);
    }
}
