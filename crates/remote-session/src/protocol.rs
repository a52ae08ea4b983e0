// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Wire format.
//!
//! Every message is one frame:
//!
//! ```text
//! u32 BE header length | JSON header | u64 BE payload length | payload
//! ```
//!
//! The header is a [`Request`] or [`Response`]. Upload contents and tensor
//! data travel in the payload; tensors are concatenated in the order of
//! their [`TensorMeta`] entries.

use crate::{ContextId, RemoteFault, SessionError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use tensor_core::{DType, Shape, Tensor};

/// Largest accepted header or payload, in bytes.
pub const MAX_FRAME_BYTES: u64 = 1 << 30;

/// Procedure names understood by the peer.
pub mod procedures {
    /// `(device: str, index: int) -> context`
    pub const SESSION_CONTEXT: &str = "session.context";
    /// `(path: str, context) -> module`
    pub const MODULE_MATERIALIZE: &str = "module.materialize";
    /// `(module_id: int, tensors...) -> tensors...`
    pub const MODULE_RUN: &str = "module.run";
    /// `(module_id: int) -> null`
    pub const MODULE_FREE: &str = "module.free";
}

/// Client → peer.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Hello {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        client: String,
    },
    /// Stage the payload at `path` under the peer's sandbox.
    Upload { path: String },
    Call {
        procedure: String,
        #[serde(default)]
        args: Vec<RpcValue>,
        #[serde(default)]
        tensors: Vec<TensorMeta>,
    },
    Bye,
}

/// Peer → client.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Welcome { peer: String },
    Ack,
    Value {
        value: RpcValue,
        #[serde(default)]
        tensors: Vec<TensorMeta>,
    },
    Error { kind: RemoteFault, message: String },
}

/// Procedure argument or return value.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RpcValue {
    Null,
    Int(i64),
    Str(String),
    Context(ContextId),
    Module(ModuleInfo),
}

impl RpcValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A materialized module as described by the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ModuleInfo {
    pub id: u64,
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub input_names: Vec<String>,
}

/// Describes one tensor in a frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct TensorMeta {
    pub shape: Shape,
    pub dtype: DType,
    /// Byte length in the payload.
    pub len: u64,
}

/// Concatenates tensor data into one payload.
pub fn pack_tensors(tensors: &[Tensor]) -> (Vec<TensorMeta>, Vec<u8>) {
    let total = tensors.iter().map(|t| t.size_bytes()).sum();
    let mut payload = Vec::with_capacity(total);
    let metas: Vec<TensorMeta> = tensors
        .iter()
        .map(|t| {
            payload.extend_from_slice(t.as_bytes());
            TensorMeta {
                shape: t.shape().clone(),
                dtype: t.dtype(),
                len: t.size_bytes() as u64,
            }
        })
        .collect();
    (metas, payload)
}

/// Splits a payload back into tensors.
pub fn unpack_tensors(metas: &[TensorMeta], payload: &[u8]) -> Result<Vec<Tensor>, SessionError> {
    let mut offset = 0usize;
    let mut out = Vec::with_capacity(metas.len());
    for meta in metas {
        let len = usize::try_from(meta.len)
            .map_err(|_| SessionError::Protocol("tensor length overflows".into()))?;
        let end = offset
            .checked_add(len)
            .filter(|&e| e <= payload.len())
            .ok_or_else(|| SessionError::Protocol("tensor data exceeds payload".into()))?;
        out.push(Tensor::from_bytes(
            meta.shape.clone(),
            meta.dtype,
            payload[offset..end].to_vec(),
        )?);
        offset = end;
    }
    if offset != payload.len() {
        return Err(SessionError::Protocol(format!(
            "{} trailing payload bytes",
            payload.len() - offset
        )));
    }
    Ok(out)
}

/// Encodes a frame into a single buffer.
pub fn encode_frame<T: Serialize>(header: &T, payload: &[u8]) -> Result<Vec<u8>, SessionError> {
    let json = serde_json::to_vec(header)?;
    if json.len() as u64 > MAX_FRAME_BYTES || payload.len() as u64 > MAX_FRAME_BYTES {
        return Err(SessionError::Protocol("frame exceeds 1 GiB".into()));
    }
    let mut buf = Vec::with_capacity(12 + json.len() + payload.len());
    buf.extend_from_slice(&(json.len() as u32).to_be_bytes());
    buf.extend_from_slice(&json);
    buf.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Parses a header previously length-checked with [`check_len`].
pub fn decode_header<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SessionError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Rejects lengths above [`MAX_FRAME_BYTES`].
pub fn check_len(len: u64) -> Result<usize, SessionError> {
    if len > MAX_FRAME_BYTES {
        return Err(SessionError::Protocol(format!(
            "frame section of {len} bytes exceeds limit"
        )));
    }
    Ok(len as usize)
}

/// Writes one frame to a blocking stream.
pub fn write_frame<W: Write, T: Serialize>(
    w: &mut W,
    header: &T,
    payload: &[u8],
) -> Result<(), SessionError> {
    let buf = encode_frame(header, payload)?;
    w.write_all(&buf).map_err(|e| SessionError::from_io("write", e))?;
    w.flush().map_err(|e| SessionError::from_io("write", e))?;
    Ok(())
}

/// Reads one frame from a blocking stream.
pub fn read_frame<R: Read, T: DeserializeOwned>(r: &mut R) -> Result<(T, Vec<u8>), SessionError> {
    let mut len4 = [0u8; 4];
    r.read_exact(&mut len4)
        .map_err(|e| SessionError::from_io("read", e))?;
    let header_len = check_len(u32::from_be_bytes(len4) as u64)?;
    let mut header = vec![0u8; header_len];
    r.read_exact(&mut header)
        .map_err(|e| SessionError::from_io("read", e))?;

    let mut len8 = [0u8; 8];
    r.read_exact(&mut len8)
        .map_err(|e| SessionError::from_io("read", e))?;
    let payload_len = check_len(u64::from_be_bytes(len8))?;
    let mut payload = vec![0u8; payload_len];
    r.read_exact(&mut payload)
        .map_err(|e| SessionError::from_io("read", e))?;

    Ok((decode_header(&header)?, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_layout() {
        let buf = encode_frame(&Request::Bye, b"xy").unwrap();
        let json = br#"{"type":"bye"}"#;
        assert_eq!(&buf[..4], &(json.len() as u32).to_be_bytes());
        assert_eq!(&buf[4..4 + json.len()], json);
        assert_eq!(&buf[4 + json.len()..12 + json.len()], &2u64.to_be_bytes());
        assert_eq!(&buf[12 + json.len()..], b"xy");
    }

    #[test]
    fn test_read_write_frame() {
        let req = Request::Call {
            procedure: procedures::SESSION_CONTEXT.into(),
            args: vec![RpcValue::Str("cpu".into()), RpcValue::Int(0)],
            tensors: vec![],
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &req, &[]).unwrap();
        let (back, payload): (Request, Vec<u8>) = read_frame(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, req);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(b"{}");
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let err = read_frame::<_, Response>(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn test_truncated_frame() {
        let buf = encode_frame(&Response::Ack, b"abcdef").unwrap();
        let err = read_frame::<_, Response>(&mut Cursor::new(&buf[..buf.len() - 2])).unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[test]
    fn test_pack_unpack_tensors() {
        let a = Tensor::from_f32(Shape::vector(2), &[1.0, 2.0]).unwrap();
        let b = Tensor::from_f32(Shape::matrix(1, 1), &[3.0]).unwrap();
        let (metas, payload) = pack_tensors(&[a.clone(), b.clone()]);
        assert_eq!(metas[0].len, 8);
        assert_eq!(payload.len(), 12);
        assert_eq!(unpack_tensors(&metas, &payload).unwrap(), vec![a, b]);
        assert!(unpack_tensors(&metas, &payload[..10]).is_err());
        assert!(unpack_tensors(&metas[..1], &payload).is_err());
    }

    #[test]
    fn test_value_json() {
        let v = RpcValue::Context(ContextId::cpu());
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"context","value":{"device":"cpu","index":0}}"#);
        let err: Response = serde_json::from_str(
            r#"{"type":"error","kind":"device_unavailable","message":"no cuda"}"#,
        )
        .unwrap();
        assert!(matches!(
            err,
            Response::Error {
                kind: RemoteFault::DeviceUnavailable,
                ..
            }
        ));
    }
}
