//! `"{kind} {length}\0{payload}"` object framing.

use crate::error::{Error, Result};

use super::ObjectKind;

/// A decoded frame borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub kind: ObjectKind,
    pub length: usize,
    pub payload: &'a [u8],
}

pub fn encode(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let length = payload.len().to_string();

    let mut framed = Vec::with_capacity(kind.as_bytes().len() + length.len() + 2 + payload.len());
    framed.extend_from_slice(kind.as_bytes());
    framed.push(b' ');
    framed.extend_from_slice(length.as_bytes());
    framed.push(0);
    framed.extend_from_slice(payload);
    framed
}

pub fn decode(bytes: &[u8]) -> Result<Frame<'_>> {
    let nul = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::Format("object header is not NUL terminated".into()))?;
    let (header, rest) = (&bytes[..nul], &bytes[nul + 1..]);

    let space = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| Error::Format("object header has no space separator".into()))?;
    let kind = ObjectKind::try_from(&header[..space])?;

    let digits = &header[space + 1..];
    let length = std::str::from_utf8(digits)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| {
            Error::Format(format!(
                "invalid object length {:?}",
                String::from_utf8_lossy(digits)
            ))
        })?;

    if length != rest.len() {
        return Err(Error::Format(format!(
            "object header declares {} bytes but payload has {}",
            length,
            rest.len()
        )));
    }

    Ok(Frame {
        kind,
        length,
        payload: rest,
    })
}
